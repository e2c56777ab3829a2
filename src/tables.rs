//! Tab-separated table reading
//!
//! Event files and confound files are plain TSV with a header row. Columns are
//! addressed by name; a requested column that is absent is a schema error.

use crate::error::PrepError;
use crate::types::EventRecord;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Cell values treated as missing, matched exactly (the pandas `read_csv`
/// default NA markers)
const MISSING_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Columns every event file must carry
pub const EVENT_COLUMNS: [&str; 3] = ["onset", "duration", "trial_type"];

/// A TSV file held in memory
#[derive(Debug, Clone)]
pub struct TsvTable {
    path: PathBuf,
    header_index: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl TsvTable {
    /// Read a whole TSV file
    pub fn read(path: &Path) -> Result<Self, PrepError> {
        if !path.is_file() {
            return Err(PrepError::MissingFile(path.to_path_buf()));
        }
        let table = Self::from_reader(File::open(path)?, path)?;
        debug!("read {} rows from {}", table.rows.len(), path.display());
        Ok(table)
    }

    /// Parse TSV text; `path` is only used in error messages
    pub fn parse(text: &str, path: &Path) -> Result<Self, PrepError> {
        Self::from_reader(text.as_bytes(), path)
    }

    fn from_reader<R: io::Read>(input: R, path: &Path) -> Result<Self, PrepError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .trim(Trim::All)
            .from_reader(input);

        let header_index = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, h)| (h.to_string(), idx))
            .collect();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            path: path.to_path_buf(),
            header_index,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.header_index.contains_key(name)
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Result<usize, PrepError> {
        self.header_index
            .get(name)
            .copied()
            .ok_or_else(|| PrepError::MissingColumn {
                column: name.to_string(),
                path: self.path.clone(),
            })
    }

    /// Check that every named column is present, reporting the first missing one
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<(), PrepError> {
        names
            .iter()
            .try_for_each(|name| self.column_index(name.as_ref()).map(|_| ()))
    }

    /// Read the file as an event table.
    ///
    /// The `duration` column must exist, but its cells are not validated:
    /// extraction replaces every duration, so a non-numeric cell reads as `NaN`.
    pub fn events(&self) -> Result<Vec<EventRecord>, PrepError> {
        let onset_idx = self.column_index("onset")?;
        let duration_idx = self.column_index("duration")?;
        let type_idx = self.column_index("trial_type")?;

        self.rows
            .iter()
            .map(|row| {
                let onset = self
                    .cell(row, onset_idx, "onset")
                    .and_then(|raw| self.parse_number(row, "onset", raw, false))?;
                let duration = self
                    .cell(row, duration_idx, "duration")?
                    .parse::<f64>()
                    .unwrap_or(f64::NAN);
                let condition = self.cell(row, type_idx, "trial_type")?.to_string();
                Ok(EventRecord {
                    onset,
                    duration,
                    condition,
                })
            })
            .collect()
    }

    /// Read one numeric column of a behavioural table; missing cells are `NaN`
    pub fn ratings(&self, column: &str) -> Result<Vec<f64>, PrepError> {
        let mut numeric = self.numeric_columns(&[column])?;
        Ok(numeric.columns.pop().unwrap_or_default())
    }

    /// Select numeric columns, in the requested order, as one vector per column.
    ///
    /// Missing values (`n/a`, empty) become `NaN`.
    pub fn numeric_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<NumericTable, PrepError> {
        let indices = names
            .iter()
            .map(|name| self.column_index(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns = vec![Vec::with_capacity(self.rows.len()); names.len()];
        for row in &self.rows {
            for ((column, &idx), name) in columns.iter_mut().zip(&indices).zip(names) {
                let raw = self.cell(row, idx, name.as_ref())?;
                column.push(self.parse_number(row, name.as_ref(), raw, true)?);
            }
        }

        Ok(NumericTable {
            path: self.path.clone(),
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            columns,
        })
    }

    fn cell<'r>(
        &self,
        row: &'r StringRecord,
        idx: usize,
        column: &str,
    ) -> Result<&'r str, PrepError> {
        row.get(idx).ok_or_else(|| PrepError::Parse {
            path: self.path.clone(),
            line: line_of(row),
            column: column.to_string(),
            message: "row is shorter than the header".to_string(),
        })
    }

    fn parse_number(
        &self,
        row: &StringRecord,
        column: &str,
        raw: &str,
        allow_missing: bool,
    ) -> Result<f64, PrepError> {
        if is_missing(raw) {
            if allow_missing {
                return Ok(f64::NAN);
            }
            return Err(PrepError::Parse {
                path: self.path.clone(),
                line: line_of(row),
                column: column.to_string(),
                message: format!("missing value '{raw}'"),
            });
        }
        raw.parse::<f64>().map_err(|e| PrepError::Parse {
            path: self.path.clone(),
            line: line_of(row),
            column: column.to_string(),
            message: format!("'{raw}': {e}"),
        })
    }
}

/// Named numeric columns of equal length
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTable {
    pub path: PathBuf,
    pub names: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl NumericTable {
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    /// Drop `n` rows from the start and `n` rows from the end.
    ///
    /// The table needs at least `2 * n` rows; exactly `2 * n` leaves it empty.
    pub fn trim(mut self, n: usize) -> Result<Self, PrepError> {
        let rows = self.row_count();
        let required = 2 * n;
        if rows < required {
            return Err(PrepError::InsufficientTimepoints {
                path: self.path,
                rows,
                required,
            });
        }
        for column in &mut self.columns {
            column.truncate(rows - n);
            column.drain(..n);
        }
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }
}

/// Whether a cell holds a missing-value marker
pub fn is_missing(raw: &str) -> bool {
    MISSING_VALUES.contains(&raw)
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}
