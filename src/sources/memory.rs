//! In-memory source
//!
//! Holds TSV text per run. Useful when the tables do not live in a BIDS
//! tree, and in tests.

use crate::error::PrepError;
use crate::tables::{NumericTable, TsvTable};
use crate::types::{EventRecord, Run};
use std::collections::HashMap;
use std::path::PathBuf;

use super::RunTableSource;

/// Source backed by TSV text keyed by run number
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    events: HashMap<u32, String>,
    confounds: HashMap<u32, String>,
    beh: HashMap<u32, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the event table of a run
    pub fn with_events(mut self, run: Run, tsv: impl Into<String>) -> Self {
        self.events.insert(run.number, tsv.into());
        self
    }

    /// Register the confound table of a run
    pub fn with_confounds(mut self, run: Run, tsv: impl Into<String>) -> Self {
        self.confounds.insert(run.number, tsv.into());
        self
    }

    /// Register the behavioural table of a run
    pub fn with_beh(mut self, run: Run, tsv: impl Into<String>) -> Self {
        self.beh.insert(run.number, tsv.into());
        self
    }

    fn table(
        tables: &HashMap<u32, String>,
        run: Run,
        kind: &str,
    ) -> Result<TsvTable, PrepError> {
        let path = PathBuf::from(format!("memory/{run}_{kind}.tsv"));
        match tables.get(&run.number) {
            Some(text) => TsvTable::parse(text, &path),
            None => Err(PrepError::MissingFile(path)),
        }
    }
}

impl RunTableSource for MemorySource {
    fn events(&self, run: Run) -> Result<Vec<EventRecord>, PrepError> {
        Self::table(&self.events, run, "events")?.events()
    }

    fn confounds(&self, run: Run, columns: &[String]) -> Result<NumericTable, PrepError> {
        Self::table(&self.confounds, run, "confounds")?.numeric_columns(columns)
    }

    fn ratings(&self, run: Run, column: &str) -> Result<Vec<f64>, PrepError> {
        Self::table(&self.beh, run, "beh")?.ratings(column)
    }
}
