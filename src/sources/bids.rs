//! BIDS dataset source
//!
//! Reads event and behavioural files from the dataset root and confound files
//! from the preprocessing derivatives, using the configured file templates.

use crate::config::ExtractConfig;
use crate::error::PrepError;
use crate::layout::BidsLayout;
use crate::tables::{NumericTable, TsvTable};
use crate::types::{EventRecord, Run};
use log::debug;

use super::RunTableSource;

/// Source backed by files on disk
pub struct BidsSource {
    layout: BidsLayout,
}

impl BidsSource {
    pub fn new(config: &ExtractConfig) -> Result<Self, PrepError> {
        Ok(Self {
            layout: BidsLayout::new(config)?,
        })
    }

    pub fn layout(&self) -> &BidsLayout {
        &self.layout
    }
}

impl RunTableSource for BidsSource {
    fn events(&self, run: Run) -> Result<Vec<EventRecord>, PrepError> {
        let path = self.layout.events_path(run)?;
        debug!("{} {}: events from {}", self.layout.subject(), run, path.display());
        TsvTable::read(&path)?.events()
    }

    fn confounds(&self, run: Run, columns: &[String]) -> Result<NumericTable, PrepError> {
        let path = self.layout.confounds_path(run)?;
        debug!("{} {}: confounds from {}", self.layout.subject(), run, path.display());
        TsvTable::read(&path)?.numeric_columns(columns)
    }

    fn ratings(&self, run: Run, column: &str) -> Result<Vec<f64>, PrepError> {
        let path = self.layout.beh_path(run)?;
        debug!("{} {}: ratings from {}", self.layout.subject(), run, path.display());
        TsvTable::read(&path)?.ratings(column)
    }
}
