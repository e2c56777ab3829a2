//! Run table sources
//!
//! This module provides sources that supply the event table, the confound
//! table and the behavioural ratings of each run. The extractor only sees
//! this trait, so the same logic runs over a BIDS dataset on disk or over
//! tables held in memory.

mod bids;
mod memory;

pub use bids::BidsSource;
pub use memory::MemorySource;

use crate::error::PrepError;
use crate::tables::NumericTable;
use crate::types::{EventRecord, Run};

/// Trait for suppliers of per-run tables
pub trait RunTableSource {
    /// Event rows of a run, in file order
    fn events(&self, run: Run) -> Result<Vec<EventRecord>, PrepError>;

    /// Selected confound columns of a run, untrimmed
    fn confounds(&self, run: Run, columns: &[String]) -> Result<NumericTable, PrepError>;

    /// Per-trial ratings of a run in file order; missing ratings are `NaN`
    fn ratings(&self, run: Run, column: &str) -> Result<Vec<f64>, PrepError>;
}
