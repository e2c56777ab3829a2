//! Error types for glm-prep

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing GLM inputs
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Missing column '{column}' in {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("Failed to parse {} line {line}, column '{column}': {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        column: String,
        message: String,
    },

    #[error("Invalid run: {0}")]
    InvalidRun(String),

    #[error(
        "Insufficient timepoints in {}: {rows} rows, need at least {required}",
        .path.display()
    )]
    InsufficientTimepoints {
        path: PathBuf,
        rows: usize,
        required: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid contrast: {0}")]
    InvalidContrast(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
