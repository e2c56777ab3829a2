//! Pipeline orchestration
//!
//! This module provides the public entry points that take a configuration
//! from on-disk tables to encoded payloads, plus the input checks behind
//! `glm-prep doctor`.

use crate::config::ExtractConfig;
use crate::covariates::motion_covariates;
use crate::encoder::PayloadEncoder;
use crate::error::PrepError;
use crate::extractor::{extract, extract_ratings};
use crate::layout::BidsLayout;
use crate::model::FirstLevelModel;
use crate::tables::{TsvTable, EVENT_COLUMNS};
use crate::types::{CovariatePayload, RatingsPayload, SessionInfoPayload};
use serde::Serialize;
use std::path::Path;

/// Extract a subject's condition information and wrap it with `model`.
///
/// # Example
/// ```ignore
/// let config = ExtractConfig::for_subject("12", "/data/bids");
/// let payload = subject_session_info(&config, FirstLevelModel::unsmoothed())?;
/// ```
pub fn subject_session_info(
    config: &ExtractConfig,
    model: FirstLevelModel,
) -> Result<SessionInfoPayload, PrepError> {
    model.contrasts.validate()?;
    let subject_info = extract(config)?;
    PayloadEncoder::new().encode_session_info(config, subject_info, model)
}

/// Compute a subject's motion covariates and wrap them in a payload
pub fn subject_covariates(config: &ExtractConfig) -> Result<CovariatePayload, PrepError> {
    let runs = motion_covariates(config)?;
    PayloadEncoder::new().encode_covariates(config, runs)
}

/// Extract a subject's rated events and wrap them in a payload
pub fn subject_ratings(config: &ExtractConfig) -> Result<RatingsPayload, PrepError> {
    let runs = extract_ratings(config)?;
    PayloadEncoder::new().encode_ratings(config, runs)
}

/// Outcome of one input check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

/// One input check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl InputCheck {
    fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}

/// Check that every file the subject needs exists and has its columns.
///
/// Image files are only checked for existence and reported as warnings,
/// since the extractor itself never reads them. Behavioural files are only
/// needed for ratings, so their problems are warnings too.
pub fn check_inputs(config: &ExtractConfig) -> Vec<InputCheck> {
    let mut checks = Vec::new();

    if let Err(e) = config.validate() {
        checks.push(InputCheck::new("config", CheckStatus::Error, e.to_string()));
        return checks;
    }
    let layout = match BidsLayout::new(config) {
        Ok(layout) => layout,
        Err(e) => {
            checks.push(InputCheck::new("layout", CheckStatus::Error, e.to_string()));
            return checks;
        }
    };

    checks.push(InputCheck::new(
        "runs",
        CheckStatus::Ok,
        format!("{} expects {} runs", layout.subject(), config.run_count()),
    ));

    for run in config.runs() {
        checks.push(table_check(
            format!("{run}_events"),
            layout.events_path(run),
            &EVENT_COLUMNS,
        ));
        checks.push(table_check(
            format!("{run}_confounds"),
            layout.confounds_path(run),
            &config.regressor_columns,
        ));
        checks.push(downgrade(table_check(
            format!("{run}_beh"),
            layout.beh_path(run),
            &[config.rating_column.as_str()],
        )));
        checks.push(image_check(format!("{run}_bold"), layout.bold_path(run)));
    }
    checks.push(image_check("mask".to_string(), layout.mask_path()));

    checks
}

fn table_check<S: AsRef<str>>(
    name: String,
    path: Result<impl AsRef<Path>, PrepError>,
    columns: &[S],
) -> InputCheck {
    let result = path.and_then(|p| {
        let table = TsvTable::read(p.as_ref())?;
        table.require_columns(columns)?;
        Ok(table.row_count())
    });
    match result {
        Ok(rows) => InputCheck::new(name, CheckStatus::Ok, format!("{rows} rows")),
        Err(e) => InputCheck::new(name, CheckStatus::Error, e.to_string()),
    }
}

fn downgrade(mut check: InputCheck) -> InputCheck {
    if check.status == CheckStatus::Error {
        check.status = CheckStatus::Warning;
    }
    check
}

fn image_check(name: String, path: Result<impl AsRef<Path>, PrepError>) -> InputCheck {
    match path {
        Ok(p) if p.as_ref().is_file() => {
            InputCheck::new(name, CheckStatus::Ok, p.as_ref().display().to_string())
        }
        Ok(p) => InputCheck::new(
            name,
            CheckStatus::Warning,
            format!("not found: {}", p.as_ref().display()),
        ),
        Err(e) => InputCheck::new(name, CheckStatus::Error, e.to_string()),
    }
}
