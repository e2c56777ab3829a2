//! Extraction configuration.
//!
//! [`ExtractConfig`] carries every parameter the extractor needs: which
//! subject to read, where the BIDS dataset lives, and the timing constants of
//! the paradigm. Nothing is read from process-wide state; the configuration is
//! passed in at call time.
//!
//! All fields are `pub` so a configuration can be built with struct-update
//! syntax:
//!
//! ```
//! use glm_prep::ExtractConfig;
//!
//! let cfg = ExtractConfig {
//!     subject: "sub-07".to_string(),
//!     trim: 10,
//!     ..ExtractConfig::default()
//! };
//! assert_eq!(cfg.run_count(), 3);
//! ```
//!
//! or loaded from JSON, where omitted fields keep their defaults.

use crate::error::PrepError;
use crate::layout::{normalize_subject, FileTemplates};
use crate::types::Run;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Seconds subtracted from every event onset
pub const DEFAULT_CALIBRATION_OFFSET: f64 = 5.76;

/// Duration assigned to every event, in seconds
pub const DEFAULT_FIXED_DURATION: f64 = 7.92;

/// Timepoints dropped from each end of a run (dummy scans)
pub const DEFAULT_TRIM: usize = 11;

/// Runs acquired for a typical subject
pub const DEFAULT_RUN_COUNT: u32 = 3;

/// Order in which conditions appear in a [`RunInfo`](crate::types::RunInfo)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOrder {
    /// Order of first appearance in the event file
    #[default]
    FirstSeen,
    /// Lexicographic order of the condition labels
    Sorted,
}

/// Configuration for extracting one subject's condition information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Subject identifier, with or without the `sub-` prefix.
    ///
    /// Default: empty (must be set before extraction).
    pub subject: String,

    /// BIDS dataset root holding the raw event files.
    ///
    /// Default: `.`
    pub data_dir: PathBuf,

    /// Preprocessing derivatives holding the confound files.
    ///
    /// Default: `None`, meaning `<data_dir>/derivatives/fmriprep`.
    pub derivatives_dir: Option<PathBuf>,

    /// BIDS task label.
    ///
    /// Default: `"vignette"`.
    pub task: String,

    /// Template space of the preprocessed images.
    ///
    /// Default: `"MNI152NLin2009cAsym"`.
    pub space: String,

    /// Seconds subtracted from every onset.
    ///
    /// Default: `5.76`.
    pub calibration_offset: f64,

    /// Duration written for every event, replacing the file's value.
    ///
    /// Default: `7.92`.
    pub fixed_duration: f64,

    /// Timepoints removed from the start and from the end of each confound
    /// table.
    ///
    /// Default: `11`.
    pub trim: usize,

    /// Number of runs for subjects without an override.
    ///
    /// Default: `3`.
    pub default_run_count: u32,

    /// Per-subject run counts, keyed by normalized subject (`sub-35`).
    ///
    /// Default: `{"sub-35": 2}`.
    pub run_count_overrides: BTreeMap<String, u32>,

    /// Nuisance regressor columns selected from the confound table.
    pub regressor_columns: Vec<String>,

    /// Motion parameter columns used for motion covariates.
    pub motion_columns: Vec<String>,

    /// Column of the behavioural file holding each trial's rating.
    ///
    /// Default: `"moral_decision"`.
    pub rating_column: String,

    /// Condition ordering within each run.
    ///
    /// Default: [`ConditionOrder::FirstSeen`].
    pub condition_order: ConditionOrder,

    /// File name templates.
    pub templates: FileTemplates,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            subject: String::new(),
            data_dir: PathBuf::from("."),
            derivatives_dir: None,
            task: "vignette".to_string(),
            space: "MNI152NLin2009cAsym".to_string(),
            calibration_offset: DEFAULT_CALIBRATION_OFFSET,
            fixed_duration: DEFAULT_FIXED_DURATION,
            trim: DEFAULT_TRIM,
            default_run_count: DEFAULT_RUN_COUNT,
            run_count_overrides: BTreeMap::from([("sub-35".to_string(), 2)]),
            regressor_columns: default_regressor_columns(),
            motion_columns: default_motion_columns(),
            rating_column: "moral_decision".to_string(),
            condition_order: ConditionOrder::default(),
            templates: FileTemplates::default(),
        }
    }
}

impl ExtractConfig {
    /// Default configuration for a subject rooted at `data_dir`
    pub fn for_subject(subject: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            subject: subject.into(),
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, PrepError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file
    pub fn from_json_file(path: &Path) -> Result<Self, PrepError> {
        if !path.exists() {
            return Err(PrepError::MissingFile(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Subject identifier with the `sub-` prefix
    pub fn subject_label(&self) -> Result<String, PrepError> {
        normalize_subject(&self.subject)
    }

    /// Directory holding the confound files
    pub fn derivatives_dir(&self) -> PathBuf {
        self.derivatives_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("derivatives").join("fmriprep"))
    }

    /// Number of runs expected for the configured subject
    pub fn run_count(&self) -> u32 {
        self.subject_label()
            .ok()
            .and_then(|label| self.run_count_overrides.get(&label).copied())
            .unwrap_or(self.default_run_count)
    }

    /// Runs expected for the configured subject, in run order
    pub fn runs(&self) -> Vec<Run> {
        (1..=self.run_count()).map(Run::new).collect()
    }

    /// Check that the configuration can drive an extraction
    pub fn validate(&self) -> Result<(), PrepError> {
        self.subject_label()?;

        if !self.calibration_offset.is_finite() {
            return Err(PrepError::InvalidConfig(
                "calibration_offset must be finite".to_string(),
            ));
        }
        if !self.fixed_duration.is_finite() || self.fixed_duration < 0.0 {
            return Err(PrepError::InvalidConfig(
                "fixed_duration must be a non-negative number".to_string(),
            ));
        }
        if self.default_run_count == 0 || self.run_count_overrides.values().any(|&n| n == 0) {
            return Err(PrepError::InvalidConfig(
                "run counts must be at least 1".to_string(),
            ));
        }
        if self.regressor_columns.is_empty() {
            return Err(PrepError::InvalidConfig(
                "regressor_columns must not be empty".to_string(),
            ));
        }
        if self.rating_column.trim().is_empty() {
            return Err(PrepError::InvalidConfig(
                "rating_column must not be empty".to_string(),
            ));
        }

        self.templates.validate()
    }
}

/// Nuisance columns: DVARS, framewise displacement, six aCompCor components
/// and four cosine drift terms
pub fn default_regressor_columns() -> Vec<String> {
    let mut columns = vec!["dvars".to_string(), "framewise_displacement".to_string()];
    columns.extend((0..6).map(|i| format!("a_comp_cor_{i:02}")));
    columns.extend((0..4).map(|i| format!("cosine{i:02}")));
    columns
}

/// Rigid-body motion parameters
pub fn default_motion_columns() -> Vec<String> {
    ["trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_regressor_columns() {
        let columns = default_regressor_columns();
        assert_eq!(columns.len(), 12);
        assert_eq!(columns[0], "dvars");
        assert_eq!(columns[1], "framewise_displacement");
        assert_eq!(columns[2], "a_comp_cor_00");
        assert_eq!(columns[7], "a_comp_cor_05");
        assert_eq!(columns[8], "cosine00");
        assert_eq!(columns[11], "cosine03");
    }

    #[test]
    fn test_run_count_exception() {
        let cfg = ExtractConfig::for_subject("35", "/data");
        assert_eq!(cfg.run_count(), 2);
        assert_eq!(cfg.runs(), vec![Run::new(1), Run::new(2)]);

        let cfg = ExtractConfig::for_subject("sub-35", "/data");
        assert_eq!(cfg.run_count(), 2);

        let cfg = ExtractConfig::for_subject("36", "/data");
        assert_eq!(cfg.run_count(), 3);
    }

    #[test]
    fn test_derivatives_dir_default() {
        let cfg = ExtractConfig::for_subject("01", "/data/bids");
        assert_eq!(
            cfg.derivatives_dir(),
            PathBuf::from("/data/bids/derivatives/fmriprep")
        );

        let cfg = ExtractConfig {
            derivatives_dir: Some(PathBuf::from("/scratch/prep")),
            ..cfg
        };
        assert_eq!(cfg.derivatives_dir(), PathBuf::from("/scratch/prep"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = ExtractConfig::from_json(
            r#"{ "subject": "12", "data_dir": "/bids", "trim": 5, "condition_order": "sorted" }"#,
        )
        .unwrap();
        assert_eq!(cfg.subject, "12");
        assert_eq!(cfg.trim, 5);
        assert_eq!(cfg.condition_order, ConditionOrder::Sorted);
        assert_eq!(cfg.calibration_offset, DEFAULT_CALIBRATION_OFFSET);
        assert_eq!(cfg.fixed_duration, DEFAULT_FIXED_DURATION);
        assert_eq!(cfg.run_count_overrides.get("sub-35"), Some(&2));
    }

    #[test]
    fn test_validate() {
        assert!(ExtractConfig::for_subject("01", "/d").validate().is_ok());
        assert!(matches!(
            ExtractConfig::default().validate(),
            Err(PrepError::InvalidConfig(_))
        ));

        let cfg = ExtractConfig {
            fixed_duration: -1.0,
            ..ExtractConfig::for_subject("01", "/d")
        };
        assert!(matches!(cfg.validate(), Err(PrepError::InvalidConfig(_))));

        let cfg = ExtractConfig {
            default_run_count: 0,
            ..ExtractConfig::for_subject("01", "/d")
        };
        assert!(matches!(cfg.validate(), Err(PrepError::InvalidConfig(_))));

        let cfg = ExtractConfig {
            rating_column: " ".to_string(),
            ..ExtractConfig::for_subject("01", "/d")
        };
        assert!(matches!(cfg.validate(), Err(PrepError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_config_file() {
        let result = ExtractConfig::from_json_file(Path::new("/nonexistent/glm-prep.json"));
        assert!(matches!(result, Err(PrepError::MissingFile(_))));
    }
}
