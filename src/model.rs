//! Model parameters
//!
//! Declarative parameter records for the first-level and second-level GLMs.
//! The estimation itself runs in external tooling; these records are what that
//! tooling is configured with.

use crate::config::DEFAULT_TRIM;
use crate::contrasts::{default_second_level_ids, ContrastSet};
use serde::{Deserialize, Serialize};

/// Repetition time in seconds
pub const REPETITION_TIME: f64 = 0.72;

/// Volumes kept per run after dummy-scan removal
pub const KEPT_VOLUMES: usize = 668;

/// High-pass filter cutoff in seconds
pub const HIGH_PASS_CUTOFF: f64 = 90.0;

/// Smoothing kernel FWHM in millimetres
pub const SMOOTHING_FWHM: [f64; 3] = [6.0, 6.0, 6.0];

/// Serial correlation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerialCorrelations {
    #[serde(rename = "AR(1)")]
    Ar1,
}

/// Estimation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    Classical,
}

/// Canonical HRF basis with optional derivatives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrfBasis {
    /// Flags for the temporal and dispersion derivatives
    pub derivs: [u8; 2],
}

/// Volume window kept from each run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeWindow {
    pub t_min: usize,
    pub t_size: usize,
}

/// First-level model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstLevelModel {
    pub repetition_time: f64,
    pub volume_window: VolumeWindow,
    pub input_units: String,
    pub output_units: String,
    pub high_pass_cutoff: f64,
    pub concatenate_runs: bool,
    pub bases: HrfBasis,
    pub serial_correlations: SerialCorrelations,
    pub estimation: EstimationMethod,
    /// Smoothing kernel; `None` fits unsmoothed data
    pub smoothing_fwhm: Option<[f64; 3]>,
    pub contrasts: ContrastSet,
}

impl FirstLevelModel {
    /// Parameters of the unsmoothed condition model
    pub fn unsmoothed() -> Self {
        Self {
            repetition_time: REPETITION_TIME,
            volume_window: VolumeWindow {
                t_min: DEFAULT_TRIM,
                t_size: KEPT_VOLUMES,
            },
            input_units: "secs".to_string(),
            output_units: "secs".to_string(),
            high_pass_cutoff: HIGH_PASS_CUTOFF,
            concatenate_runs: false,
            bases: HrfBasis { derivs: [1, 0] },
            serial_correlations: SerialCorrelations::Ar1,
            estimation: EstimationMethod::Classical,
            smoothing_fwhm: None,
            contrasts: ContrastSet::first_level(),
        }
    }

    /// Parameters of the smoothed condition model
    pub fn smoothed() -> Self {
        Self {
            smoothing_fwhm: Some(SMOOTHING_FWHM),
            ..Self::unsmoothed()
        }
    }

    /// Total volumes acquired per run, dummy scans included
    pub fn acquired_volumes(&self) -> usize {
        self.volume_window.t_min * 2 + self.volume_window.t_size
    }
}

/// Height threshold type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeightThresholdType {
    PValue,
}

/// Statistical map thresholding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdParams {
    pub contrast_index: usize,
    pub use_topo_fdr: bool,
    pub use_fwe_correction: bool,
    pub extent_threshold: usize,
    pub height_threshold: f64,
    pub height_threshold_type: HeightThresholdType,
    pub extent_fdr_p_threshold: f64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            contrast_index: 1,
            use_topo_fdr: true,
            use_fwe_correction: false,
            extent_threshold: 0,
            height_threshold: 0.001,
            height_threshold_type: HeightThresholdType::PValue,
            extent_fdr_p_threshold: 0.01,
        }
    }
}

/// Second-level (group) model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondLevelModel {
    /// Design of the group model
    pub design: String,
    pub estimation: EstimationMethod,
    pub group_contrast: bool,
    pub contrasts: ContrastSet,
    pub threshold: ThresholdParams,
    /// First-level contrast ids analysed at group level, one model each
    pub first_level_contrast_ids: Vec<String>,
}

impl Default for SecondLevelModel {
    fn default() -> Self {
        Self {
            design: "one_sample_t".to_string(),
            estimation: EstimationMethod::Classical,
            group_contrast: true,
            contrasts: ContrastSet::second_level(),
            threshold: ThresholdParams::default(),
            first_level_contrast_ids: default_second_level_ids(),
        }
    }
}
