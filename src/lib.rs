//! glm-prep - Subject event extraction for fMRI general linear models
//!
//! glm-prep turns a BIDS dataset's per-run event tables and fMRIPrep confound
//! tables into the condition information a first-level GLM is specified with:
//! table reading → onset calibration → condition grouping → nuisance regressor
//! selection and dummy-scan trimming → payload encoding.
//!
//! ## Modules
//!
//! - **Extraction**: per-subject condition onsets, durations and nuisance regressors
//! - **Contrasts & models**: first- and second-level contrasts and model parameters
//! - **Covariates**: expanded motion covariates from the confound tables
//! - **Ratings**: events joined with per-trial behavioural ratings

pub mod config;
pub mod contrasts;
pub mod covariates;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod sources;
pub mod tables;
pub mod types;

pub use config::{ConditionOrder, ExtractConfig};
pub use contrasts::{Contrast, ContrastSet};
pub use error::PrepError;
pub use extractor::{extract, extract_ratings, SubjectEventExtractor};
pub use model::{FirstLevelModel, SecondLevelModel};
pub use pipeline::{check_inputs, subject_covariates, subject_ratings, subject_session_info};
pub use types::{EventRecord, RatedRunInfo, Run, RunInfo, SubjectInfo};

/// glm-prep version embedded in all payloads
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for payloads
pub const PRODUCER_NAME: &str = "glm-prep";
