//! Payload encoding
//!
//! This module wraps extraction results in versioned JSON payloads with
//! producer and provenance metadata, so downstream model specification can
//! tell which inputs and which build produced them.

use crate::config::ExtractConfig;
use crate::error::PrepError;
use crate::model::FirstLevelModel;
use crate::types::{
    CovariatePayload, MotionCovariates, Producer, Provenance, RatedRunInfo, RatingsPayload,
    SessionInfoPayload, SubjectInfo,
};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Schema of session info payloads
pub const SESSION_INFO_SCHEMA: &str = "glm.session_info.v1";

/// Schema of motion covariate payloads
pub const COVARIATES_SCHEMA: &str = "glm.motion_covariates.v1";

/// Schema of rated event payloads
pub const RATINGS_SCHEMA: &str = "glm.ratings.v1";

/// Encoder for session info and covariate payloads
pub struct PayloadEncoder {
    instance_id: String,
}

impl Default for PayloadEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Wrap a subject's condition information with the model it feeds
    pub fn encode_session_info(
        &self,
        config: &ExtractConfig,
        subject_info: SubjectInfo,
        model: FirstLevelModel,
    ) -> Result<SessionInfoPayload, PrepError> {
        Ok(SessionInfoPayload {
            schema_version: SESSION_INFO_SCHEMA.to_string(),
            producer: self.producer(),
            provenance: provenance(config)?,
            subject_info,
            model,
        })
    }

    /// Wrap a subject's motion covariates
    pub fn encode_covariates(
        &self,
        config: &ExtractConfig,
        runs: Vec<MotionCovariates>,
    ) -> Result<CovariatePayload, PrepError> {
        Ok(CovariatePayload {
            schema_version: COVARIATES_SCHEMA.to_string(),
            producer: self.producer(),
            provenance: provenance(config)?,
            runs,
        })
    }

    /// Wrap a subject's rated events
    pub fn encode_ratings(
        &self,
        config: &ExtractConfig,
        runs: Vec<RatedRunInfo>,
    ) -> Result<RatingsPayload, PrepError> {
        Ok(RatingsPayload {
            schema_version: RATINGS_SCHEMA.to_string(),
            producer: self.producer(),
            provenance: provenance(config)?,
            runs,
        })
    }

    /// Encode session info to pretty JSON
    pub fn session_info_to_json(
        &self,
        config: &ExtractConfig,
        subject_info: SubjectInfo,
        model: FirstLevelModel,
    ) -> Result<String, PrepError> {
        let payload = self.encode_session_info(config, subject_info, model)?;
        serde_json::to_string_pretty(&payload).map_err(PrepError::JsonError)
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }
}

fn provenance(config: &ExtractConfig) -> Result<Provenance, PrepError> {
    Ok(Provenance {
        subject: config.subject_label()?,
        data_dir: config.data_dir.display().to_string(),
        derivatives_dir: config.derivatives_dir().display().to_string(),
        task: config.task.clone(),
        computed_at_utc: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RatedRunInfo, Run, RunInfo};

    fn sample_subject_info() -> SubjectInfo {
        SubjectInfo {
            runs: vec![RunInfo {
                conditions: vec!["fair".to_string()],
                onsets: vec![vec![4.24]],
                durations: vec![vec![7.92]],
                regressor_names: vec!["dvars".to_string()],
                regressors: vec![vec![0.5, 0.25]],
            }],
        }
    }

    #[test]
    fn test_encode_session_info() {
        let config = ExtractConfig::for_subject("35", "/bids");
        let encoder = PayloadEncoder::with_instance_id("test-instance".to_string());
        let payload = encoder
            .encode_session_info(&config, sample_subject_info(), FirstLevelModel::unsmoothed())
            .unwrap();

        assert_eq!(payload.schema_version, SESSION_INFO_SCHEMA);
        assert_eq!(payload.producer.name, PRODUCER_NAME);
        assert_eq!(payload.producer.version, VERSION);
        assert_eq!(payload.producer.instance_id, "test-instance");
        assert_eq!(payload.provenance.subject, "sub-35");
        assert_eq!(payload.provenance.data_dir, "/bids");
        assert_eq!(payload.provenance.task, "vignette");
        assert!(chrono::DateTime::parse_from_rfc3339(&payload.provenance.computed_at_utc).is_ok());
        assert_eq!(payload.subject_info.len(), 1);
    }

    #[test]
    fn test_session_info_to_json() {
        let config = ExtractConfig::for_subject("01", "/bids");
        let json = PayloadEncoder::new()
            .session_info_to_json(&config, sample_subject_info(), FirstLevelModel::smoothed())
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["schema_version"], SESSION_INFO_SCHEMA);
        assert!(parsed["subject_info"].is_array());
        assert_eq!(parsed["subject_info"][0]["conditions"][0], "fair");
        assert_eq!(parsed["model"]["contrasts"]["contrasts"].as_array().unwrap().len(), 17);
    }

    #[test]
    fn test_encode_covariates() {
        let config = ExtractConfig::for_subject("01", "/bids");
        let runs = vec![MotionCovariates {
            run: Run::new(1),
            names: vec!["trans_x".to_string()],
            columns: vec![vec![0.0, 1.0]],
        }];
        let payload = PayloadEncoder::new().encode_covariates(&config, runs).unwrap();
        assert_eq!(payload.schema_version, COVARIATES_SCHEMA);
        assert_eq!(payload.runs[0].run, Run::new(1));
        assert_ne!(payload.producer.instance_id, "");
    }

    #[test]
    fn test_encode_ratings() {
        let config = ExtractConfig::for_subject("07", "/bids");
        let runs = vec![RatedRunInfo {
            run: Run::new(1),
            conditions: vec!["lib".to_string()],
            onsets: vec![vec![4.24]],
            durations: vec![vec![7.92]],
            ratings: vec!["3".to_string()],
            rating_onsets: vec![vec![4.24]],
            rating_durations: vec![vec![7.92]],
        }];
        let payload = PayloadEncoder::with_instance_id("r".to_string())
            .encode_ratings(&config, runs)
            .unwrap();

        assert_eq!(payload.schema_version, RATINGS_SCHEMA);
        assert_eq!(payload.provenance.subject, "sub-07");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["runs"][0]["ratings"][0], "3");
        assert_eq!(json["runs"][0]["run"]["number"], 1);
    }
}
