//! Core types for glm-prep
//!
//! This module defines the records that flow from the on-disk event and
//! confound tables to the downstream model-specification step: event rows,
//! per-run condition information, the per-subject run sequence, and the
//! JSON payloads that carry them.

use crate::model::FirstLevelModel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of a run's event file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Onset in seconds from the start of the run
    pub onset: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Condition label (`trial_type` column)
    pub condition: String,
}

/// A scan run of one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Run {
    /// 1-based run number
    pub number: u32,
}

impl Run {
    pub fn new(number: u32) -> Self {
        Self { number }
    }

    /// Zero-padded two-digit label used in event file names ("01")
    pub fn label(&self) -> String {
        format!("{:02}", self.number)
    }

    /// Position of this run in the subject's run sequence
    pub fn index(&self) -> Option<usize> {
        (self.number as usize).checked_sub(1)
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.label())
    }
}

/// Condition and nuisance regressor information for one run.
///
/// The condition mapping is stored as parallel vectors: `onsets[i]` and
/// `durations[i]` belong to `conditions[i]`, and `regressors[j]` is the time
/// course of `regressor_names[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub conditions: Vec<String>,
    pub onsets: Vec<Vec<f64>>,
    pub durations: Vec<Vec<f64>>,
    pub regressor_names: Vec<String>,
    pub regressors: Vec<Vec<f64>>,
}

impl RunInfo {
    /// Onsets of a condition, if it occurs in this run
    pub fn onsets_for(&self, condition: &str) -> Option<&[f64]> {
        self.position(condition).map(|i| self.onsets[i].as_slice())
    }

    /// Durations of a condition, if it occurs in this run
    pub fn durations_for(&self, condition: &str) -> Option<&[f64]> {
        self.position(condition).map(|i| self.durations[i].as_slice())
    }

    /// Time course of a nuisance regressor
    pub fn regressor(&self, name: &str) -> Option<&[f64]> {
        self.regressor_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.regressors[i].as_slice())
    }

    /// Number of timepoints covered by the regressors
    pub fn timepoints(&self) -> usize {
        self.regressors.first().map(Vec::len).unwrap_or(0)
    }

    /// Total number of events across all conditions
    pub fn event_count(&self) -> usize {
        self.onsets.iter().map(Vec::len).sum()
    }

    fn position(&self, condition: &str) -> Option<usize> {
        self.conditions.iter().position(|c| c == condition)
    }
}

/// All runs of one subject, ordered by run number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectInfo {
    pub runs: Vec<RunInfo>,
}

impl SubjectInfo {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Run info by 1-based run number
    pub fn run(&self, run: Run) -> Option<&RunInfo> {
        run.index().and_then(|i| self.runs.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunInfo> {
        self.runs.iter()
    }
}

/// Rated events of one run.
///
/// Only events with a rating are kept. `conditions` groups them by their
/// condition label; `ratings` groups the same events by their integer rating
/// (`"1"`, `"4"`, ...). Both use the parallel-vector layout of [`RunInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedRunInfo {
    pub run: Run,
    pub conditions: Vec<String>,
    pub onsets: Vec<Vec<f64>>,
    pub durations: Vec<Vec<f64>>,
    pub ratings: Vec<String>,
    pub rating_onsets: Vec<Vec<f64>>,
    pub rating_durations: Vec<Vec<f64>>,
}

impl RatedRunInfo {
    /// Onsets of the events given `rating`
    pub fn onsets_for_rating(&self, rating: &str) -> Option<&[f64]> {
        self.ratings
            .iter()
            .position(|r| r == rating)
            .map(|i| self.rating_onsets[i].as_slice())
    }

    /// Number of rated events
    pub fn event_count(&self) -> usize {
        self.rating_onsets.iter().map(Vec::len).sum()
    }
}

/// Motion covariates for one run: named columns over trimmed timepoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionCovariates {
    pub run: Run,
    pub names: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl MotionCovariates {
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn timepoints(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }
}

/// Producer metadata embedded in every payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where a payload's inputs came from and when it was computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub subject: String,
    pub data_dir: String,
    pub derivatives_dir: String,
    pub task: String,
    pub computed_at_utc: String,
}

/// Condition information of one subject, ready for model specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfoPayload {
    pub schema_version: String,
    pub producer: Producer,
    pub provenance: Provenance,
    pub subject_info: SubjectInfo,
    pub model: FirstLevelModel,
}

/// Rated events of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingsPayload {
    pub schema_version: String,
    pub producer: Producer,
    pub provenance: Provenance,
    pub runs: Vec<RatedRunInfo>,
}

/// Motion covariates of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovariatePayload {
    pub schema_version: String,
    pub producer: Producer,
    pub provenance: Provenance,
    pub runs: Vec<MotionCovariates>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run_info() -> RunInfo {
        RunInfo {
            conditions: vec!["fair".to_string(), "socn".to_string()],
            onsets: vec![vec![4.24, 14.24], vec![30.0]],
            durations: vec![vec![7.92, 7.92], vec![7.92]],
            regressor_names: vec!["dvars".to_string()],
            regressors: vec![vec![1.0, 2.0, 3.0]],
        }
    }

    #[test]
    fn test_run_labels() {
        assert_eq!(Run::new(1).label(), "01");
        assert_eq!(Run::new(12).label(), "12");
        assert_eq!(Run::new(3).to_string(), "run-03");
        assert_eq!(Run::new(1).index(), Some(0));
        assert_eq!(Run::new(0).index(), None);
    }

    #[test]
    fn test_keyed_access() {
        let info = sample_run_info();
        assert_eq!(info.onsets_for("fair"), Some(&[4.24, 14.24][..]));
        assert_eq!(info.durations_for("socn"), Some(&[7.92][..]));
        assert_eq!(info.onsets_for("lib"), None);
        assert_eq!(info.regressor("dvars").map(<[f64]>::len), Some(3));
        assert_eq!(info.timepoints(), 3);
        assert_eq!(info.event_count(), 3);
    }

    #[test]
    fn test_subject_info_serializes_as_sequence() {
        let subject = SubjectInfo {
            runs: vec![sample_run_info()],
        };
        let json = serde_json::to_value(&subject).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["conditions"][1], "socn");
        assert_eq!(subject.run(Run::new(1)), Some(&subject.runs[0]));
        assert_eq!(subject.run(Run::new(2)), None);
    }
}
