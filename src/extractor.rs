//! Subject event extraction
//!
//! Turns a subject's per-run event tables and confound tables into the
//! condition information consumed by model specification:
//!
//! 1. Shift every onset by the calibration offset and overwrite every duration
//!    with the fixed trial duration
//! 2. Group events by condition into parallel onset/duration lists
//! 3. Select the nuisance regressors and drop the dummy-scan window from both
//!    ends
//! 4. Place each run at its run number, independent of the order runs are read
//!
//! The ratings variant replaces step 3 with a row-wise join against the run's
//! behavioural ratings, keeping rated events only and grouping them a second
//! time by integer rating.

use crate::config::{ConditionOrder, ExtractConfig};
use crate::error::PrepError;
use crate::sources::{BidsSource, RunTableSource};
use crate::tables::is_missing;
use crate::types::{EventRecord, RatedRunInfo, Run, RunInfo, SubjectInfo};
use log::{debug, info, warn};

/// Extract condition information for the subject named in `config` from the
/// BIDS dataset at `config.data_dir`.
///
/// # Errors
/// Fails on the first missing file, missing column, or malformed value; no
/// partial result is returned.
///
/// # Example
/// ```ignore
/// let config = ExtractConfig::for_subject("12", "/data/bids");
/// let subject_info = extract(&config)?;
/// assert_eq!(subject_info.len(), 3);
/// ```
pub fn extract(config: &ExtractConfig) -> Result<SubjectInfo, PrepError> {
    SubjectEventExtractor::new(config.clone())?.extract()
}

/// Extract the rated events of the subject named in `config`.
///
/// Each run's event table is joined row by row with the rating column of the
/// run's behavioural table; events without a rating are dropped.
pub fn extract_ratings(config: &ExtractConfig) -> Result<Vec<RatedRunInfo>, PrepError> {
    SubjectEventExtractor::new(config.clone())?.extract_ratings()
}

/// Extractor bound to one configuration
pub struct SubjectEventExtractor {
    config: ExtractConfig,
}

impl SubjectEventExtractor {
    /// Create an extractor; the configuration is validated up front
    pub fn new(config: ExtractConfig) -> Result<Self, PrepError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Extract every expected run from the BIDS dataset
    pub fn extract(&self) -> Result<SubjectInfo, PrepError> {
        let source = BidsSource::new(&self.config)?;
        self.extract_from(&source, &self.config.runs())
    }

    /// Extract the given runs from `source`.
    ///
    /// `runs` may come in any order; each run lands at position
    /// `run.number - 1`. Every expected run must be given exactly once.
    pub fn extract_from(
        &self,
        source: &dyn RunTableSource,
        runs: &[Run],
    ) -> Result<SubjectInfo, PrepError> {
        let runs = self.fill_runs(runs, |subject, run| {
            let run_info = self.run_info(source, run)?;
            info!(
                "{subject} {run}: {} conditions, {} events, {} timepoints",
                run_info.conditions.len(),
                run_info.event_count(),
                run_info.timepoints()
            );
            Ok(run_info)
        })?;

        Ok(SubjectInfo { runs })
    }

    /// Extract every expected run's rated events from the BIDS dataset
    pub fn extract_ratings(&self) -> Result<Vec<RatedRunInfo>, PrepError> {
        let source = BidsSource::new(&self.config)?;
        self.extract_ratings_from(&source, &self.config.runs())
    }

    /// Extract the rated events of the given runs from `source`, in run order.
    ///
    /// Runs are placed the same way as in [`extract_from`](Self::extract_from).
    pub fn extract_ratings_from(
        &self,
        source: &dyn RunTableSource,
        runs: &[Run],
    ) -> Result<Vec<RatedRunInfo>, PrepError> {
        self.fill_runs(runs, |subject, run| {
            let rated = self.rated_run_info(source, run)?;
            info!(
                "{subject} {run}: {} rated events, {} rating levels",
                rated.event_count(),
                rated.ratings.len()
            );
            Ok(rated)
        })
    }

    /// Run `per_run` for each of `runs` and place the results by run number
    fn fill_runs<T>(
        &self,
        runs: &[Run],
        mut per_run: impl FnMut(&str, Run) -> Result<T, PrepError>,
    ) -> Result<Vec<T>, PrepError> {
        let run_count = self.config.run_count() as usize;
        let subject = self.config.subject_label()?;
        let mut slots: Vec<Option<T>> = (0..run_count).map(|_| None).collect();

        for &run in runs {
            let index = run
                .index()
                .filter(|&i| i < run_count)
                .ok_or_else(|| {
                    PrepError::InvalidRun(format!("{subject} has {run_count} runs, got {run}"))
                })?;
            if slots[index].is_some() {
                return Err(PrepError::InvalidRun(format!(
                    "{subject} {run} given more than once"
                )));
            }
            slots[index] = Some(per_run(&subject, run)?);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    let run = Run::new(i as u32 + 1);
                    PrepError::InvalidRun(format!("{subject} {run} was not extracted"))
                })
            })
            .collect()
    }

    fn run_info(&self, source: &dyn RunTableSource, run: Run) -> Result<RunInfo, PrepError> {
        let events = adjust_events(
            source.events(run)?,
            self.config.calibration_offset,
            self.config.fixed_duration,
        );
        let groups = group_by_condition(&events, self.config.condition_order);

        let confounds = source
            .confounds(run, &self.config.regressor_columns)?
            .trim(self.config.trim)?;

        Ok(RunInfo {
            conditions: groups.conditions,
            onsets: groups.onsets,
            durations: groups.durations,
            regressor_names: confounds.names,
            regressors: confounds.columns,
        })
    }

    fn rated_run_info(
        &self,
        source: &dyn RunTableSource,
        run: Run,
    ) -> Result<RatedRunInfo, PrepError> {
        let events = adjust_events(
            source.events(run)?,
            self.config.calibration_offset,
            self.config.fixed_duration,
        );
        let ratings = source.ratings(run, &self.config.rating_column)?;
        if ratings.len() != events.len() {
            warn!("{run}: {} events but {} ratings", events.len(), ratings.len());
        }

        let rated = rate_events(events, &ratings);
        let conditions = group_by_condition(&rated.events, self.config.condition_order);
        let levels = group_by_condition(&rated.ratings, self.config.condition_order);

        Ok(RatedRunInfo {
            run,
            conditions: conditions.conditions,
            onsets: conditions.onsets,
            durations: conditions.durations,
            ratings: levels.conditions,
            rating_onsets: levels.onsets,
            rating_durations: levels.durations,
        })
    }
}

/// Subtract `offset` from every onset and set every duration to `duration`
pub fn adjust_events(events: Vec<EventRecord>, offset: f64, duration: f64) -> Vec<EventRecord> {
    events
        .into_iter()
        .map(|event| EventRecord {
            onset: event.onset - offset,
            duration,
            condition: event.condition,
        })
        .collect()
}

/// Events split by whether they carry a rating
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatedEvents {
    /// Rated events with their condition labels
    pub events: Vec<EventRecord>,
    /// The same events labelled by their rating truncated to an integer
    pub ratings: Vec<EventRecord>,
}

/// Pair each event with the rating on the same row.
///
/// Events without a finite rating are dropped, as are events past the end of
/// `ratings`. Extra ratings are ignored.
pub fn rate_events(events: Vec<EventRecord>, ratings: &[f64]) -> RatedEvents {
    let mut rated = RatedEvents::default();

    for (i, event) in events.into_iter().enumerate() {
        let Some(rating) = ratings.get(i).copied().filter(|r| r.is_finite()) else {
            debug!("dropping unrated event at {}s", event.onset);
            continue;
        };
        rated.ratings.push(EventRecord {
            onset: event.onset,
            duration: event.duration,
            condition: (rating.trunc() as i64).to_string(),
        });
        rated.events.push(event);
    }

    rated
}

/// Events grouped by condition as parallel lists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionGroups {
    pub conditions: Vec<String>,
    pub onsets: Vec<Vec<f64>>,
    pub durations: Vec<Vec<f64>>,
}

/// Group events by condition, keeping file order within each group.
///
/// Events without a condition label (`n/a` or empty) are left out.
pub fn group_by_condition(events: &[EventRecord], order: ConditionOrder) -> ConditionGroups {
    let mut groups = ConditionGroups::default();

    for event in events {
        if is_missing(&event.condition) {
            debug!("skipping event at {}s without a condition", event.onset);
            continue;
        }
        let index = match groups.conditions.iter().position(|c| *c == event.condition) {
            Some(index) => index,
            None => {
                groups.conditions.push(event.condition.clone());
                groups.onsets.push(Vec::new());
                groups.durations.push(Vec::new());
                groups.conditions.len() - 1
            }
        };
        groups.onsets[index].push(event.onset);
        groups.durations[index].push(event.duration);
    }

    if order == ConditionOrder::Sorted {
        let mut zipped: Vec<_> = groups
            .conditions
            .into_iter()
            .zip(groups.onsets)
            .zip(groups.durations)
            .collect();
        zipped.sort_by(|a, b| a.0 .0.cmp(&b.0 .0));

        groups = ConditionGroups::default();
        for ((condition, onsets), durations) in zipped {
            groups.conditions.push(condition);
            groups.onsets.push(onsets);
            groups.durations.push(durations);
        }
    }

    groups
}
