//! Motion covariate expansion
//!
//! Expands the six rigid-body motion parameters of a run into 24 nuisance
//! columns: the z-scored parameters, their squares, their first differences
//! and the squared first differences.

use crate::config::ExtractConfig;
use crate::error::PrepError;
use crate::sources::{BidsSource, RunTableSource};
use crate::tables::NumericTable;
use crate::types::{MotionCovariates, Run};
use log::info;

/// Builder for motion covariates
pub struct CovariateBuilder;

impl CovariateBuilder {
    /// Expand trimmed motion columns into 24 covariates.
    ///
    /// Values that are undefined (the first difference of the first
    /// timepoint, missing input cells) are set to zero.
    pub fn build(run: Run, motion: &NumericTable) -> MotionCovariates {
        let zscored: Vec<Vec<f64>> = motion.columns.iter().map(|c| zscore(c)).collect();
        let diffs: Vec<Vec<f64>> = zscored.iter().map(|c| first_difference(c)).collect();

        let mut names = Vec::with_capacity(motion.names.len() * 4);
        let mut columns = Vec::with_capacity(motion.names.len() * 4);

        for (name, column) in motion.names.iter().zip(&zscored) {
            names.push(name.clone());
            columns.push(column.clone());
        }
        for (name, column) in motion.names.iter().zip(&zscored) {
            names.push(format!("{name}^2"));
            columns.push(column.iter().map(|v| v * v).collect());
        }
        for (name, column) in motion.names.iter().zip(&diffs) {
            names.push(format!("{name}_diff"));
            columns.push(column.clone());
        }
        for (name, column) in motion.names.iter().zip(&diffs) {
            names.push(format!("{name}_diff^2"));
            columns.push(column.iter().map(|v| v * v).collect());
        }

        for column in &mut columns {
            fill_undefined(column);
        }

        MotionCovariates {
            run,
            names,
            columns,
        }
    }
}

/// Motion covariates of every expected run of the configured subject
pub fn motion_covariates(config: &ExtractConfig) -> Result<Vec<MotionCovariates>, PrepError> {
    config.validate()?;
    let source = BidsSource::new(config)?;
    motion_covariates_from(config, &source, &config.runs())
}

/// Motion covariates for `runs`, read from `source`, in run order
pub fn motion_covariates_from(
    config: &ExtractConfig,
    source: &dyn RunTableSource,
    runs: &[Run],
) -> Result<Vec<MotionCovariates>, PrepError> {
    let mut sorted = runs.to_vec();
    sorted.sort();
    sorted.dedup();

    sorted
        .into_iter()
        .map(|run| {
            let motion = source
                .confounds(run, &config.motion_columns)?
                .trim(config.trim)?;
            let covariates = CovariateBuilder::build(run, &motion);
            info!(
                "{run}: {} motion covariates over {} timepoints",
                covariates.names.len(),
                covariates.timepoints()
            );
            Ok(covariates)
        })
        .collect()
}

/// Z-score with the sample standard deviation, ignoring NaN.
///
/// A constant column maps to zeros.
fn zscore(values: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = finite.len();
    if n < 2 {
        return vec![0.0; values.len()];
    }

    let mean = finite.iter().sum::<f64>() / n as f64;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = variance.sqrt();
    if std == 0.0 {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - mean) / std).collect()
}

/// Backward difference; the first element is undefined (NaN)
fn first_difference(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(f64::NAN);
    out.extend(values.windows(2).map(|w| w[1] - w[0]));
    out
}

fn fill_undefined(values: &mut [f64]) {
    for v in values.iter_mut().filter(|v| v.is_nan()) {
        *v = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_motion_columns;
    use crate::sources::MemorySource;
    use std::path::PathBuf;

    fn motion_table(rows: usize) -> NumericTable {
        let names = default_motion_columns();
        let columns = (0..names.len())
            .map(|c| (0..rows).map(|r| (r * (c + 1)) as f64).collect())
            .collect();
        NumericTable {
            path: PathBuf::from("motion.tsv"),
            names,
            columns,
        }
    }

    #[test]
    fn test_zscore() {
        let z = zscore(&[1.0, 2.0, 3.0]);
        assert_eq!(z, vec![-1.0, 0.0, 1.0]);
        assert_eq!(zscore(&[4.0, 4.0, 4.0]), vec![0.0, 0.0, 0.0]);

        let z = zscore(&[1.0, f64::NAN, 3.0]);
        assert!((z[0] + 0.7071067811865475).abs() < 1e-12);
        assert!(z[1].is_nan());
    }

    #[test]
    fn test_first_difference() {
        let d = first_difference(&[1.0, 4.0, 9.0]);
        assert!(d[0].is_nan());
        assert_eq!(&d[1..], &[3.0, 5.0]);
        assert!(first_difference(&[]).is_empty());
    }

    #[test]
    fn test_build_layout() {
        let covariates = CovariateBuilder::build(Run::new(1), &motion_table(5));
        assert_eq!(covariates.names.len(), 24);
        assert_eq!(covariates.timepoints(), 5);
        assert_eq!(covariates.names[0], "trans_x");
        assert_eq!(covariates.names[6], "trans_x^2");
        assert_eq!(covariates.names[12], "trans_x_diff");
        assert_eq!(covariates.names[23], "rot_z_diff^2");

        let diff = covariates.column("trans_x_diff").unwrap();
        assert_eq!(diff[0], 0.0);
        assert!(covariates
            .columns
            .iter()
            .flatten()
            .all(|v| v.is_finite()));

        let z = covariates.column("rot_y").unwrap();
        let squared = covariates.column("rot_y^2").unwrap();
        for (a, b) in z.iter().zip(squared) {
            assert!((a * a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_motion_covariates_from_source() {
        let mut tsv = default_motion_columns().join("\t");
        tsv.push('\n');
        for r in 0..30 {
            let row: Vec<String> = (0..6).map(|c| format!("{}", (r * c) as f64 * 0.01)).collect();
            tsv.push_str(&row.join("\t"));
            tsv.push('\n');
        }

        let config = ExtractConfig::for_subject("35", "/unused");
        let source = MemorySource::new()
            .with_confounds(Run::new(2), tsv.clone())
            .with_confounds(Run::new(1), tsv);
        let all = motion_covariates_from(&config, &source, &[Run::new(2), Run::new(1)]).unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].run, Run::new(1));
        assert_eq!(all[1].run, Run::new(2));
        assert_eq!(all[0].timepoints(), 8);
    }
}
