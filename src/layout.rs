//! BIDS file layout
//!
//! Resolves the per-subject, per-run files of a BIDS dataset and its
//! preprocessing derivatives from name templates. Templates use `{name}`
//! placeholders:
//!
//! - `{subject}` - normalized subject label (`sub-35`)
//! - `{task}` - task label
//! - `{run}` - zero-padded run label (`01`)
//! - `{run_number}` - unpadded run number (`1`)
//! - `{space}` - template space of preprocessed images

use crate::config::ExtractConfig;
use crate::error::PrepError;
use crate::types::Run;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const SUBJECT_PREFIX: &str = "sub-";

/// Prefix a subject identifier with `sub-` unless it already carries it
pub fn normalize_subject(subject: &str) -> Result<String, PrepError> {
    let trimmed = subject.trim();
    let bare = trimmed.strip_prefix(SUBJECT_PREFIX).unwrap_or(trimmed);
    if bare.is_empty() {
        return Err(PrepError::InvalidConfig(
            "subject identifier is empty".to_string(),
        ));
    }
    if bare.contains(['/', '\\']) {
        return Err(PrepError::InvalidConfig(format!(
            "subject identifier '{subject}' contains a path separator"
        )));
    }
    Ok(format!("{SUBJECT_PREFIX}{bare}"))
}

/// File name templates, relative to the dataset or derivatives root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTemplates {
    /// Event table, relative to the dataset root
    pub events: String,
    /// Behavioural ratings table, relative to the dataset root
    pub beh: String,
    /// Confound table, relative to the derivatives root
    pub confounds: String,
    /// Preprocessed BOLD image, relative to the derivatives root
    pub bold: String,
    /// Brain mask, relative to the derivatives root
    pub mask: String,
}

impl Default for FileTemplates {
    fn default() -> Self {
        Self {
            events: "{subject}/func/{subject}_task-{task}_run-{run}_events.tsv".to_string(),
            beh: "{subject}/beh/{subject}_task-{task}_run-{run}_beh.tsv".to_string(),
            confounds: concat!(
                "{subject}/func/{subject}_task-{task}_run-{run_number}",
                "_desc-confounds_timeseries.tsv"
            )
            .to_string(),
            bold: concat!(
                "{subject}/func/{subject}_task-{task}_run-{run}",
                "_space-{space}_desc-preproc_bold.nii.gz"
            )
            .to_string(),
            mask: "{subject}/anat/{subject}_space-{space}_desc-brain_mask.nii.gz".to_string(),
        }
    }
}

impl FileTemplates {
    /// Reject templates with unknown or unterminated placeholders
    pub fn validate(&self) -> Result<(), PrepError> {
        let sample = TemplateValues {
            subject: "sub-x",
            task: "task",
            space: "space",
            run: Some(Run::new(1)),
        };
        for template in [
            &self.events,
            &self.beh,
            &self.confounds,
            &self.bold,
            &self.mask,
        ] {
            render(template, &sample)?;
        }
        Ok(())
    }
}

/// Values substituted into a template
struct TemplateValues<'a> {
    subject: &'a str,
    task: &'a str,
    space: &'a str,
    run: Option<Run>,
}

impl TemplateValues<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "subject" => Some(self.subject.to_string()),
            "task" => Some(self.task.to_string()),
            "space" => Some(self.space.to_string()),
            "run" => self.run.map(|r| r.label()),
            "run_number" => self.run.map(|r| r.number.to_string()),
            _ => None,
        }
    }
}

fn render(template: &str, values: &TemplateValues<'_>) -> Result<String, PrepError> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            PrepError::InvalidConfig(format!("unterminated placeholder in template '{template}'"))
        })?;
        let key = &after[..end];
        let value = values.lookup(key).ok_or_else(|| {
            PrepError::InvalidConfig(format!(
                "unknown placeholder '{{{key}}}' in template '{template}'"
            ))
        })?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Resolved file locations for one subject
#[derive(Debug, Clone)]
pub struct BidsLayout {
    subject: String,
    task: String,
    space: String,
    data_dir: PathBuf,
    derivatives_dir: PathBuf,
    templates: FileTemplates,
}

impl BidsLayout {
    pub fn new(config: &ExtractConfig) -> Result<Self, PrepError> {
        config.templates.validate()?;
        Ok(Self {
            subject: config.subject_label()?,
            task: config.task.clone(),
            space: config.space.clone(),
            data_dir: config.data_dir.clone(),
            derivatives_dir: config.derivatives_dir(),
            templates: config.templates.clone(),
        })
    }

    /// Normalized subject label
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn events_path(&self, run: Run) -> Result<PathBuf, PrepError> {
        let name = render(&self.templates.events, &self.values(Some(run)))?;
        Ok(self.data_dir.join(name))
    }

    pub fn beh_path(&self, run: Run) -> Result<PathBuf, PrepError> {
        let name = render(&self.templates.beh, &self.values(Some(run)))?;
        Ok(self.data_dir.join(name))
    }

    pub fn confounds_path(&self, run: Run) -> Result<PathBuf, PrepError> {
        let name = render(&self.templates.confounds, &self.values(Some(run)))?;
        Ok(self.derivatives_dir.join(name))
    }

    pub fn bold_path(&self, run: Run) -> Result<PathBuf, PrepError> {
        let name = render(&self.templates.bold, &self.values(Some(run)))?;
        Ok(self.derivatives_dir.join(name))
    }

    /// Brain mask of the subject; templates using run placeholders are rejected
    pub fn mask_path(&self) -> Result<PathBuf, PrepError> {
        let name = render(&self.templates.mask, &self.values(None))?;
        Ok(self.derivatives_dir.join(name))
    }

    fn values(&self, run: Option<Run>) -> TemplateValues<'_> {
        TemplateValues {
            subject: &self.subject,
            task: &self.task,
            space: &self.space,
            run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_normalize_subject() {
        assert_eq!(normalize_subject("35").unwrap(), "sub-35");
        assert_eq!(normalize_subject("sub-35").unwrap(), "sub-35");
        assert_eq!(normalize_subject(" 07 ").unwrap(), "sub-07");
        assert!(normalize_subject("").is_err());
        assert!(normalize_subject("sub-").is_err());
        assert!(normalize_subject("../etc").is_err());
    }

    #[test]
    fn test_default_paths() {
        let cfg = ExtractConfig::for_subject("04", "/bids");
        let layout = BidsLayout::new(&cfg).unwrap();

        assert_eq!(
            layout.events_path(Run::new(2)).unwrap(),
            Path::new("/bids/sub-04/func/sub-04_task-vignette_run-02_events.tsv")
        );
        assert_eq!(
            layout.beh_path(Run::new(3)).unwrap(),
            Path::new("/bids/sub-04/beh/sub-04_task-vignette_run-03_beh.tsv")
        );
        assert_eq!(
            layout.confounds_path(Run::new(2)).unwrap(),
            Path::new(
                "/bids/derivatives/fmriprep/sub-04/func/sub-04_task-vignette_run-2_desc-confounds_timeseries.tsv"
            )
        );
        assert_eq!(
            layout.bold_path(Run::new(1)).unwrap(),
            Path::new(
                "/bids/derivatives/fmriprep/sub-04/func/sub-04_task-vignette_run-01_space-MNI152NLin2009cAsym_desc-preproc_bold.nii.gz"
            )
        );
        assert_eq!(
            layout.mask_path().unwrap(),
            Path::new(
                "/bids/derivatives/fmriprep/sub-04/anat/sub-04_space-MNI152NLin2009cAsym_desc-brain_mask.nii.gz"
            )
        );
    }

    #[test]
    fn test_template_errors() {
        let mut cfg = ExtractConfig::for_subject("04", "/bids");
        cfg.templates.events = "{subject}/{session}_events.tsv".to_string();
        assert!(matches!(
            BidsLayout::new(&cfg),
            Err(PrepError::InvalidConfig(_))
        ));

        cfg.templates.events = "{subject/events.tsv".to_string();
        assert!(matches!(
            BidsLayout::new(&cfg),
            Err(PrepError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_mask_template_without_run() {
        let mut cfg = ExtractConfig::for_subject("04", "/bids");
        cfg.templates.mask = "{subject}/anat/{subject}_run-{run}_mask.nii.gz".to_string();
        let layout = BidsLayout::new(&cfg).unwrap();
        assert!(layout.mask_path().is_err());
    }
}
