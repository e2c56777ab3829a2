//! Contrast definitions
//!
//! The paradigm presents eight vignette conditions: six moral foundations
//! (care split into physical and emotional), liberty, and a social-norm
//! baseline. First-level contrasts are literal weight vectors over those
//! conditions; the second level tests the group mean of one first-level
//! contrast image at a time.

use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Condition labels in model order
pub const CONDITION_NAMES: [&str; 8] = [
    "carep", "carem", "fair", "lib", "loy", "auth", "pur", "socn",
];

/// Regressor name of the second-level one-sample design
pub const GROUP_MEAN: &str = "mean";

/// Statistic computed for a contrast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatKind {
    T,
}

/// A named linear contrast over conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contrast {
    pub name: String,
    pub stat: StatKind,
    pub conditions: Vec<String>,
    pub weights: Vec<f64>,
}

impl Contrast {
    /// T contrast over the eight paradigm conditions
    pub fn t(name: &str, weights: [f64; 8]) -> Self {
        Self {
            name: name.to_string(),
            stat: StatKind::T,
            conditions: CONDITION_NAMES.iter().map(|c| c.to_string()).collect(),
            weights: weights.to_vec(),
        }
    }

    /// Check shape and values
    pub fn validate(&self) -> Result<(), PrepError> {
        if self.name.trim().is_empty() {
            return Err(PrepError::InvalidContrast("contrast name is empty".to_string()));
        }
        if self.conditions.is_empty() {
            return Err(PrepError::InvalidContrast(format!(
                "'{}' has no conditions",
                self.name
            )));
        }
        if self.weights.len() != self.conditions.len() {
            return Err(PrepError::InvalidContrast(format!(
                "'{}' has {} weights for {} conditions",
                self.name,
                self.weights.len(),
                self.conditions.len()
            )));
        }
        if self.weights.iter().any(|w| !w.is_finite()) {
            return Err(PrepError::InvalidContrast(format!(
                "'{}' has a non-finite weight",
                self.name
            )));
        }
        Ok(())
    }

    /// Weight applied to a condition, zero if the contrast does not mention it
    pub fn weight(&self, condition: &str) -> f64 {
        self.conditions
            .iter()
            .position(|c| c == condition)
            .map(|i| self.weights[i])
            .unwrap_or(0.0)
    }
}

/// Ordered contrasts estimated together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastSet {
    /// Conditions the contrasts may refer to
    pub conditions: Vec<String>,
    pub contrasts: Vec<Contrast>,
}

impl ContrastSet {
    /// The seventeen first-level contrasts: each condition alone, each moral
    /// condition against social norms, binding against individualizing
    /// foundations, and all moral conditions against social norms.
    pub fn first_level() -> Self {
        let third = 1.0 / 3.0;
        let seventh = 1.0 / 7.0;

        let contrasts = vec![
            Contrast::t("Physical Care", [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            Contrast::t("Emotional Care", [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            Contrast::t("Fairness", [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            Contrast::t("Liberty", [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
            Contrast::t("Loyalty", [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
            Contrast::t("Authority", [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
            Contrast::t("Sanctity", [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            Contrast::t("Social Norms", [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
            Contrast::t("Physical Care > Social", [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0]),
            Contrast::t("Emotional Care > Social", [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0]),
            Contrast::t("Fairness > Social", [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, -1.0]),
            Contrast::t("Liberty > Social", [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0]),
            Contrast::t("Loyalty > Social", [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0]),
            Contrast::t("Authority > Social", [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, -1.0]),
            Contrast::t("Sanctity > Social", [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, -1.0]),
            Contrast::t(
                "Binding > Individualizing",
                [-third, -third, -third, 0.0, third, third, third, 0.0],
            ),
            Contrast::t(
                "Moral > Social",
                [seventh, seventh, seventh, seventh, seventh, seventh, seventh, -1.0],
            ),
        ];

        Self {
            conditions: CONDITION_NAMES.iter().map(|c| c.to_string()).collect(),
            contrasts,
        }
    }

    /// The single group-mean contrast of a one-sample second-level design
    pub fn second_level() -> Self {
        Self {
            conditions: vec![GROUP_MEAN.to_string()],
            contrasts: vec![Contrast {
                name: "Group".to_string(),
                stat: StatKind::T,
                conditions: vec![GROUP_MEAN.to_string()],
                weights: vec![1.0],
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.contrasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contrasts.is_empty()
    }

    /// Contrast by 1-based index, as numbered in output file names
    pub fn get(&self, index: usize) -> Option<&Contrast> {
        index.checked_sub(1).and_then(|i| self.contrasts.get(i))
    }

    /// Contrast ids (`0001`, `0002`, ...) paired with their contrasts
    pub fn ids(&self) -> impl Iterator<Item = (String, &Contrast)> {
        self.contrasts
            .iter()
            .enumerate()
            .map(|(i, c)| (contrast_id(i + 1), c))
    }

    /// Validate every contrast, name uniqueness, and condition references
    pub fn validate(&self) -> Result<(), PrepError> {
        let known: HashSet<&str> = self.conditions.iter().map(String::as_str).collect();
        let mut names = HashSet::new();

        for contrast in &self.contrasts {
            contrast.validate()?;
            if !names.insert(contrast.name.as_str()) {
                return Err(PrepError::InvalidContrast(format!(
                    "duplicate contrast name '{}'",
                    contrast.name
                )));
            }
            if let Some(unknown) = contrast
                .conditions
                .iter()
                .find(|c| !known.contains(c.as_str()))
            {
                return Err(PrepError::InvalidContrast(format!(
                    "'{}' refers to unknown condition '{}'",
                    contrast.name, unknown
                )));
            }
        }
        Ok(())
    }
}

/// Four-digit id of a 1-based contrast index (`9` -> `"0009"`)
pub fn contrast_id(index: usize) -> String {
    format!("{index:04}")
}

/// First-level contrast ids carried to the second level by default: the
/// moral-versus-social comparisons and the two composite contrasts
pub fn default_second_level_ids() -> Vec<String> {
    (9..=17).map(contrast_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_level_contrasts_validate() {
        let set = ContrastSet::first_level();
        assert_eq!(set.len(), 17);
        set.validate().unwrap();
        assert!(set
            .contrasts
            .iter()
            .all(|c| c.stat == StatKind::T && c.weights.len() == 8));
    }

    #[test]
    fn test_versus_social_contrasts_sum_to_zero() {
        let set = ContrastSet::first_level();
        for index in 9..=17 {
            let contrast = set.get(index).unwrap();
            let sum: f64 = contrast.weights.iter().sum();
            assert!(sum.abs() < 1e-12, "{} sums to {}", contrast.name, sum);
        }
    }

    #[test]
    fn test_named_weights() {
        let set = ContrastSet::first_level();
        let binding = set.get(16).unwrap();
        assert_eq!(binding.name, "Binding > Individualizing");
        assert_eq!(binding.weight("lib"), 0.0);
        assert!((binding.weight("pur") - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(set.get(17).unwrap().weight("socn"), -1.0);
        assert_eq!(set.get(0), None);
        assert_eq!(set.get(18), None);
    }

    #[test]
    fn test_contrast_ids() {
        assert_eq!(contrast_id(9), "0009");
        assert_eq!(contrast_id(17), "0017");
        let ids = default_second_level_ids();
        assert_eq!(ids.len(), 9);
        assert_eq!(ids.first().map(String::as_str), Some("0009"));
        assert_eq!(ids.last().map(String::as_str), Some("0017"));

        let set = ContrastSet::first_level();
        let (id, contrast) = set.ids().nth(2).unwrap();
        assert_eq!(id, "0003");
        assert_eq!(contrast.name, "Fairness");
    }

    #[test]
    fn test_second_level_contrast() {
        let set = ContrastSet::second_level();
        set.validate().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.contrasts[0].weight(GROUP_MEAN), 1.0);
    }

    #[test]
    fn test_invalid_contrasts() {
        let mut set = ContrastSet::first_level();
        set.contrasts[0].weights.pop();
        assert!(matches!(set.validate(), Err(PrepError::InvalidContrast(_))));

        let mut set = ContrastSet::first_level();
        set.contrasts[1].name = "Physical Care".to_string();
        assert!(matches!(set.validate(), Err(PrepError::InvalidContrast(_))));

        let mut set = ContrastSet::first_level();
        set.contrasts[2].conditions[0] = "harm".to_string();
        assert!(matches!(set.validate(), Err(PrepError::InvalidContrast(_))));

        let mut set = ContrastSet::first_level();
        set.contrasts[3].weights[0] = f64::NAN;
        assert!(matches!(set.validate(), Err(PrepError::InvalidContrast(_))));
    }

    #[test]
    fn test_serializes_stat_kind() {
        let json = serde_json::to_value(ContrastSet::second_level()).unwrap();
        assert_eq!(json["contrasts"][0]["stat"], "T");
        assert_eq!(json["contrasts"][0]["conditions"][0], "mean");
    }

    #[test]
    fn test_stat_kind_is_t_only() {
        let stat: StatKind = serde_json::from_str("\"T\"").unwrap();
        assert_eq!(stat, StatKind::T);
        assert!(serde_json::from_str::<StatKind>("\"F\"").is_err());
    }
}
