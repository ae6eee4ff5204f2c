#![warn(missing_docs)]
//! Run configuration of the batch tool.
//!
//! A [`RunConfig`] is stored as YAML. Every field is optional in the file and falls back to its default value, so
//! an empty document is a valid configuration.
use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CassegrainError, CsgResult},
    evaluator::EvaluatorSettings,
    surface::SensorChip,
};

/// Settings of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// settings used for evaluating each configuration
    pub evaluator: EvaluatorSettings,
    /// number of best configurations kept in the ranking
    pub top_n: usize,
    /// number of ranked configurations printed to the console
    pub nr_of_printed: usize,
    /// optional time limit for the position search of a single configuration in seconds
    pub time_budget: Option<f64>,
    /// camera chip used for plate scale and field of view estimates
    pub chip: SensorChip,
}
impl Default for RunConfig {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorSettings::default(),
            top_n: 100,
            nr_of_printed: 5,
            time_budget: None,
            chip: SensorChip::default(),
        }
    }
}
impl RunConfig {
    /// Read a [`RunConfig`] from a YAML file.
    ///
    /// # Errors
    ///
    /// This function returns an error if the file cannot be read or is not a valid YAML run configuration.
    pub fn from_file(path: &Path) -> CsgResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CassegrainError::Io(format!("cannot read file {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }
    /// Parse a [`RunConfig`] from a YAML string.
    ///
    /// # Errors
    ///
    /// This function returns an error if the string is not a valid YAML run configuration or contains invalid
    /// values (e.g. a negative time budget).
    pub fn from_yaml(yaml: &str) -> CsgResult<Self> {
        // an empty document deserializes to unit, not to an empty mapping
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                CassegrainError::Configuration(format!("parsing of run configuration failed: {e}"))
            })?
        };
        config.validate()?;
        Ok(config)
    }
    /// Save this [`RunConfig`] as YAML file.
    ///
    /// # Errors
    ///
    /// This function returns an error if the configuration cannot be serialized or the file cannot be written.
    pub fn save_to_file(&self, path: &Path) -> CsgResult<()> {
        let serialized = serde_yaml::to_string(self).map_err(|e| {
            CassegrainError::Configuration(format!("serialization of run configuration failed: {e}"))
        })?;
        fs::write(path, serialized).map_err(|e| {
            CassegrainError::Io(format!("writing to file {} failed: {e}", path.display()))
        })
    }
    /// Returns the time limit per configuration, if any.
    ///
    /// A budget that is not representable as [`Duration`] (rejected when loading) counts as no limit.
    #[must_use]
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget
            .and_then(|budget| Duration::try_from_secs_f64(budget).ok())
    }
    fn validate(&self) -> CsgResult<()> {
        if let Some(budget) = self.time_budget {
            if budget.is_sign_negative() {
                return Err(CassegrainError::Configuration(
                    "time budget must be >= 0.0".into(),
                ));
            }
            Duration::try_from_secs_f64(budget).map_err(|e| {
                CassegrainError::Configuration(format!("invalid time budget {budget} s: {e}"))
            })?;
        }
        if self.evaluator.nr_of_rays == 0 {
            return Err(CassegrainError::Configuration(
                "number of rays must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;
    #[test]
    fn default() {
        let config = RunConfig::default();
        assert_eq!(config.top_n, 100);
        assert_eq!(config.nr_of_printed, 5);
        assert_eq!(config.evaluator, EvaluatorSettings::default());
        assert_eq!(config.time_budget(), None);
        assert_eq!(config.chip, SensorChip::default());
    }
    #[test]
    fn from_yaml() {
        assert_eq!(RunConfig::from_yaml("").unwrap(), RunConfig::default());
        let config = RunConfig::from_yaml(
            "top_n: 10\ntime_budget: 0.5\nevaluator:\n  nr_of_rays: 200\n  refine: true\n  trace_policy:\n    max_bounces: 6\n",
        )
        .unwrap();
        assert_eq!(config.top_n, 10);
        assert_eq!(config.time_budget(), Some(Duration::from_millis(500)));
        assert_eq!(config.evaluator.nr_of_rays, 200);
        assert!(config.evaluator.refine);
        assert_eq!(config.evaluator.trace_policy.max_bounces, 6);
        assert_eq!(config.evaluator.trace_policy.mirror_cutoff_bounce, 2);
        assert_eq!(config.evaluator.scan_step, 2.0);
        assert_eq!(config.nr_of_printed, 5);
    }
    #[test]
    fn from_yaml_invalid() {
        assert_matches!(
            RunConfig::from_yaml("top_n: [1, 2]"),
            Err(CassegrainError::Configuration(_))
        );
        assert_matches!(
            RunConfig::from_yaml("time_budget: -1.0"),
            Err(CassegrainError::Configuration(_))
        );
        assert_matches!(
            RunConfig::from_yaml("time_budget: 1.0e30"),
            Err(CassegrainError::Configuration(_))
        );
        assert_matches!(
            RunConfig::from_yaml("time_budget: .nan"),
            Err(CassegrainError::Configuration(_))
        );
        assert_matches!(
            RunConfig::from_yaml("time_budget: .inf"),
            Err(CassegrainError::Configuration(_))
        );
        // set directly, bypassing the validation of a file
        let config = RunConfig {
            time_budget: Some(1.0e30),
            ..RunConfig::default()
        };
        assert_eq!(config.time_budget(), None);
        assert_matches!(
            RunConfig::from_yaml("evaluator:\n  nr_of_rays: 0\n"),
            Err(CassegrainError::Configuration(_))
        );
    }
    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.yaml");
        let config = RunConfig {
            top_n: 3,
            time_budget: Some(2.0),
            ..RunConfig::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(RunConfig::from_file(&path).unwrap(), config);
        assert_matches!(
            RunConfig::from_file(&dir.path().join("missing.yaml")),
            Err(CassegrainError::Io(_))
        );
    }
}
