//! Configuration management for the disaster link analyzer
//!
//! Every field is optional in a JSON config file; command-line flags take
//! precedence over file values.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cluster::LouvainOptions;
use crate::error::{EngineError, Result};

/// Tunable thresholds and limits for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Minimum risk score (exclusive) for a high-risk location
    pub risk_threshold: f64,

    /// Minimum summed endpoint betweenness (exclusive) for a spread path
    pub spread_threshold: f64,

    /// Number of high-risk locations kept in the report
    pub top_risk_locations: usize,

    /// Number of spread paths kept in the report
    pub top_spread_paths: usize,

    /// Only analyze records from the last N days
    pub days_back: Option<u32>,

    /// Use the parallel graph builder
    pub parallel: bool,

    /// Community detection limits
    pub louvain: LouvainOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            risk_threshold: 0.5,
            spread_threshold: 0.1,
            top_risk_locations: 5,
            top_spread_paths: 10,
            days_back: None,
            parallel: true,
            louvain: LouvainOptions::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values
    pub fn validate(&self) -> Result<()> {
        check_threshold("risk_threshold", self.risk_threshold)?;
        check_threshold("spread_threshold", self.spread_threshold)?;

        if self.top_risk_locations == 0 {
            return Err(EngineError::invalid_config("top_risk_locations", "must be at least 1"));
        }
        if self.top_spread_paths == 0 {
            return Err(EngineError::invalid_config("top_spread_paths", "must be at least 1"));
        }

        self.louvain.validate()
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::invalid_config(
            name,
            format!("must be a non-negative number, got {}", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.risk_threshold, 0.5);
        assert_eq!(config.spread_threshold, 0.1);
        assert_eq!(config.top_risk_locations, 5);
        assert_eq!(config.top_spread_paths, 10);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let config = AnalysisConfig {
            risk_threshold: -0.5,
            ..AnalysisConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig { name: "risk_threshold", .. })
        ));
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let config = AnalysisConfig {
            spread_threshold: f64::NAN,
            ..AnalysisConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"risk_threshold": 1.5, "louvain": {{"max_passes": 10}}}}"#).unwrap();
        drop(file);

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.risk_threshold, 1.5);
        assert_eq!(config.louvain.max_passes, 10);
        assert_eq!(config.louvain.max_levels, LouvainOptions::default().max_levels);
        assert_eq!(config.top_spread_paths, 10);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        std::fs::write(&path, r#"{"risk_treshold": 1.0}"#).unwrap();

        assert!(AnalysisConfig::load(&path).is_err());
    }
}
