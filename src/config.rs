//! Study configuration - distributions, sample count, seed
//!
//! Historically uncertain quantities are configured per invention as YAML,
//! each parameter citing the provenance of its chosen distribution (folio
//! references, materials databases). The configuration is loaded once at
//! batch start and threaded through explicitly; there is no ambient global
//! state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::distributions::{DistributionError, ParameterDistribution};
use crate::yaml::{self, YamlError};

fn default_confidence() -> f64 {
    0.95
}

/// Errors raised while loading or validating a study configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parameter '{parameter}': {source}")]
    InvalidDistribution {
        parameter: String,
        source: DistributionError,
    },

    #[error("duplicate parameter name '{parameter}'")]
    DuplicateParameter { parameter: String },

    #[error("base_samples must be > 0")]
    NoSamples,

    #[error("confidence must be in (0, 1), got {confidence}")]
    InvalidConfidence { confidence: f64 },

    #[error(transparent)]
    Yaml(#[from] YamlError),
}

/// One uncertain parameter: name, distribution, and historical provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,

    #[serde(flatten)]
    pub distribution: ParameterDistribution,

    /// Source justifying the distribution (e.g. "Codex Atlanticus f.846r")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

/// Complete configuration for one uncertainty study
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Invention slug this study belongs to (e.g. "aerial_screw")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invention: Option<String>,

    /// Uncertain parameters, in column order
    pub parameters: Vec<ParameterSpec>,

    /// Base sample size N; the Saltelli design expands this to N·(k+2) runs
    pub base_samples: usize,

    /// Seed for reproducible research artifacts
    pub seed: u64,

    /// Two-sided confidence level for percentile bands
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl StudyConfig {
    /// Validate distributions and scalar settings, failing fast before any
    /// sampling begins
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_samples == 0 {
            return Err(ConfigError::NoSamples);
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ConfigError::InvalidConfidence {
                confidence: self.confidence,
            });
        }
        for (i, spec) in self.parameters.iter().enumerate() {
            if self.parameters[..i].iter().any(|p| p.name == spec.name) {
                return Err(ConfigError::DuplicateParameter {
                    parameter: spec.name.clone(),
                });
            }
            spec.distribution
                .validate()
                .map_err(|source| ConfigError::InvalidDistribution {
                    parameter: spec.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Parse and validate a configuration from YAML text
    pub fn from_yaml_str(content: &str, filename: &str) -> Result<Self, ConfigError> {
        let config: StudyConfig = yaml::parse_yaml(content, filename)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from a YAML file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config: StudyConfig = yaml::parse_yaml_file(path)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_YAML: &str = r#"
invention: aerial_screw
parameters:
  - name: density
    kind: normal
    mean: 650.0
    std_dev: 30.0
    provenance: "Paris Manuscript B f.83v, fir density survey"
  - name: thickness
    kind: triangular
    min: 0.01
    mode: 0.02
    max: 0.03
base_samples: 64
seed: 42
"#;

    #[test]
    fn test_parse_good_config() {
        let config = StudyConfig::from_yaml_str(GOOD_YAML, "study.yaml").unwrap();
        assert_eq!(config.invention.as_deref(), Some("aerial_screw"));
        assert_eq!(config.parameters.len(), 2);
        assert_eq!(config.base_samples, 64);
        assert_eq!(config.seed, 42);
        assert_eq!(config.confidence, 0.95);
        assert_eq!(
            config.parameters[0].distribution,
            ParameterDistribution::Normal {
                mean: 650.0,
                std_dev: 30.0
            }
        );
        assert!(config.parameters[0].provenance.is_some());
        assert!(config.parameters[1].provenance.is_none());
    }

    #[test]
    fn test_invalid_distribution_fails_fast() {
        let yaml = r#"
parameters:
  - name: bad
    kind: triangular
    min: 0.0
    mode: 5.0
    max: 1.0
base_samples: 16
seed: 1
"#;
        let err = StudyConfig::from_yaml_str(yaml, "study.yaml").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDistribution { ref parameter, .. } if parameter == "bad"
        ));
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let yaml = r#"
parameters:
  - name: x
    kind: uniform
    min: 0.0
    max: 1.0
  - name: x
    kind: uniform
    min: 0.0
    max: 2.0
base_samples: 16
seed: 1
"#;
        assert!(matches!(
            StudyConfig::from_yaml_str(yaml, "study.yaml"),
            Err(ConfigError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn test_zero_samples_rejected() {
        let yaml = r#"
parameters: []
base_samples: 0
seed: 1
"#;
        assert!(matches!(
            StudyConfig::from_yaml_str(yaml, "study.yaml"),
            Err(ConfigError::NoSamples)
        ));
    }

    #[test]
    fn test_malformed_yaml_surfaces_parse_error() {
        let yaml = "parameters:\n  - name: x\n   bad indent";
        assert!(matches!(
            StudyConfig::from_yaml_str(yaml, "study.yaml"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = StudyConfig::from_yaml_str(GOOD_YAML, "study.yaml").unwrap();
        let yaml = serde_yml::to_string(&config).unwrap();
        assert!(yaml.contains("kind: normal"));
        let parsed: StudyConfig = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.parameters, config.parameters);
    }
}
