//! Domain-specific configuration modules

pub mod logging;
pub mod scenario;
pub mod target;

use crate::error::{ConfigError, ConfigResult};
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotated sample configuration covering the stock scenarios
pub const SAMPLE_CONFIG: &str = include_str!("sample.yaml");

/// Main Stampede configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StampedeConfig {
    /// Target API configuration
    #[serde(default)]
    pub target: target::TargetConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Named scenarios
    #[serde(default)]
    pub scenarios: BTreeMap<String, scenario::ScenarioConfig>,
}

impl StampedeConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.target.validate()?;
        self.logging.validate()?;

        for (name, scenario) in &self.scenarios {
            if name.trim().is_empty() {
                return Err(ConfigError::Domain {
                    domain: "scenarios".to_string(),
                    message: "scenario names cannot be empty".to_string(),
                });
            }
            scenario.validate().map_err(|e| match e {
                ConfigError::Domain { domain, message } => ConfigError::Domain {
                    domain: domain.replacen("scenario", &format!("scenarios.{}", name), 1),
                    message,
                },
                other => other,
            })?;
        }

        Ok(())
    }

    /// Look up a scenario by name
    pub fn scenario(&self, name: &str) -> ConfigResult<&scenario::ScenarioConfig> {
        self.scenarios
            .get(name)
            .ok_or_else(|| ConfigError::UnknownScenario {
                name: name.to_string(),
                available: self
                    .scenarios
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
