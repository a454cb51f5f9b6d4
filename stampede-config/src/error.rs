//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An environment override carries a value that does not parse
    #[error("Invalid value in {var}: {message}")]
    Env { var: String, message: String },

    /// A domain rejected its settings; `domain` is a dotted path such as
    /// `scenarios.smoke.pool`
    #[error("Invalid {domain} configuration: {message}")]
    Domain { domain: String, message: String },

    #[error("Unknown scenario '{name}'; available: {available}")]
    UnknownScenario { name: String, available: String },
}

impl ConfigError {
    /// Domain path of a validation error
    pub fn domain(&self) -> Option<&str> {
        match self {
            ConfigError::Domain { domain, .. } => Some(domain),
            _ => None,
        }
    }
}
