//! Domain-driven configuration management for Stampede
//!
//! Configuration is split by functional domain (target API, logging,
//! scenarios), loaded from YAML, overridden from `STAMPEDE_*` environment
//! variables and validated per domain.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    logging::{LogFormat, LogLevel, LoggingConfig},
    scenario::{ChecksConfig, IncompletePoolPolicy, PoolConfig, ScenarioConfig},
    target::{ConnectionPoolConfig, TargetConfig},
    StampedeConfig, SAMPLE_CONFIG,
};
