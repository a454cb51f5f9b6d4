//! Target API and HTTP client configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the users API lives and how the shared client talks to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,

    /// Per-request timeout; an expired request is recorded as failed
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    pub user_agent: String,

    /// Turning this off accepts self-signed staging certificates
    pub verify_ssl: bool,

    pub connection_pool: ConnectionPoolConfig,
}

/// Keep-alive pool of the shared client
///
/// Hundreds of VUs share one client, so idle connections per host should be
/// at least the peak VU count to avoid reconnect churn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionPoolConfig {
    pub max_idle_per_host: usize,

    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// TCP connect timeout
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("Stampede/", env!("CARGO_PKG_VERSION")).to_string(),
            verify_ssl: true,
            connection_pool: ConnectionPoolConfig::default(),
        }
    }
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 512,
            idle_timeout: Duration::from_secs(90),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl Validatable for TargetConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.require_http_url(&self.base_url, "base_url")?;
        self.require_positive(self.timeout.as_millis(), "timeout")?;
        self.require_non_empty(&self.user_agent, "user_agent")?;
        self.connection_pool.validate()
    }

    fn domain_name(&self) -> &'static str {
        "target"
    }
}

impl Validatable for ConnectionPoolConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.require_positive(self.max_idle_per_host, "max_idle_per_host")?;
        self.require_positive(self.idle_timeout.as_millis(), "idle_timeout")?;
        self.require_positive(self.connection_timeout.as_millis(), "connection_timeout")
    }

    fn domain_name(&self) -> &'static str {
        "target.connection_pool"
    }
}
