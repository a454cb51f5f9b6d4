//! HTTP configuration

use serde::{Deserialize, Serialize};
use stampede_config::TargetConfig;
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Whether to verify SSL certificates
    pub verify_ssl: bool,

    /// Idle keep-alive connections kept per host
    pub max_idle_per_host: usize,

    /// How long an idle connection may stay pooled
    pub idle_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("Stampede/{}", env!("CARGO_PKG_VERSION")),
            verify_ssl: true,
            max_idle_per_host: 512,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

impl From<&TargetConfig> for HttpConfig {
    fn from(config: &TargetConfig) -> Self {
        Self {
            timeout: config.timeout,
            connect_timeout: config.connection_pool.connection_timeout,
            user_agent: config.user_agent.clone(),
            verify_ssl: config.verify_ssl,
            max_idle_per_host: config.connection_pool.max_idle_per_host,
            idle_timeout: config.connection_pool.idle_timeout,
        }
    }
}
