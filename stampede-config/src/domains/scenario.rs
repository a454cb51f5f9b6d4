//! Scenario configuration: load profile, operation mix, pool setup, thresholds

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use stampede_core::{LoadProfile, OperationPolicy, OperationWeights, ResourceBinding, ThresholdSpec};
use std::collections::BTreeMap;
use std::time::Duration;

/// One load test scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared concurrency over time
    pub profile: LoadProfile,

    /// Hard ceiling on run time; defaults to the profile's own duration
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<Duration>,

    /// Which operation each iteration performs
    #[serde(default)]
    pub operation: OperationPolicy,

    /// How updates pick their pool resource
    #[serde(default)]
    pub binding: ResourceBinding,

    /// Relative weights for the weighted policy
    #[serde(default)]
    pub weights: OperationWeights,

    /// Seed for random operation and resource selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Pause after every iteration
    #[serde(with = "humantime_serde", default = "default_think_time")]
    pub think_time: Duration,

    /// Resources created once before the load starts
    #[serde(default)]
    pub pool: PoolConfig,

    /// Per-response assertions
    #[serde(default)]
    pub checks: ChecksConfig,

    /// How often live progress and threshold status are logged
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub monitor_interval: Option<Duration>,

    /// k6-style thresholds: metric key to expressions
    #[serde(default)]
    pub thresholds: BTreeMap<String, Vec<String>>,
}

/// What to do when setup creates fewer resources than requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompletePoolPolicy {
    /// Any failed creation aborts the run
    #[default]
    Abort,
    /// Skip failed creations and run with the smaller pool
    Proceed,
}

/// Setup-phase resource pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of users to create before the load starts
    pub size: usize,

    /// Creates issued concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between a completed setup and the first VU
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,

    /// Upper bound on the whole setup phase
    #[serde(with = "humantime_serde", default = "default_setup_timeout")]
    pub setup_timeout: Duration,

    pub on_incomplete: IncompletePoolPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 0,
            batch_size: default_batch_size(),
            settle_delay: Duration::ZERO,
            setup_timeout: default_setup_timeout(),
            on_incomplete: IncompletePoolPolicy::Abort,
        }
    }
}

/// Response assertions beyond the expected status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Adds a `<operation> duration < <budget>ms` check to every response
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub latency_budget: Option<Duration>,
}

impl ScenarioConfig {
    /// Parse the declared thresholds
    pub fn threshold_specs(&self) -> ConfigResult<Vec<ThresholdSpec>> {
        ThresholdSpec::parse_map(&self.thresholds)
            .map_err(|e| self.validation_error(format!("thresholds: {}", e)))
    }

    /// Effective run cap
    pub fn run_cap(&self) -> ConfigResult<Duration> {
        let total = self
            .profile
            .total_duration()
            .map_err(|e| self.validation_error(format!("profile: {}", e)))?;
        Ok(match self.max_duration {
            Some(cap) => cap.min(total),
            None => total,
        })
    }
}

impl Validatable for ScenarioConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.profile
            .validate()
            .map_err(|e| self.validation_error(format!("profile: {}", e)))?;

        if let Some(cap) = self.max_duration {
            self.require_positive(cap.as_millis(), "max_duration")?;
        }

        if self.operation == OperationPolicy::Weighted && self.weights.total() == 0 {
            return Err(self.validation_error("weights must not all be zero"));
        }

        if self.operation.needs_pool(&self.weights) && self.pool.size == 0 {
            return Err(self.validation_error(
                "update operations need pool.size greater than 0",
            ));
        }

        if self.binding == ResourceBinding::Dedicated
            && self.pool.size < self.profile.max_vus() as usize
        {
            log::warn!(
                "Dedicated binding with pool.size {} below {} VUs; VUs without a slot stay idle",
                self.pool.size,
                self.profile.max_vus()
            );
        }

        if let Some(interval) = self.monitor_interval {
            self.require_positive(interval.as_millis(), "monitor_interval")?;
        }

        self.pool.validate()?;
        self.checks.validate()?;
        self.threshold_specs()?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scenario"
    }
}

impl Validatable for PoolConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.size > 0 {
            self.require_positive(self.batch_size, "batch_size")?;
            self.require_positive(self.setup_timeout.as_millis(), "setup_timeout")?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scenario.pool"
    }
}

impl Validatable for ChecksConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(budget) = self.latency_budget {
            self.require_positive(budget.as_millis(), "latency_budget")?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scenario.checks"
    }
}

// Default value functions
fn default_think_time() -> Duration {
    Duration::from_secs(1)
}

fn default_batch_size() -> usize {
    50
}

fn default_setup_timeout() -> Duration {
    Duration::from_secs(180)
}
