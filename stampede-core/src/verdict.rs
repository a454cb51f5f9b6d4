//! Final result of a run

use crate::metrics::AggregateMetrics;
use crate::threshold::{evaluate, ThresholdResult, ThresholdSpec};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregates plus per-threshold detail; the only output of a run
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub scenario: String,
    pub all_passed: bool,
    pub thresholds: Vec<ThresholdResult>,
    pub metrics: AggregateMetrics,
    pub pool_size: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl Verdict {
    pub fn new(
        scenario: impl Into<String>,
        metrics: AggregateMetrics,
        specs: &[ThresholdSpec],
        pool_size: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        let thresholds = evaluate(&metrics, specs);
        Self {
            scenario: scenario.into(),
            all_passed: thresholds.iter().all(|t| t.passed),
            thresholds,
            metrics,
            pool_size,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|t| !t.passed)
    }
}
