//! Periodic progress log while a run is in flight

use crate::shutdown::RunStop;
use stampede_core::{evaluate, OutcomeRecorder, ThresholdSpec};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Point-in-time view of a running scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub active_vus: u32,
    pub requests: u64,
    pub failure_rate: f64,
    pub thresholds_passing: usize,
    pub thresholds_total: usize,
    /// Expressions currently failing, as `metric: expression`
    pub failing: Vec<String>,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} VUs active, {} requests, {:.2}% failed, thresholds {}/{} passing",
            self.active_vus,
            self.requests,
            self.failure_rate * 100.0,
            self.thresholds_passing,
            self.thresholds_total
        )
    }
}

pub struct LiveMonitor {
    scenario: String,
    recorder: Arc<OutcomeRecorder>,
    specs: Arc<[ThresholdSpec]>,
    active: Arc<AtomicU32>,
    interval: Duration,
}

impl LiveMonitor {
    pub fn new(
        scenario: impl Into<String>,
        recorder: Arc<OutcomeRecorder>,
        specs: Arc<[ThresholdSpec]>,
        active: Arc<AtomicU32>,
        interval: Duration,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            recorder,
            specs,
            active,
            interval,
        }
    }

    pub fn progress(&self) -> Progress {
        let metrics = self.recorder.snapshot();
        let results = evaluate(&metrics, &self.specs);
        Progress {
            active_vus: self.active.load(Ordering::Relaxed),
            requests: metrics.total_requests(),
            failure_rate: metrics.failure_rate(),
            thresholds_passing: results.iter().filter(|r| r.passed).count(),
            thresholds_total: results.len(),
            failing: results
                .iter()
                .filter(|r| !r.passed)
                .map(|r| format!("{}: {}", r.metric, r.expression))
                .collect(),
        }
    }

    /// Log progress every interval until the run stops or the task is aborted
    pub fn spawn(self, stop: RunStop) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let progress = self.progress();
                        info!(scenario = %self.scenario, "{}", progress);
                        for failing in &progress.failing {
                            debug!(scenario = %self.scenario, "Threshold currently failing: {}", failing);
                        }
                    }
                    _ = stop.raised() => break,
                }
            }
        })
    }
}
