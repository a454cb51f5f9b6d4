//! Concurrent outcome recording and aggregate snapshots
//!
//! Counters are plain atomics. Latency histograms and status distributions
//! live behind small `parking_lot` mutexes that are held only for the
//! mutation itself, never across an await point or a network call.

use crate::error::MetricsError;
use crate::operation::Operation;
use crate::outcome::RequestOutcome;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lowest trackable latency in microseconds
const LATENCY_LOW_US: u64 = 1;
/// Highest trackable latency in microseconds (60s); larger values saturate
const LATENCY_HIGH_US: u64 = 60_000_000;
const LATENCY_SIGFIG: u8 = 3;

fn new_histogram() -> Result<Histogram<u64>, MetricsError> {
    Ok(Histogram::new_with_bounds(
        LATENCY_LOW_US,
        LATENCY_HIGH_US,
        LATENCY_SIGFIG,
    )?)
}

fn duration_micros(latency: Duration) -> u64 {
    u64::try_from(latency.as_micros()).unwrap_or(u64::MAX)
}

/// Passed/total tally for checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckTally {
    pub passed: u64,
    pub total: u64,
}

impl CheckTally {
    pub fn failed(&self) -> u64 {
        self.total - self.passed
    }

    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

struct OperationSamples {
    latency: Histogram<u64>,
    statuses: BTreeMap<String, u64>,
}

struct OperationStats {
    total: AtomicU64,
    failed: AtomicU64,
    samples: Mutex<OperationSamples>,
}

impl OperationStats {
    fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            total: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            samples: Mutex::new(OperationSamples {
                latency: new_histogram()?,
                statuses: BTreeMap::new(),
            }),
        })
    }
}

/// Thread-safe sink for request outcomes
///
/// Workers share one recorder through an `Arc` and only ever call
/// [`OutcomeRecorder::record`]; the run reads it through
/// [`OutcomeRecorder::snapshot`], which never resets anything.
pub struct OutcomeRecorder {
    started: Instant,
    operations: [OperationStats; 3],
    overall_latency: Mutex<Histogram<u64>>,
    checks_total: AtomicU64,
    checks_passed: AtomicU64,
    named_checks: Mutex<BTreeMap<String, CheckTally>>,
}

impl std::fmt::Debug for OutcomeRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeRecorder")
            .field("requests", &self.request_count())
            .finish()
    }
}

impl OutcomeRecorder {
    pub fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            started: Instant::now(),
            operations: [OperationStats::new()?, OperationStats::new()?, OperationStats::new()?],
            overall_latency: Mutex::new(new_histogram()?),
            checks_total: AtomicU64::new(0),
            checks_passed: AtomicU64::new(0),
            named_checks: Mutex::new(BTreeMap::new()),
        })
    }

    /// Restart the elapsed-time clock, e.g. once setup is over
    pub fn restart_clock(&mut self) {
        self.started = Instant::now();
    }

    /// Append one outcome to the aggregates
    pub fn record(&self, outcome: &RequestOutcome) {
        let stats = &self.operations[outcome.operation.index()];
        let micros = duration_micros(outcome.latency);

        stats.total.fetch_add(1, Ordering::Relaxed);
        if outcome.is_failed() {
            stats.failed.fetch_add(1, Ordering::Relaxed);
        }

        {
            let mut samples = stats.samples.lock();
            samples.latency.saturating_record(micros);
            *samples.statuses.entry(outcome.status_key()).or_insert(0) += 1;
        }
        self.overall_latency.lock().saturating_record(micros);

        if outcome.checks.is_empty() {
            return;
        }

        let passed = outcome.checks.iter().filter(|c| c.passed).count() as u64;
        self.checks_total
            .fetch_add(outcome.checks.len() as u64, Ordering::Relaxed);
        self.checks_passed.fetch_add(passed, Ordering::Relaxed);

        let mut named = self.named_checks.lock();
        for check in &outcome.checks {
            let tally = named.entry(check.name.clone()).or_default();
            tally.total += 1;
            if check.passed {
                tally.passed += 1;
            }
        }
    }

    /// Total number of recorded outcomes
    pub fn request_count(&self) -> u64 {
        self.operations
            .iter()
            .map(|s| s.total.load(Ordering::Relaxed))
            .sum()
    }

    /// Copy the current aggregates
    pub fn snapshot(&self) -> AggregateMetrics {
        let mut operations = BTreeMap::new();
        for operation in Operation::all() {
            let stats = &self.operations[operation.index()];
            let (latency, statuses) = {
                let samples = stats.samples.lock();
                (samples.latency.clone(), samples.statuses.clone())
            };
            operations.insert(
                *operation,
                OperationMetrics {
                    total: stats.total.load(Ordering::Relaxed),
                    failed: stats.failed.load(Ordering::Relaxed),
                    statuses,
                    latency: LatencyDistribution::new(latency),
                },
            );
        }

        AggregateMetrics {
            elapsed: self.started.elapsed(),
            operations,
            latency: LatencyDistribution::new(self.overall_latency.lock().clone()),
            checks: CheckTally {
                passed: self.checks_passed.load(Ordering::Relaxed),
                total: self.checks_total.load(Ordering::Relaxed),
            },
            named_checks: self.named_checks.lock().clone(),
        }
    }
}

/// Latency samples for one metric, queried in milliseconds
#[derive(Clone)]
pub struct LatencyDistribution {
    histogram: Histogram<u64>,
}

impl std::fmt::Debug for LatencyDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyDistribution")
            .field("count", &self.count())
            .field("avg_ms", &self.mean_ms())
            .finish()
    }
}

impl LatencyDistribution {
    fn new(histogram: Histogram<u64>) -> Self {
        Self { histogram }
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn mean_ms(&self) -> f64 {
        if self.histogram.is_empty() {
            return 0.0;
        }
        self.histogram.mean() / 1000.0
    }

    pub fn min_ms(&self) -> f64 {
        if self.histogram.is_empty() {
            return 0.0;
        }
        self.histogram.min() as f64 / 1000.0
    }

    pub fn max_ms(&self) -> f64 {
        if self.histogram.is_empty() {
            return 0.0;
        }
        self.histogram.max() as f64 / 1000.0
    }

    /// Value at percentile `p` in `(0, 100]`
    pub fn percentile_ms(&self, p: f64) -> f64 {
        if self.histogram.is_empty() {
            return 0.0;
        }
        self.histogram.value_at_quantile((p / 100.0).clamp(0.0, 1.0)) as f64 / 1000.0
    }

    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            count: self.count(),
            avg: self.mean_ms(),
            min: self.min_ms(),
            med: self.percentile_ms(50.0),
            max: self.max_ms(),
            p90: self.percentile_ms(90.0),
            p95: self.percentile_ms(95.0),
            p99: self.percentile_ms(99.0),
        }
    }
}

impl Serialize for LatencyDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.summary().serialize(serializer)
    }
}

/// Fixed set of latency statistics in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Aggregates for one operation kind
#[derive(Debug, Clone, Serialize)]
pub struct OperationMetrics {
    pub total: u64,
    pub failed: u64,
    pub statuses: BTreeMap<String, u64>,
    pub latency: LatencyDistribution,
}

impl OperationMetrics {
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failed as f64 / self.total as f64
        }
    }
}

/// Point-in-time copy of everything the recorder has seen
#[derive(Debug, Clone, Serialize)]
pub struct AggregateMetrics {
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub operations: BTreeMap<Operation, OperationMetrics>,
    /// Latency across all operations
    pub latency: LatencyDistribution,
    pub checks: CheckTally,
    pub named_checks: BTreeMap<String, CheckTally>,
}

impl AggregateMetrics {
    pub fn operation(&self, operation: Operation) -> Option<&OperationMetrics> {
        self.operations.get(&operation)
    }

    pub fn total_requests(&self) -> u64 {
        self.operations.values().map(|m| m.total).sum()
    }

    pub fn failed_requests(&self) -> u64 {
        self.operations.values().map(|m| m.failed).sum()
    }

    pub fn failure_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.failed_requests() as f64 / total as f64
        }
    }

    /// Requests per second over the elapsed wall time
    pub fn request_rate(&self, count: u64) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            count as f64 / secs
        }
    }
}
