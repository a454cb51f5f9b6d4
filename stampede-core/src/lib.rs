//! Core domain model for Stampede
//!
//! This crate holds the pieces of a load test that do not touch the network:
//! load profiles and the VU schedule derived from them, the operations a
//! virtual user performs, per-request outcomes, the concurrent outcome
//! recorder and the threshold language used to judge a run.

pub mod error;
pub mod metrics;
pub mod operation;
pub mod outcome;
pub mod pool;
pub mod profile;
pub mod threshold;
pub mod verdict;

// Re-export commonly used types at the crate root
pub use error::{MetricsError, ProfileError, ThresholdParseError};
pub use metrics::{AggregateMetrics, CheckTally, LatencyDistribution, OperationMetrics, OutcomeRecorder};
pub use operation::{Operation, OperationPolicy, OperationWeights, ResourceBinding};
pub use outcome::{CheckResult, RequestOutcome};
pub use pool::{ResourceId, ResourcePool};
pub use profile::{ActivityWindow, LoadProfile, SchedulePlan, Stage};
pub use threshold::{evaluate, Aggregation, Comparator, MetricName, MetricSelector, TagFilter, ThresholdResult, ThresholdSpec};
pub use verdict::Verdict;
