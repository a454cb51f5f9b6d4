//! Core error types for Stampede

use thiserror::Error;

/// Invalid load profile declarations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProfileError {
    #[error("Fixed profile requires at least one virtual user")]
    NoVirtualUsers,

    #[error("Staged profile requires at least one stage")]
    NoStages,

    #[error("Profile never schedules a virtual user")]
    NeverActive,

    #[error("Profile duration must be greater than zero")]
    ZeroDuration,

    #[error("Profile duration overflows")]
    DurationOverflow,

    #[error("Iteration limit must be greater than zero")]
    ZeroIterations,
}

/// Errors raised while parsing threshold declarations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThresholdParseError {
    #[error("Unknown metric '{0}'. Supported metrics are: http_req_duration, http_req_failed, http_reqs, checks")]
    UnknownMetric(String),

    #[error("Invalid metric selector '{0}'")]
    InvalidSelector(String),

    #[error("Unknown tag '{tag}' for metric {metric}")]
    UnknownTag { metric: String, tag: String },

    #[error("Invalid threshold expression '{0}'")]
    InvalidExpression(String),

    #[error("Percentile must be within (0, 100], got {0}")]
    InvalidPercentile(f64),

    #[error("Aggregation '{aggregation}' is not supported by metric {metric}")]
    UnsupportedAggregation { metric: String, aggregation: String },
}

/// Errors raised while setting up metric storage
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to create latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}
