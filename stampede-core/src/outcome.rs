//! Per-request outcome records

use crate::operation::Operation;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of a single named assertion against a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
        }
    }
}

/// What happened during one virtual user iteration
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub operation: Operation,
    pub vu: u32,
    pub iteration: u64,
    /// `None` when no response arrived (transport error or timeout)
    pub status: Option<u16>,
    pub latency: Duration,
    pub checks: Vec<CheckResult>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RequestOutcome {
    /// A request fails when no response arrived or the status is not 2xx
    pub fn is_failed(&self) -> bool {
        !matches!(self.status, Some(status) if (200..300).contains(&status))
    }

    pub fn checks_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Key under which the status is counted in the distribution
    pub fn status_key(&self) -> String {
        match self.status {
            Some(status) => status.to_string(),
            None => "error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: Option<u16>) -> RequestOutcome {
        RequestOutcome {
            operation: Operation::Read,
            vu: 1,
            iteration: 0,
            status,
            latency: Duration::from_millis(12),
            checks: vec![CheckResult::new("status is 200", status == Some(200))],
            error: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_failure_classification() {
        assert!(!outcome(Some(200)).is_failed());
        assert!(!outcome(Some(201)).is_failed());
        assert!(outcome(Some(404)).is_failed());
        assert!(outcome(Some(500)).is_failed());
        assert!(outcome(None).is_failed());
    }

    #[test]
    fn test_status_key() {
        assert_eq!(outcome(Some(201)).status_key(), "201");
        assert_eq!(outcome(None).status_key(), "error");
    }
}
