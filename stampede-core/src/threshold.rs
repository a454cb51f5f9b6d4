//! Threshold declarations and their evaluation
//!
//! Thresholds are declared the way k6 declares them: a metric key mapped to
//! a list of expressions, e.g. `http_req_duration: ["avg<400", "p(95)<600"]`
//! or `http_req_failed{operation:update}: ["rate<0.02"]`. Evaluation is pure
//! and can run repeatedly against live snapshots.

use crate::error::ThresholdParseError;
use crate::metrics::AggregateMetrics;
use crate::operation::Operation;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

static SELECTOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([a-z_]+)\s*(?:\{\s*([a-z_]+)\s*:\s*([^}]+?)\s*\})?\s*$")
        .expect("selector pattern is valid")
});

static EXPRESSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(avg|min|max|med|count|rate|p\(\s*([0-9]+(?:\.[0-9]+)?)\s*\))\s*(<=|>=|<|>)\s*(-?[0-9]+(?:\.[0-9]+)?)\s*$")
        .expect("expression pattern is valid")
});

/// Built-in metrics a threshold can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    /// Request latency in milliseconds (trend)
    HttpReqDuration,
    /// Fraction of failed requests (rate)
    HttpReqFailed,
    /// Number of requests (counter)
    HttpReqs,
    /// Fraction of passed checks (rate)
    Checks,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::HttpReqDuration => "http_req_duration",
            MetricName::HttpReqFailed => "http_req_failed",
            MetricName::HttpReqs => "http_reqs",
            MetricName::Checks => "checks",
        }
    }

    fn parse(name: &str) -> Result<Self, ThresholdParseError> {
        match name {
            "http_req_duration" => Ok(MetricName::HttpReqDuration),
            "http_req_failed" => Ok(MetricName::HttpReqFailed),
            "http_reqs" => Ok(MetricName::HttpReqs),
            "checks" => Ok(MetricName::Checks),
            other => Err(ThresholdParseError::UnknownMetric(other.to_string())),
        }
    }

    fn supports(&self, aggregation: &Aggregation) -> bool {
        match self {
            MetricName::HttpReqDuration => matches!(
                aggregation,
                Aggregation::Avg | Aggregation::Min | Aggregation::Max | Aggregation::Med | Aggregation::Percentile(_)
            ),
            MetricName::HttpReqFailed | MetricName::Checks => matches!(aggregation, Aggregation::Rate),
            MetricName::HttpReqs => matches!(aggregation, Aggregation::Count | Aggregation::Rate),
        }
    }
}

/// Sub-metric filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilter {
    Operation(Operation),
    Check(String),
}

/// Metric plus optional tag filter, e.g. `http_req_duration{operation:read}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelector {
    pub name: MetricName,
    pub tag: Option<TagFilter>,
}

impl MetricSelector {
    pub fn parse(key: &str) -> Result<Self, ThresholdParseError> {
        let captures = SELECTOR_PATTERN
            .captures(key)
            .ok_or_else(|| ThresholdParseError::InvalidSelector(key.to_string()))?;
        let name = MetricName::parse(&captures[1])?;

        let tag = match (captures.get(2), captures.get(3)) {
            (Some(tag), Some(value)) => Some(match (name, tag.as_str()) {
                (MetricName::Checks, "check") => TagFilter::Check(value.as_str().to_string()),
                (MetricName::Checks, other) => {
                    return Err(ThresholdParseError::UnknownTag {
                        metric: name.as_str().to_string(),
                        tag: other.to_string(),
                    })
                }
                (_, "operation") => TagFilter::Operation(
                    value
                        .as_str()
                        .parse()
                        .map_err(|_| ThresholdParseError::InvalidSelector(key.to_string()))?,
                ),
                (_, other) => {
                    return Err(ThresholdParseError::UnknownTag {
                        metric: name.as_str().to_string(),
                        tag: other.to_string(),
                    })
                }
            }),
            _ => None,
        };

        Ok(Self { name, tag })
    }
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            None => write!(f, "{}", self.name.as_str()),
            Some(TagFilter::Operation(op)) => write!(f, "{}{{operation:{}}}", self.name.as_str(), op),
            Some(TagFilter::Check(check)) => write!(f, "{}{{check:{}}}", self.name.as_str(), check),
        }
    }
}

/// Statistic taken from the metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Avg,
    Min,
    Max,
    Med,
    Percentile(f64),
    Rate,
    Count,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Avg => write!(f, "avg"),
            Aggregation::Min => write!(f, "min"),
            Aggregation::Max => write!(f, "max"),
            Aggregation::Med => write!(f, "med"),
            Aggregation::Percentile(p) => write!(f, "p({})", p),
            Aggregation::Rate => write!(f, "rate"),
            Aggregation::Count => write!(f, "count"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Comparator::Lt),
            "<=" => Some(Comparator::Le),
            ">" => Some(Comparator::Gt),
            ">=" => Some(Comparator::Ge),
            _ => None,
        }
    }

    pub fn holds(&self, observed: f64, bound: f64) -> bool {
        match self {
            Comparator::Lt => observed < bound,
            Comparator::Le => observed <= bound,
            Comparator::Gt => observed > bound,
            Comparator::Ge => observed >= bound,
        }
    }
}

/// A single pass/fail condition over an aggregate metric
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSpec {
    pub metric: MetricSelector,
    pub aggregation: Aggregation,
    pub comparator: Comparator,
    pub bound: f64,
    expression: String,
}

impl ThresholdSpec {
    /// Parse `expression` (e.g. `p(95)<600`) for the metric key `metric`
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ThresholdParseError> {
        let selector = MetricSelector::parse(metric)?;
        let captures = EXPRESSION_PATTERN
            .captures(expression)
            .ok_or_else(|| ThresholdParseError::InvalidExpression(expression.to_string()))?;

        let aggregation = match (&captures[1], captures.get(2)) {
            (_, Some(p)) => {
                let p: f64 = p
                    .as_str()
                    .parse()
                    .map_err(|_| ThresholdParseError::InvalidExpression(expression.to_string()))?;
                if !(p > 0.0 && p <= 100.0) {
                    return Err(ThresholdParseError::InvalidPercentile(p));
                }
                Aggregation::Percentile(p)
            }
            ("avg", None) => Aggregation::Avg,
            ("min", None) => Aggregation::Min,
            ("max", None) => Aggregation::Max,
            ("med", None) => Aggregation::Med,
            ("count", None) => Aggregation::Count,
            ("rate", None) => Aggregation::Rate,
            _ => return Err(ThresholdParseError::InvalidExpression(expression.to_string())),
        };

        if !selector.name.supports(&aggregation) {
            return Err(ThresholdParseError::UnsupportedAggregation {
                metric: selector.to_string(),
                aggregation: aggregation.to_string(),
            });
        }

        let comparator = Comparator::parse(&captures[3])
            .ok_or_else(|| ThresholdParseError::InvalidExpression(expression.to_string()))?;
        let bound: f64 = captures[4]
            .parse()
            .map_err(|_| ThresholdParseError::InvalidExpression(expression.to_string()))?;

        Ok(Self {
            metric: selector,
            aggregation,
            comparator,
            bound,
            expression: expression.trim().to_string(),
        })
    }

    /// Parse a k6-style threshold map
    pub fn parse_map(declared: &BTreeMap<String, Vec<String>>) -> Result<Vec<Self>, ThresholdParseError> {
        declared
            .iter()
            .flat_map(|(metric, expressions)| {
                expressions
                    .iter()
                    .map(move |expression| Self::parse(metric, expression))
            })
            .collect()
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Value of the selected statistic in `metrics`
    pub fn observe(&self, metrics: &AggregateMetrics) -> f64 {
        let operation = match &self.metric.tag {
            Some(TagFilter::Operation(op)) => Some(*op),
            _ => None,
        };

        match self.metric.name {
            MetricName::HttpReqDuration => {
                let latency = match operation {
                    Some(op) => match metrics.operation(op) {
                        Some(m) => &m.latency,
                        None => return 0.0,
                    },
                    None => &metrics.latency,
                };
                match self.aggregation {
                    Aggregation::Avg => latency.mean_ms(),
                    Aggregation::Min => latency.min_ms(),
                    Aggregation::Max => latency.max_ms(),
                    Aggregation::Med => latency.percentile_ms(50.0),
                    Aggregation::Percentile(p) => latency.percentile_ms(p),
                    Aggregation::Rate | Aggregation::Count => 0.0,
                }
            }
            MetricName::HttpReqFailed => match operation {
                Some(op) => metrics.operation(op).map(|m| m.failure_rate()).unwrap_or(0.0),
                None => metrics.failure_rate(),
            },
            MetricName::HttpReqs => {
                let count = match operation {
                    Some(op) => metrics.operation(op).map(|m| m.total).unwrap_or(0),
                    None => metrics.total_requests(),
                };
                match self.aggregation {
                    Aggregation::Rate => metrics.request_rate(count),
                    _ => count as f64,
                }
            }
            MetricName::Checks => match &self.metric.tag {
                Some(TagFilter::Check(name)) => metrics
                    .named_checks
                    .get(name)
                    .map(|t| t.rate())
                    .unwrap_or(0.0),
                _ => metrics.checks.rate(),
            },
        }
    }

    pub fn evaluate(&self, metrics: &AggregateMetrics) -> ThresholdResult {
        let observed = self.observe(metrics);
        ThresholdResult {
            metric: self.metric.to_string(),
            expression: self.expression.clone(),
            observed,
            passed: self.comparator.holds(observed, self.bound),
        }
    }
}

/// Outcome of one threshold, kept even when it passes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: f64,
    pub passed: bool,
}

/// Evaluate every threshold against one snapshot
pub fn evaluate(metrics: &AggregateMetrics, specs: &[ThresholdSpec]) -> Vec<ThresholdResult> {
    specs.iter().map(|spec| spec.evaluate(metrics)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::OutcomeRecorder;
    use crate::outcome::{CheckResult, RequestOutcome};
    use chrono::Utc;
    use std::time::Duration;

    fn metrics_with_failures(total: u64, failed: u64) -> AggregateMetrics {
        let recorder = OutcomeRecorder::new().unwrap();
        for i in 0..total {
            let status = if i < failed { 500 } else { 201 };
            recorder.record(&RequestOutcome {
                operation: Operation::Create,
                vu: 1,
                iteration: i,
                status: Some(status),
                latency: Duration::from_millis(10 + i % 90),
                checks: vec![CheckResult::new("status is 201", status == 201)],
                error: None,
                timestamp: Utc::now(),
            });
        }
        recorder.snapshot()
    }

    #[test]
    fn test_failure_rate_threshold() {
        let spec = ThresholdSpec::parse("http_req_failed", "rate<0.01").unwrap();

        let low = metrics_with_failures(1000, 5);
        let result = spec.evaluate(&low);
        assert!((result.observed - 0.005).abs() < 1e-12);
        assert!(result.passed);

        let high = metrics_with_failures(1000, 20);
        let result = spec.evaluate(&high);
        assert!((result.observed - 0.02).abs() < 1e-12);
        assert!(!result.passed);
    }

    #[test]
    fn test_parse_expressions() {
        let spec = ThresholdSpec::parse("http_req_duration", " p(95) < 600 ").unwrap();
        assert_eq!(spec.aggregation, Aggregation::Percentile(95.0));
        assert_eq!(spec.comparator, Comparator::Lt);
        assert_eq!(spec.bound, 600.0);
        assert_eq!(spec.expression(), "p(95) < 600");

        let spec = ThresholdSpec::parse("checks", "rate>=0.99").unwrap();
        assert_eq!(spec.comparator, Comparator::Ge);

        let spec = ThresholdSpec::parse("http_req_duration{operation:update}", "p(99.9)<=1500").unwrap();
        assert_eq!(spec.metric.tag, Some(TagFilter::Operation(Operation::Update)));
        assert_eq!(spec.aggregation, Aggregation::Percentile(99.9));
        assert_eq!(spec.metric.to_string(), "http_req_duration{operation:update}");

        let spec = ThresholdSpec::parse("checks{check:status is 200}", "rate>0.98").unwrap();
        assert_eq!(spec.metric.tag, Some(TagFilter::Check("status is 200".to_string())));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            ThresholdSpec::parse("latency", "avg<1"),
            Err(ThresholdParseError::UnknownMetric(_))
        ));
        assert!(matches!(
            ThresholdSpec::parse("http_req_duration", "avg<<1"),
            Err(ThresholdParseError::InvalidExpression(_))
        ));
        assert!(matches!(
            ThresholdSpec::parse("http_req_duration", "rate<1"),
            Err(ThresholdParseError::UnsupportedAggregation { .. })
        ));
        assert!(matches!(
            ThresholdSpec::parse("http_req_failed", "p(95)<1"),
            Err(ThresholdParseError::UnsupportedAggregation { .. })
        ));
        assert!(matches!(
            ThresholdSpec::parse("http_req_duration", "p(0)<1"),
            Err(ThresholdParseError::InvalidPercentile(_))
        ));
        assert!(matches!(
            ThresholdSpec::parse("http_req_duration{status:200}", "avg<1"),
            Err(ThresholdParseError::UnknownTag { .. })
        ));
        assert!(matches!(
            ThresholdSpec::parse("http_req_duration{operation:delete}", "avg<1"),
            Err(ThresholdParseError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_parse_map_keeps_every_expression() {
        let mut declared = BTreeMap::new();
        declared.insert(
            "http_req_duration".to_string(),
            vec!["avg<400".to_string(), "p(95)<600".to_string()],
        );
        declared.insert("http_req_failed".to_string(), vec!["rate<0.01".to_string()]);
        declared.insert("checks".to_string(), vec!["rate>0.99".to_string()]);
        assert_eq!(ThresholdSpec::parse_map(&declared).unwrap().len(), 4);
    }

    #[test]
    fn test_every_result_reports_observed_value() {
        let metrics = metrics_with_failures(100, 10);
        let specs = vec![
            ThresholdSpec::parse("http_req_failed", "rate<0.01").unwrap(),
            ThresholdSpec::parse("http_req_duration", "avg<10000").unwrap(),
            ThresholdSpec::parse("checks", "rate>0.99").unwrap(),
            ThresholdSpec::parse("http_reqs", "count>=100").unwrap(),
        ];
        let results = evaluate(&metrics, &specs);
        assert_eq!(results.len(), 4);
        assert!(!results[0].passed);
        assert!(results[1].passed);
        assert!(results[1].observed > 0.0);
        assert!(!results[2].passed);
        assert!((results[2].observed - 0.9).abs() < 1e-12);
        assert!(results[3].passed);
        assert_eq!(results[3].observed, 100.0);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let metrics = metrics_with_failures(50, 1);
        let spec = ThresholdSpec::parse("http_req_duration{operation:create}", "p(90)<1000").unwrap();
        assert_eq!(spec.evaluate(&metrics), spec.evaluate(&metrics));
    }

    #[test]
    fn test_empty_metrics_observe_zero() {
        let metrics = OutcomeRecorder::new().unwrap().snapshot();
        let spec = ThresholdSpec::parse("http_req_duration{operation:read}", "p(95)<600").unwrap();
        let result = spec.evaluate(&metrics);
        assert_eq!(result.observed, 0.0);
        assert!(result.passed);
    }
}
