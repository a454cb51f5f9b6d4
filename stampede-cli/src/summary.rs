//! Human-readable end-of-run summary

use stampede_core::{Operation, Verdict};
use std::fmt::Write;

/// Exit code when every verdict passed
pub const EXIT_PASSED: u8 = 0;
/// Exit code when a threshold failed, as k6 does
pub const EXIT_THRESHOLDS_FAILED: u8 = 99;
/// Exit code for configuration and setup errors
pub const EXIT_ERROR: u8 = 1;

pub fn exit_code(verdicts: &[Verdict]) -> u8 {
    if verdicts.iter().all(|v| v.all_passed) {
        EXIT_PASSED
    } else {
        EXIT_THRESHOLDS_FAILED
    }
}

fn mark(passed: bool) -> &'static str {
    if passed {
        "✓"
    } else {
        "✗"
    }
}

pub fn render(verdict: &Verdict) -> String {
    let metrics = &verdict.metrics;
    let latency = metrics.latency.summary();
    let total = metrics.total_requests();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} scenario {}: {}",
        mark(verdict.all_passed),
        verdict.scenario,
        if verdict.all_passed { "passed" } else { "FAILED" }
    );
    let _ = writeln!(
        out,
        "  load time ......... {:.1}s (pool of {})",
        metrics.elapsed.as_secs_f64(),
        verdict.pool_size
    );
    let _ = writeln!(
        out,
        "  http_reqs ......... {} ({:.1}/s)",
        total,
        metrics.request_rate(total)
    );
    let _ = writeln!(
        out,
        "  http_req_duration . avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms",
        latency.avg, latency.min, latency.med, latency.max, latency.p90, latency.p95
    );
    let _ = writeln!(
        out,
        "  http_req_failed ... {:.2}% ({} of {})",
        metrics.failure_rate() * 100.0,
        metrics.failed_requests(),
        total
    );
    let _ = writeln!(
        out,
        "  checks ............ {:.2}% ({} of {})",
        metrics.checks.rate() * 100.0,
        metrics.checks.passed,
        metrics.checks.total
    );

    for operation in Operation::all() {
        let Some(op) = metrics.operation(*operation).filter(|m| m.total > 0) else {
            continue;
        };
        let statuses = op
            .statuses
            .iter()
            .map(|(status, count)| format!("{}={}", status, count))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            out,
            "    {:<7} {} requests, {} failed, avg={:.2}ms p(95)={:.2}ms [{}]",
            operation.as_str(),
            op.total,
            op.failed,
            op.latency.mean_ms(),
            op.latency.percentile_ms(95.0),
            statuses
        );
    }

    for (name, tally) in &metrics.named_checks {
        let _ = writeln!(
            out,
            "    {} {} ({} of {})",
            mark(tally.failed() == 0),
            name,
            tally.passed,
            tally.total
        );
    }

    if !verdict.thresholds.is_empty() {
        let _ = writeln!(out, "  thresholds:");
        for threshold in &verdict.thresholds {
            let _ = writeln!(
                out,
                "    {} {} {} (observed {:.4})",
                mark(threshold.passed),
                threshold.metric,
                threshold.expression,
                threshold.observed
            );
        }
    }

    out
}
