use anyhow::{Context, Result};
use stampede_config::StampedeConfig;
use stampede_core::SchedulePlan;
use std::fmt::Write;
use std::time::Duration;

const TIMELINE_POINTS: u32 = 10;

pub fn handle_plan(config: &StampedeConfig, scenario_name: &str) -> Result<()> {
    let scenario = config.scenario(scenario_name)?;
    let plan = scenario
        .profile
        .plan()
        .with_context(|| format!("Scenario '{}' has an invalid profile", scenario_name))?;
    let cap = scenario.run_cap()?;
    print!("{}", render_plan(scenario_name, &plan, cap));
    Ok(())
}

/// Per-VU windows followed by declared vs scheduled concurrency over time
pub fn render_plan(name: &str, plan: &SchedulePlan, cap: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "scenario {}: up to {} VUs, run cap {:?}",
        name,
        plan.max_vus(),
        cap
    );
    if let Some(limit) = plan.iteration_limit() {
        let _ = writeln!(out, "  each VU stops after {} iterations", limit);
    }

    for vu in 1..=plan.max_vus() {
        let windows = plan
            .windows(vu)
            .iter()
            .map(|w| format!("[{:?}, {:?})", w.start, w.stop))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "  VU {:>4}: {}", vu, windows);
    }

    let _ = writeln!(out, "  timeline:");
    let total = plan.total_duration();
    for step in 0..=TIMELINE_POINTS {
        let t = total.mul_f64(f64::from(step) / f64::from(TIMELINE_POINTS));
        let _ = writeln!(
            out,
            "    t={:>8.1}s target={:>8.2} scheduled={}",
            t.as_secs_f64(),
            plan.target_at(t),
            plan.scheduled_at(t)
        );
    }
    out
}
