use anyhow::{Context, Result};
use stampede_config::StampedeConfig;

/// Report what a loaded configuration would run
///
/// Loading already validated every domain; this builds each schedule too so
/// profile problems surface before a run is attempted.
pub fn handle_validate(config: &StampedeConfig) -> Result<()> {
    if config.scenarios.is_empty() {
        return Err(anyhow::anyhow!("Configuration defines no scenarios"));
    }

    println!("✓ Configuration valid, target {}", config.target.base_url);
    for (name, scenario) in &config.scenarios {
        let plan = scenario
            .profile
            .plan()
            .with_context(|| format!("Scenario '{}' has an invalid profile", name))?;
        let cap = scenario
            .run_cap()
            .with_context(|| format!("Scenario '{}' has an invalid run cap", name))?;
        println!(
            "  {}: {:?} with up to {} VUs for {:?}, pool {}, {} thresholds",
            name,
            scenario.operation,
            plan.max_vus(),
            cap,
            scenario.pool.size,
            scenario.thresholds.values().map(Vec::len).sum::<usize>()
        );
    }
    Ok(())
}
