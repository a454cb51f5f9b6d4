use crate::summary;
use anyhow::{Context, Result};
use stampede_config::{ScenarioConfig, StampedeConfig, Validatable};
use stampede_core::Verdict;
use stampede_engine::{configure, StopReason};
use stampede_http::{HttpTarget, UsersTarget};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Options of the `run` command
pub struct RunOptions<'a> {
    pub scenarios: &'a [String],
    pub base_url: Option<&'a str>,
    pub summary_json: Option<&'a Path>,
}

/// Run the selected scenarios one after another and return their verdicts
///
/// A setup failure aborts the whole command. Ctrl-C stops the current
/// scenario gracefully and skips the remaining ones.
pub async fn handle_run(config: &StampedeConfig, options: RunOptions<'_>) -> Result<Vec<Verdict>> {
    let mut target_config = config.target.clone();
    if let Some(base_url) = options.base_url {
        target_config.base_url = base_url.to_string();
        target_config
            .validate()
            .context("Invalid --base-url")?;
    }

    let selected = select_scenarios(config, options.scenarios)?;
    let target: Arc<dyn UsersTarget> = Arc::new(
        HttpTarget::from_config(&target_config).context("Failed to create HTTP client")?,
    );
    info!("Target API: {}", target_config.base_url);

    let mut verdicts = Vec::with_capacity(selected.len());
    for (name, scenario) in selected {
        let handle = configure(name.as_str(), scenario, target.clone())
            .with_context(|| format!("Failed to configure scenario '{}'", name))?;
        let stop = handle.stop_handle();

        let ctrl_c = {
            let stop = stop.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    stop.stop();
                }
            })
        };

        info!("Running scenario '{}'", name);
        let result = handle.execute().await;
        ctrl_c.abort();

        let verdict = result.with_context(|| format!("Scenario '{}' setup failed", name))?;
        print!("{}", summary::render(&verdict));
        verdicts.push(verdict);

        if stop.reason() == Some(StopReason::External) {
            warn!("Interrupted, skipping remaining scenarios");
            break;
        }
    }

    if let Some(path) = options.summary_json {
        write_summary_json(path, &verdicts)?;
    }

    Ok(verdicts)
}

/// All scenarios in name order when none is requested
fn select_scenarios<'c>(
    config: &'c StampedeConfig,
    requested: &[String],
) -> Result<Vec<(String, &'c ScenarioConfig)>> {
    if requested.is_empty() {
        if config.scenarios.is_empty() {
            return Err(anyhow::anyhow!("Configuration defines no scenarios"));
        }
        return Ok(config
            .scenarios
            .iter()
            .map(|(name, scenario)| (name.clone(), scenario))
            .collect());
    }

    requested
        .iter()
        .map(|name| Ok((name.clone(), config.scenario(name)?)))
        .collect()
}

fn write_summary_json(path: &Path, verdicts: &[Verdict]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create summary directory")?;
    }
    let json = serde_json::to_string_pretty(verdicts).context("Failed to serialize verdicts")?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Summary written to {:?}", path);
    Ok(())
}
