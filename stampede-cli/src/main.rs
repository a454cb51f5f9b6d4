use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use stampede_config::{ConfigLoader, LogLevel, StampedeConfig};
use stampede_logging::{init_logging_from_config, init_simple_tracing};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{debug, info};

mod cli;
mod commands;
mod summary;

use cli::{Cli, Commands, ConfigCommands};
use commands::run::RunOptions;

fn load_config(config_path: Option<&PathBuf>) -> Result<StampedeConfig> {
    match config_path {
        Some(path) => ConfigLoader::new()
            .from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            ConfigLoader::new()
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

/// `--log-level` overrides the configured level; anything that is not a
/// plain level is taken as a filter directive
fn init_logging(config: &mut StampedeConfig, log_level: Option<&String>) -> Result<()> {
    match log_level {
        Some(directive) => match LogLevel::from_str(directive) {
            Ok(level) => {
                config.logging.level = level;
                init_logging_from_config(&config.logging)
            }
            Err(_) => init_simple_tracing(directive),
        },
        None => init_logging_from_config(&config.logging),
    }
}

async fn dispatch(cli: Cli) -> Result<u8> {
    // Generating a config must work without a valid one
    if let Some(Commands::Config {
        config_cmd: ConfigCommands::Generate { output, force },
    }) = &cli.command
    {
        init_simple_tracing(cli.log_level.as_deref().unwrap_or("info"))?;
        commands::config::handle_config_generate(output, *force)?;
        return Ok(summary::EXIT_PASSED);
    }

    let mut config = load_config(cli.config.as_ref())?;
    init_logging(&mut config, cli.log_level.as_ref())?;
    info!("Stampede starting");

    match &cli.command {
        Some(Commands::Run {
            scenarios,
            base_url,
            summary_json,
        }) => {
            let verdicts = commands::run::handle_run(
                &config,
                RunOptions {
                    scenarios,
                    base_url: base_url.as_deref(),
                    summary_json: summary_json.as_deref(),
                },
            )
            .await?;
            Ok(summary::exit_code(&verdicts))
        }
        Some(Commands::Validate) => {
            commands::validate::handle_validate(&config)?;
            Ok(summary::EXIT_PASSED)
        }
        Some(Commands::Plan { scenario }) => {
            commands::plan::handle_plan(&config, scenario)?;
            Ok(summary::EXIT_PASSED)
        }
        Some(Commands::Config { .. }) => Ok(summary::EXIT_PASSED),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(summary::EXIT_PASSED)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match dispatch(Cli::parse()).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(summary::EXIT_ERROR)
        }
    }
}
