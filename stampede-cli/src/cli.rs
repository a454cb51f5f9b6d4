//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stampede", author, version, about = "Load test a users API", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error) or a filter directive
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios sequentially and judge them against their thresholds
    Run {
        /// Scenario to run; repeat for several, omit to run all
        #[arg(long = "scenario", value_name = "NAME")]
        scenarios: Vec<String>,

        /// Override the target base URL
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,

        /// Write all verdicts as JSON to this file
        #[arg(long, value_name = "PATH")]
        summary_json: Option<PathBuf>,
    },

    /// Load and validate the configuration, including every scenario
    Validate,

    /// Print the VU schedule of a scenario
    Plan {
        /// Scenario name
        #[arg(long, value_name = "NAME")]
        scenario: String,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate a sample configuration file
    Generate {
        /// Output file path
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}
