//! CLI interface for coinwatch
//!
//! Provides subcommands for:
//! - `run`: Start the monitoring daemon
//! - `check-config`: Validate the configuration file and exit

mod check_config;
mod run;

pub use check_config::CheckConfigArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "coinwatch")]
#[command(about = "Market and social monitoring daemon with webhook alerting")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the monitoring daemon
    Run(RunArgs),
    /// Validate the configuration file and exit
    CheckConfig(CheckConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path() {
        let cli = Cli::parse_from(["coinwatch", "run"]);
        assert_eq!(cli.config, "config.yaml");
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn config_path_override() {
        let cli = Cli::parse_from(["coinwatch", "-c", "/etc/coinwatch.yaml", "check-config"]);
        assert_eq!(cli.config, "/etc/coinwatch.yaml");
        assert!(matches!(cli.command, Commands::CheckConfig(_)));
    }
}
