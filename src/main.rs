use clap::Parser;
use coinwatch::cli::{Cli, Commands};
use coinwatch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .map_err(|e| anyhow::anyhow!("Could not load config from {}: {}", cli.config, e))?;

    coinwatch::telemetry::init_logging(&config.telemetry.log_level)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(config = %cli.config, "starting coinwatch");
            args.execute(&config).await?;
        }
        Commands::CheckConfig(args) => {
            args.execute(&config)?;
        }
    }

    Ok(())
}
