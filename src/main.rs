use anyhow::Context;
use clap::Parser;
use tracing::debug;

use mandi_arbitrage::cli::{catalog, compute, Cli, Commands};
use mandi_arbitrage::domain::GeoCatalog;
use mandi_arbitrage::util::{config::Config, version::version_label};
use mandi_arbitrage::ArbitrageEngine;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::discover(cli.config.as_deref()) {
        Ok(config) => config.with_env_keys(),
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    config.logging.init();
    debug!(version = %version_label(), "mandi-arbitrage starting");

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    let geo = GeoCatalog::embedded().context("failed to load market catalog")?;

    match command {
        Commands::Compute(args) => {
            let engine = ArbitrageEngine::from_config(config, geo)
                .context("failed to set up providers")?;
            compute::run(&engine, &args).await
        }
        Commands::Nearest(args) => catalog::nearest(&geo, &args),
        Commands::Crops(args) => catalog::crops(&geo, &args),
        Commands::Vehicles => catalog::vehicles(&geo),
        Commands::Cities => catalog::cities(&geo),
        Commands::Trend(args) => catalog::trend(&geo, &args),
        Commands::Locate(args) => catalog::locate(&geo, &args),
    }
}
