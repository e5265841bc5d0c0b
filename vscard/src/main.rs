use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vscard::{Bridge, Config, NullEngine};

/// Bridge a virtual smart-card reader driver to a card engine
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file naming the driver `host` and `port`
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load(&cli.config)?;
    info!("Bridging to reader driver at {}:{}", config.host, config.port);

    Bridge::new(&config, Box::new(NullEngine)).run().await?;

    Ok(())
}
