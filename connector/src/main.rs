use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use fg_connector::{Bridge, BridgeConfig, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BridgeConfig::try_from(cli).context("invalid arguments")?;

    // RUST_LOG overrides the level picked by --debug
    env_logger::Builder::new()
        .filter_level(config.log_level)
        .parse_default_env()
        .init();

    info!("fg-connector {} (shared {})", env!("CARGO_PKG_VERSION"), fg_shared::VERSION);

    let bridge = Bridge::open(&config)
        .await
        .context("failed to create resources")?;
    println!("Successfully created resources");
    println!("Type '{}' to stop", fg_connector::app::QUIT_COMMAND);

    let stats = bridge.run_until_quit().await.context("forwarding stopped with an error")?;
    info!(
        "Stopped after {} datagrams in and {} out",
        stats.datagrams_received, stats.datagrams_sent
    );
    Ok(())
}
