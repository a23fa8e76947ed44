//! Deck generation service entry point

use clap::Parser;
use deckgen_server::{run_server, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deckgen_server=info,deck_store=info,tower_http=info".into()),
        )
        .init();

    let config = Config::parse();
    tracing::info!(addr = %config.addr(), "starting deck generation service");

    run_server(config).await?;
    Ok(())
}
