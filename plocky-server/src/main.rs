//! Entry point for the plocky HTTP server.

use std::io;

use anyhow::Result;
use plocky_server::{config::Config, start_server};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing() {
    // RUST_LOG controls the level, e.g. RUST_LOG=plocky_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("Plocky server starting");

    let config = Config::load()?;
    start_server(config).await
}
