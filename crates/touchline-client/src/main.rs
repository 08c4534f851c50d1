//! Touchline watcher entry point.
//!
//! # Usage
//!
//! ```bash
//! # Watch the board and the lobby chat against a local server
//! touchline --board --chat lobby
//!
//! # Follow one match on a remote deployment
//! TOUCHLINE_SERVER_URL=https://scores.example.com touchline --match match_001
//! ```

use clap::Parser;
use touchline_client::Args;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    touchline_client::run(args.into_config()).await?;

    Ok(())
}
