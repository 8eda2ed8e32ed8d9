use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use nimbus_core::DATA_FILE;
use nimbus_server::{run_server, DEFAULT_PORT};

#[derive(Parser)]
#[command(name = "nimbus-server")]
#[command(about = "Aggregation server for the nimbus weather telemetry fabric")]
struct Cli {
    /// Port to listen on; an unparseable value falls back to the default
    port: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nimbus_server=info,nimbus_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let port = match cli.port.as_deref() {
        None => DEFAULT_PORT,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("invalid port '{}', using default {}", raw, DEFAULT_PORT);
            DEFAULT_PORT
        }),
    };

    if let Err(error) = run_server(port, PathBuf::from(DATA_FILE)).await {
        tracing::error!("Server error: {}", error);
        std::process::exit(1);
    }
}
