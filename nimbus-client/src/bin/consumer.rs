use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use nimbus_client::consumer::run_consumer;

#[derive(Parser)]
#[command(name = "nimbus-consumer")]
#[command(about = "Reads station data back from the aggregation server")]
struct Cli {
    /// Aggregation server URL or bare host:port
    server_url: String,

    /// Station to read; the most recent station when omitted
    station_id: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nimbus_client=info,nimbus_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(error) = run_consumer(&cli.server_url, cli.station_id.as_deref()).await {
        tracing::error!("Consumer error: {}", error);
        std::process::exit(1);
    }
}
