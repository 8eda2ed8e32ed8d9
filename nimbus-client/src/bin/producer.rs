use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use nimbus_client::producer::run_producer;

#[derive(Parser)]
#[command(name = "nimbus-producer")]
#[command(about = "Pushes station readings to the aggregation server")]
struct Cli {
    /// Aggregation server URL or bare host:port
    server_url: String,

    /// Line-oriented `key: value` station file
    file_path: PathBuf,

    /// Stop after this many update cycles; negative runs forever
    #[arg(long, default_value_t = -1)]
    cycles: i64,
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

    if let Err(error) = run_producer(&cli.server_url, &cli.file_path, cli.cycles).await {
        tracing::error!("Producer error: {}", error);
        std::process::exit(1);
    }
}
