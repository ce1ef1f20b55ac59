use anyhow::Context;
use clap::Parser;
use mockapi::{Config, MockApiServer};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mockapi", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "MOCKAPI_CONFIG")]
    config: Option<PathBuf>,
    /// Override `listen.port`
    #[arg(short, long)]
    port: Option<u16>,
    /// Override `mockDataDir`
    #[arg(long)]
    mock_data_dir: Option<PathBuf>,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "MOCKAPI_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            info!("No config file given, using defaults");
            Config::default()
        }
    };
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(dir) = args.mock_data_dir {
        config.mock_data_dir = dir;
    }

    let listener = TcpListener::bind((config.listen.address.as_str(), config.listen.port))
        .await
        .with_context(|| format!("Failed to bind {}", config.listen.bind_addr()))?;

    let server = MockApiServer::new(config)?;
    server
        .run_until(listener, async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
}
