//! Apigate - management API for a reverse-proxy configuration store
//!
//! Issues bearer tokens to service accounts and operators and guards the
//! admin API.

use apigate::metrics::server::MetricsServer;
use apigate::{config::Config, server::Server};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Apigate - proxy configuration management API
#[derive(Parser, Debug)]
#[command(name = "apigate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence over --log-level
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Apigate v{}", apigate::VERSION);

    // Secrets are validated here, before anything binds
    let config = Config::load(&args.config)?;
    info!("Loaded configuration from {:?}", args.config);

    let mut metrics_server = if config.metrics.enabled {
        let mut server = MetricsServer::new(SocketAddr::from(([0, 0, 0, 0], config.metrics.port)));
        let addr = server.start().await?;
        info!("Metrics available at http://{}/metrics", addr);
        Some(server)
    } else {
        None
    };

    let server = Server::new(config).await?;
    server.run().await?;

    if let Some(metrics_server) = metrics_server.as_mut() {
        metrics_server.shutdown().await;
    }

    Ok(())
}
