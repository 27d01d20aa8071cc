use anyhow::Context;
use clap::Parser;
use http_api::AppState;
use insta_client::InstagramClientFactory;
use instagate_core::AppConfig;
use media_storage::MediaResolver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "instagate",
    version,
    about = "HTTP gateway for Instagram login, uploads and stats"
)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "INSTAGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides server.host
    #[arg(long)]
    host: Option<String>,

    /// Overrides server.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Instagate v{}", env!("CARGO_PKG_VERSION"));

    let working_dir = std::env::current_dir().context("Failed to read working directory")?;
    let resolver = MediaResolver::with_http_transport(&config.storage, working_dir)
        .context("Failed to build storage client")?;
    if resolver.is_remote_enabled() {
        tracing::info!("Media missing locally will be fetched from remote storage");
    }

    let factory = Arc::new(InstagramClientFactory::new(config.client.clone()));
    let state = AppState::new(factory, resolver);

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    http_api::serve(listener, state).await?;
    Ok(())
}
