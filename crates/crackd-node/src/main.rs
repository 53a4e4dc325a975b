use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crackd_engine::HashcatEngine;
use crackd_node::api;
use crackd_node::{AuthConfig, NodeConfig, ResourceStores, SessionManager};

#[derive(Parser)]
#[command(name = "crackd-node")]
#[command(about = "crackd worker node - session control API over a hashcat engine", long_about = None)]
struct Cli {
    /// Path to the node configuration file
    #[arg(short, long, default_value = "crackd.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = NodeConfig::load(&cli.config)?;

    let stores = ResourceStores::open(&config.storage.data_dir).await?;
    let engine = HashcatEngine::new(
        config.engine.binary.clone(),
        config.storage.data_dir.join("potfiles"),
    )
    .with_status_timer(config.engine.status_timer_secs)
    .with_grace_period(Duration::from_secs(config.engine.grace_period_secs));
    let manager = Arc::new(SessionManager::new(Arc::new(engine), stores));

    let auth = AuthConfig::new(config.auth.username.clone(), config.auth.password.clone());
    let app = api::router(manager, auth);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, data_dir = %config.storage.data_dir.display(), "crackd node listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}
