//! Dockflow Web Server
//!
//! Run with: cargo run -p dockflow-web

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dockflow_config::Config;
use dockflow_pipeline::process::ProcessRunner;
use dockflow_pipeline::storage;
use dockflow_web::router::build_router;
use dockflow_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Dockflow Web Server...");

    let config = Config::load()?;
    info!(
        backend = ?config.storage.backend,
        scratch_root = ?config.workspace.scratch_root,
        launcher = %config.tools.launcher,
        "Configuration loaded"
    );

    let store = storage::from_config(&config.storage)?;
    let bind = config.server.bind.clone();
    let state = AppState::new(config, Arc::new(ProcessRunner::new()), store);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
