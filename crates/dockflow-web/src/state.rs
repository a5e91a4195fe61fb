//! Shared application state for the web server.

use std::sync::Arc;
use tokio::sync::broadcast;

use dockflow_config::Config;
use dockflow_pipeline::process::CommandRunner;
use dockflow_pipeline::storage::ArtifactStore;
use dockflow_pipeline::{DockingPipeline, PipelineProgress};

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<DockingPipeline>,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<PipelineProgress>,
}

impl AppState {
    pub fn new(config: Config, runner: Arc<dyn CommandRunner>, store: Arc<dyn ArtifactStore>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let pipeline = DockingPipeline::new(&config, runner, store).with_progress(event_tx.clone());
        Self {
            config,
            pipeline: Arc::new(pipeline),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineProgress> {
        self.event_tx.subscribe()
    }
}

pub type SharedState = Arc<AppState>;
