//! Axum router: maps all URL paths to handlers.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{
    docking::{
        basic_docking, basic_docking_info, reactive_docking, reactive_docking_info, scored_docking,
        scored_docking_info,
    },
    system::health,
};
use crate::sse::sse_handler;
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Docking
        .route("/basic_docking",    get(basic_docking_info).post(basic_docking))
        .route("/scored_docking",   get(scored_docking_info).post(scored_docking))
        .route("/reactive_docking", get(reactive_docking_info).post(reactive_docking))

        // System
        .route("/health", get(health))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
