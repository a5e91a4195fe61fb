//! dockflow-web: HTTP front end for the docking pipeline.
//! Provides:
//!   - Basic, scored and reactive docking endpoints
//!   - Health check
//!   - Job progress stream (SSE)

pub mod error;
pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;
