//! HTTP handlers for all routes.

pub mod docking;
pub mod system;
