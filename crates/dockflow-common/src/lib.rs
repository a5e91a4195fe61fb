//! dockflow-common: Shared error taxonomy and job types used across all dockflow crates.

pub mod error;
pub mod job;

// Re-export commonly used types
pub use error::{DockflowError, Result};
pub use job::{CovalentResidue, InputRefs, Job, ReactiveGroups, Workflow, WorkflowKind};
