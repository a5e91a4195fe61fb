//! dockflow-pipeline: Docking workflow orchestrator.
//!
//! A job runs through a fixed sequence of external tools:
//! 1. Ligand protomer generation (scrub.py)
//! 2. Receptor atom extraction, CRYST1 recombination and hydrogenation (ProDy, reduce2)
//! 3. Receptor and ligand docking-format preparation (Meeko)
//! 4. Docking (AutoDock Vina), optionally covalent
//! 5. Pose export and best-effort score extraction
//! 6. Publishing of the results to the artifact store

pub mod process;
pub mod toolchain;
pub mod workspace;
pub mod artifact;
pub mod storage;
pub mod stages;
pub mod score;
pub mod publish;
pub mod result;
pub mod pipeline;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use dockflow_common::{DockflowError, Result};
pub use pipeline::{DockingPipeline, PipelineProgress};
pub use result::{JobReport, JobResult, JobStatus};
