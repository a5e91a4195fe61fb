//! Stage library.
//!
//! A stage declares the artifact roles it consumes and produces and runs one
//! external tool. The orchestrator checks declared inputs before calling
//! [`Stage::run`] and registers whatever the stage returns.

pub mod docking;
pub mod export;
pub mod ligand;
pub mod receptor;

use async_trait::async_trait;
use uuid::Uuid;

use dockflow_common::{Result, Workflow};
use dockflow_config::PipelineConfig;

use crate::artifact::{Artifact, ArtifactRole, Artifacts};
use crate::process::CommandRunner;
use crate::toolchain::{ToolEnv, Toolchain};
use crate::workspace::Workspace;

pub use docking::{Docking, ScoreExtraction};
pub use export::PoseExport;
pub use ligand::{LigandPreparation, ProtomerGeneration};
pub use receptor::{AtomExtraction, Hydrogenation, ReceptorPreparation, SymmetryRecombination};

/// Everything a stage may touch while it runs.
pub struct StageContext<'a> {
    pub job_id: Uuid,
    pub workspace: &'a Workspace,
    pub artifacts: &'a Artifacts,
    pub runner: &'a dyn CommandRunner,
    pub toolchain: &'a Toolchain,
    pub settings: &'a PipelineConfig,
}

impl StageContext<'_> {
    /// Path of a registered input, falling back to its well-known location.
    pub fn input(&self, role: ArtifactRole) -> std::path::PathBuf {
        self.artifacts
            .path(role)
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.workspace.path(role))
    }

    /// Artifact record for an output at its well-known location.
    pub fn output(&self, role: ArtifactRole) -> Artifact {
        Artifact::new(role, self.workspace.path(role))
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn inputs(&self) -> &'static [ArtifactRole];

    fn outputs(&self) -> &'static [ArtifactRole];

    /// Run the stage and return the artifacts it produced.
    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>>;
}

/// Ordered stage list for a workflow variant.
pub fn stages_for(workflow: &Workflow) -> Vec<Box<dyn Stage>> {
    let (groups, residue, env) = match workflow {
        Workflow::Basic | Workflow::Scored => (None, None, ToolEnv::Standard),
        Workflow::Reactive { groups, residue } => (groups.clone(), residue.clone(), ToolEnv::Reactive),
    };

    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(ProtomerGeneration),
        Box::new(LigandPreparation::new(env, groups)),
        Box::new(AtomExtraction),
        Box::new(SymmetryRecombination),
        Box::new(Hydrogenation),
        Box::new(ReceptorPreparation),
        Box::new(Docking::new(env, residue)),
        Box::new(PoseExport),
    ];
    if matches!(workflow, Workflow::Scored) {
        stages.push(Box::new(ScoreExtraction));
    }
    stages
}
