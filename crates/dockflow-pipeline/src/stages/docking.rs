//! Docking with AutoDock Vina and best-effort score extraction.

use async_trait::async_trait;
use tracing::info;

use dockflow_common::{CovalentResidue, Result};

use crate::artifact::{Artifact, ArtifactRole};
use crate::score::extract_score;
use crate::stages::{Stage, StageContext};
use crate::toolchain::ToolEnv;

/// Runs Vina; with a covalent residue the reactive attachment is passed along.
pub struct Docking {
    env: ToolEnv,
    covalent: Option<CovalentResidue>,
}

impl Docking {
    pub fn new(env: ToolEnv, covalent: Option<CovalentResidue>) -> Self {
        Self { env, covalent }
    }
}

#[async_trait]
impl Stage for Docking {
    fn name(&self) -> &'static str {
        "docking"
    }

    fn inputs(&self) -> &'static [ArtifactRole] {
        &[
            ArtifactRole::LigandPrepared,
            ArtifactRole::ReceptorPrepared,
            ArtifactRole::BoxConfig,
        ]
    }

    fn outputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::DockingResult]
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>> {
        let output = ctx.output(ArtifactRole::DockingResult);

        let mut spec = ctx
            .toolchain
            .command(self.env, &ctx.toolchain.tools().vina)
            .arg("--ligand")
            .path_arg(&ctx.input(ArtifactRole::LigandPrepared))
            .arg("--receptor")
            .path_arg(&ctx.input(ArtifactRole::ReceptorPrepared))
            .arg("--config")
            .path_arg(&ctx.input(ArtifactRole::BoxConfig))
            .arg("--out")
            .path_arg(&output.path);
        if let Some(residue) = &self.covalent {
            info!("Running covalent docking against {}", residue);
            spec = spec.arg("--covalent").arg(residue.as_str());
        } else {
            info!("Running docking");
        }
        ctx.runner.run(&spec).await?;

        Ok(vec![output])
    }
}

/// Reads the best pose's score from the docking result. Never fails the job.
pub struct ScoreExtraction;

#[async_trait]
impl Stage for ScoreExtraction {
    fn name(&self) -> &'static str {
        "score_extraction"
    }

    fn inputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::DockingResult]
    }

    fn outputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::DockingResult]
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>> {
        let docking = ctx.input(ArtifactRole::DockingResult);
        let score = extract_score(&docking).await;
        info!("Docking score: {}", score);
        Ok(vec![Artifact::new(ArtifactRole::DockingResult, docking).with_score(score)])
    }
}
