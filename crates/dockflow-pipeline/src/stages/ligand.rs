//! Ligand preparation: protomer enumeration and conversion to PDBQT.

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use dockflow_common::{DockflowError, ReactiveGroups, Result};

use crate::artifact::{Artifact, ArtifactRole};
use crate::stages::{Stage, StageContext};
use crate::toolchain::ToolEnv;

/// Expands the ligand SMILES into its protomers (scrub.py).
pub struct ProtomerGeneration;

#[async_trait]
impl Stage for ProtomerGeneration {
    fn name(&self) -> &'static str {
        "protomer_generation"
    }

    fn inputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::LigandInput]
    }

    fn outputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::LigandProtomers]
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>> {
        let descriptor = ctx.input(ArtifactRole::LigandInput);
        let smiles = fs::read_to_string(&descriptor)
            .await
            .map_err(|e| DockflowError::InputRead {
                path: descriptor.clone(),
                reason: e.to_string(),
            })?;
        let smiles = smiles.trim();
        if smiles.is_empty() {
            return Err(DockflowError::InputRead {
                path: descriptor,
                reason: "ligand descriptor is empty".to_string(),
            });
        }

        let output = ctx.output(ArtifactRole::LigandProtomers);
        info!("Generating protomers for {}", smiles);

        let spec = ctx
            .toolchain
            .command(ToolEnv::Standard, &ctx.toolchain.tools().scrub)
            .arg(smiles)
            .arg("-o")
            .path_arg(&output.path)
            .arg("--skip_tautomers")
            .arg("--ph_low")
            .arg(ctx.settings.ph_low.to_string())
            .arg("--ph_high")
            .arg(ctx.settings.ph_high.to_string());
        ctx.runner.run(&spec).await?;

        Ok(vec![output])
    }
}

/// Converts protomers to docking-ready PDBQT poses (mk_prepare_ligand.py).
pub struct LigandPreparation {
    env: ToolEnv,
    reactive_groups: Option<ReactiveGroups>,
}

impl LigandPreparation {
    pub fn new(env: ToolEnv, reactive_groups: Option<ReactiveGroups>) -> Self {
        Self { env, reactive_groups }
    }
}

#[async_trait]
impl Stage for LigandPreparation {
    fn name(&self) -> &'static str {
        "ligand_preparation"
    }

    fn inputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::LigandProtomers]
    }

    fn outputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::LigandPrepared]
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>> {
        let output = ctx.output(ArtifactRole::LigandPrepared);
        // Meeko writes one file per pose into this directory; the first pose is docked.
        let out_dir = output
            .path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| ctx.workspace.root().to_path_buf());
        fs::create_dir_all(&out_dir).await?;

        let mut spec = ctx
            .toolchain
            .command(self.env, &ctx.toolchain.tools().prepare_ligand)
            .arg("-i")
            .path_arg(&ctx.input(ArtifactRole::LigandProtomers))
            .arg("--multimol_outdir")
            .path_arg(&out_dir);
        if let Some(groups) = &self.reactive_groups {
            info!("Preparing reactive ligand with groups {}", groups.to_arg());
            spec = spec.arg("--reactive").arg(groups.to_arg());
        }
        ctx.runner.run(&spec).await?;

        Ok(vec![output])
    }
}
