//! Export of the docked poses to SDF (mk_export.py).

use async_trait::async_trait;
use tracing::info;

use dockflow_common::Result;

use crate::artifact::{Artifact, ArtifactRole};
use crate::stages::{Stage, StageContext};
use crate::toolchain::ToolEnv;

pub struct PoseExport;

#[async_trait]
impl Stage for PoseExport {
    fn name(&self) -> &'static str {
        "pose_export"
    }

    fn inputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::DockingResult]
    }

    fn outputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::LigandPose]
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>> {
        let output = ctx.output(ArtifactRole::LigandPose);
        info!("Exporting docked pose");

        let spec = ctx
            .toolchain
            .command(ToolEnv::Standard, &ctx.toolchain.tools().export_pose)
            .path_arg(&ctx.input(ArtifactRole::DockingResult))
            .arg("-s")
            .path_arg(&output.path);
        ctx.runner.run(&spec).await?;

        // Presence is checked at publish time; a missing pose is reported, not raised.
        Ok(vec![output])
    }
}
