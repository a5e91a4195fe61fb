//! Receptor preparation: atom selection, CRYST1 recombination, hydrogenation
//! and conversion to PDBQT with its docking box.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use dockflow_common::{DockflowError, Result};

use crate::artifact::{Artifact, ArtifactRole};
use crate::stages::{Stage, StageContext};
use crate::toolchain::ToolEnv;

/// Environment variable reduce2 reads its monomer library location from.
pub const MONOMER_LIB_VAR: &str = "MMTBX_CCP4_MONOMER_LIB";

/// ProDy program run by [`AtomExtraction`]; paths and selection arrive as argv.
const SELECT_ATOMS_PY: &str = r#"import sys
from prody import parsePDB, writePDB
structure = parsePDB(sys.argv[1])
selection = structure.select(sys.argv[3])
if selection is None:
    sys.exit('selection matched no atoms: ' + sys.argv[3])
writePDB(sys.argv[2], selection)
"#;

/// Keeps the receptor atoms matching the configured selection.
pub struct AtomExtraction;

#[async_trait]
impl Stage for AtomExtraction {
    fn name(&self) -> &'static str {
        "atom_extraction"
    }

    fn inputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::ReceptorInput]
    }

    fn outputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::ReceptorAtoms]
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>> {
        let tools = ctx.toolchain.tools();
        let output = ctx.output(ArtifactRole::ReceptorAtoms);

        let spec = ctx
            .toolchain
            .command(ToolEnv::Standard, &tools.python)
            .arg("-c")
            .arg(SELECT_ATOMS_PY)
            .path_arg(&ctx.input(ArtifactRole::ReceptorInput))
            .path_arg(&output.path)
            .arg(tools.atom_selection.as_str());
        ctx.runner.run(&spec).await?;

        info!("Receptor atoms extracted to {:?}", output.path);
        Ok(vec![output])
    }
}

/// Prefixes the extracted atoms with the raw receptor's CRYST1 record.
pub struct SymmetryRecombination;

/// First CRYST1 record in `text`, if any.
pub fn cryst1_record(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim_end)
        .find(|line| line.starts_with("CRYST1"))
}

#[async_trait]
impl Stage for SymmetryRecombination {
    fn name(&self) -> &'static str {
        "symmetry_recombination"
    }

    fn inputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::ReceptorInput, ArtifactRole::ReceptorAtoms]
    }

    fn outputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::ReceptorCryst1]
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>> {
        // grep exits 1 when there is no record, which is fine here.
        let spec = ctx
            .toolchain
            .host_command(&ctx.toolchain.tools().grep)
            .arg("CRYST1")
            .path_arg(&ctx.input(ArtifactRole::ReceptorInput))
            .best_effort();
        let lookup = ctx.runner.run(&spec).await?;

        let atoms_path = ctx.input(ArtifactRole::ReceptorAtoms);
        let atoms = fs::read_to_string(&atoms_path)
            .await
            .map_err(|e| DockflowError::InputRead {
                path: atoms_path.clone(),
                reason: e.to_string(),
            })?;

        let mut combined = String::with_capacity(atoms.len() + 81);
        match cryst1_record(&lookup.stdout) {
            Some(record) => {
                combined.push_str(record);
                combined.push('\n');
            }
            None => debug!("No CRYST1 record in receptor; writing atoms only"),
        }
        combined.push_str(&atoms);

        let output = ctx.output(ArtifactRole::ReceptorCryst1);
        fs::write(&output.path, combined).await?;
        info!("Combined receptor written to {:?}", output.path);
        Ok(vec![output])
    }
}

/// Adds hydrogens and optimises flips with reduce2.
///
/// The monomer library variable and the working directory are set on the
/// child process only.
pub struct Hydrogenation;

impl Hydrogenation {
    fn monomer_library(ctx: &StageContext<'_>) -> Result<PathBuf> {
        let lib = &ctx.toolchain.tools().monomer_library;
        if lib.is_absolute() {
            Ok(lib.clone())
        } else {
            Ok(std::env::current_dir()?.join(lib))
        }
    }
}

#[async_trait]
impl Stage for Hydrogenation {
    fn name(&self) -> &'static str {
        "hydrogenation"
    }

    fn inputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::ReceptorCryst1]
    }

    fn outputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::ReceptorHydrogenated]
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>> {
        let tools = ctx.toolchain.tools();
        let monomer_lib = Self::monomer_library(ctx)?;
        info!("Adding hydrogens with reduce2 (monomer library {:?})", monomer_lib);

        let spec = ctx
            .toolchain
            .command(ToolEnv::Standard, &tools.python)
            .path_arg(&tools.reduce2_script)
            .path_arg(&ctx.input(ArtifactRole::ReceptorCryst1))
            .args(tools.reduce2_options.iter().cloned())
            .env(MONOMER_LIB_VAR, monomer_lib.to_string_lossy().into_owned())
            .current_dir(ctx.workspace.root());
        ctx.runner.run(&spec).await?;

        Ok(vec![ctx.output(ArtifactRole::ReceptorHydrogenated)])
    }
}

/// Writes the docking-ready receptor and its enveloping box (mk_prepare_receptor.py).
pub struct ReceptorPreparation;

#[async_trait]
impl Stage for ReceptorPreparation {
    fn name(&self) -> &'static str {
        "receptor_preparation"
    }

    fn inputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::ReceptorHydrogenated, ArtifactRole::BoxInput]
    }

    fn outputs(&self) -> &'static [ArtifactRole] {
        &[ArtifactRole::ReceptorPrepared, ArtifactRole::BoxConfig]
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<Vec<Artifact>> {
        let receptor = ctx.output(ArtifactRole::ReceptorPrepared);
        // Meeko appends .pdbqt / .box.txt to this prefix.
        let prefix = receptor.path.with_extension("");

        let spec = ctx
            .toolchain
            .command(ToolEnv::Standard, &ctx.toolchain.tools().prepare_receptor)
            .arg("--read_pdb")
            .path_arg(&ctx.input(ArtifactRole::ReceptorHydrogenated))
            .arg("-o")
            .path_arg(&prefix)
            .args(["-p", "-v"])
            .arg("--box_enveloping")
            .path_arg(&ctx.input(ArtifactRole::BoxInput))
            .arg("--padding")
            .arg(ctx.settings.box_padding.to_string());
        ctx.runner.run(&spec).await?;

        info!("Receptor preparation complete");
        Ok(vec![receptor, ctx.output(ArtifactRole::BoxConfig)])
    }
}
