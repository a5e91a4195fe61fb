//! Artifacts handed from stage to stage.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Logical role of a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    LigandInput,
    ReceptorInput,
    BoxInput,
    LigandProtomers,
    LigandPrepared,
    ReceptorAtoms,
    ReceptorCryst1,
    ReceptorHydrogenated,
    ReceptorPrepared,
    BoxConfig,
    DockingResult,
    LigandPose,
}

impl ArtifactRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactRole::LigandInput => "ligand_input",
            ArtifactRole::ReceptorInput => "receptor_input",
            ArtifactRole::BoxInput => "box_input",
            ArtifactRole::LigandProtomers => "ligand_protomers",
            ArtifactRole::LigandPrepared => "ligand_prepared",
            ArtifactRole::ReceptorAtoms => "receptor_atoms",
            ArtifactRole::ReceptorCryst1 => "receptor_cryst1",
            ArtifactRole::ReceptorHydrogenated => "receptor_hydrogenated",
            ArtifactRole::ReceptorPrepared => "receptor_prepared",
            ArtifactRole::BoxConfig => "box_config",
            ArtifactRole::DockingResult => "docking_result",
            ArtifactRole::LigandPose => "ligand_pose",
        }
    }

    /// Location relative to the scratch directory.
    ///
    /// Receptor file names follow what the tools derive on their own:
    /// reduce2 appends `FH` to its input stem and Meeko writes
    /// `<prefix>.pdbqt` plus `<prefix>.box.txt`.
    pub fn relative_path(&self) -> &'static str {
        match self {
            ArtifactRole::LigandInput => "inputs/ligand",
            ArtifactRole::ReceptorInput => "inputs/receptor",
            ArtifactRole::BoxInput => "inputs/box",
            ArtifactRole::LigandProtomers => "ligand_with_protomers.sdf",
            ArtifactRole::LigandPrepared => "ligand_prepared/_i0.pdbqt",
            ArtifactRole::ReceptorAtoms => "receptor_atoms.pdb",
            ArtifactRole::ReceptorCryst1 => "receptor_cryst1.pdb",
            ArtifactRole::ReceptorHydrogenated => "receptor_cryst1FH.pdb",
            ArtifactRole::ReceptorPrepared => "receptor_prepared.pdbqt",
            ArtifactRole::BoxConfig => "receptor_prepared.box.txt",
            ArtifactRole::DockingResult => "docking.pdbqt",
            ArtifactRole::LigandPose => "pose.sdf",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file staged in the job's scratch directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub role: ArtifactRole,
    pub path: PathBuf,
    /// Docking score, when one was extracted for this file.
    pub score: Option<f64>,
}

impl Artifact {
    pub fn new(role: ArtifactRole, path: impl Into<PathBuf>) -> Self {
        Self {
            role,
            path: path.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Artifacts known to a running job, one per role.
#[derive(Debug, Default)]
pub struct Artifacts {
    by_role: BTreeMap<ArtifactRole, Artifact>,
}

impl Artifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact, replacing any earlier one with the same role.
    pub fn register(&mut self, artifact: Artifact) {
        self.by_role.insert(artifact.role, artifact);
    }

    pub fn get(&self, role: ArtifactRole) -> Option<&Artifact> {
        self.by_role.get(&role)
    }

    pub fn path(&self, role: ArtifactRole) -> Option<&Path> {
        self.get(role).map(|a| a.path.as_path())
    }
}
