//! Docking job definition and the parameter objects of the reactive workflow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{DockflowError, Result};

/// Atom filled in when a covalent residue is given without one.
pub const DEFAULT_COVALENT_ATOM: &str = "SG";
/// Maximum bond distance (Å) filled in when a covalent residue is given without one.
pub const DEFAULT_COVALENT_DISTANCE: &str = "2.0";

// ── Workflow ──────────────────────────────────────────────────────────────────

/// Which result contract a job answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Basic docking, lenient publishing (`outputs` + `metadata.status`).
    Basic,
    /// Basic docking with score extraction, strict publishing.
    Scored,
    /// Reactive/covalent docking (`status` + `uploaded_files`).
    Reactive,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Basic => "basic",
            WorkflowKind::Scored => "scored",
            WorkflowKind::Reactive => "reactive",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workflow variant together with its variant-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Workflow {
    Basic,
    Scored,
    Reactive {
        groups: Option<ReactiveGroups>,
        residue: Option<CovalentResidue>,
    },
}

impl Workflow {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            Workflow::Basic => WorkflowKind::Basic,
            Workflow::Scored => WorkflowKind::Scored,
            Workflow::Reactive { .. } => WorkflowKind::Reactive,
        }
    }
}

// ── Job ───────────────────────────────────────────────────────────────────────

/// Remote references of the three inputs every docking job needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRefs {
    pub ligand: String,
    pub receptor: String,
    #[serde(rename = "box")]
    pub box_ref: String,
}

/// One docking request. Lives for the duration of a single pipeline run.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub workflow: Workflow,
    pub inputs: InputRefs,
    /// Destination prefix in the artifact store.
    pub output_dir: String,
}

impl Job {
    /// Build a job, rejecting empty input references.
    pub fn new(workflow: Workflow, inputs: InputRefs, output_dir: impl Into<String>) -> Result<Self> {
        for (field, value) in [
            ("ligand", &inputs.ligand),
            ("receptor", &inputs.receptor),
            ("box", &inputs.box_ref),
        ] {
            if value.trim().is_empty() {
                return Err(DockflowError::InvalidParameter(format!(
                    "missing input reference: {}",
                    field
                )));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            workflow,
            inputs,
            output_dir: output_dir.into(),
        })
    }

    pub fn kind(&self) -> WorkflowKind {
        self.workflow.kind()
    }
}

// ── Covalent residue ──────────────────────────────────────────────────────────

/// Covalent attachment point handed to Vina as `residue:atom:max_distance`.
///
/// A bare residue token (`CYS87`) gets the default atom and distance. Anything
/// containing a `:` is taken as already qualified and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovalentResidue(String);

impl CovalentResidue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CovalentResidue {
    type Err = DockflowError;

    fn from_str(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(DockflowError::InvalidParameter(
                "reactive_residues: empty residue specification".to_string(),
            ));
        }

        if spec.contains(':') {
            return Ok(Self(spec.to_string()));
        }
        Ok(Self(format!(
            "{}:{}:{}",
            spec, DEFAULT_COVALENT_ATOM, DEFAULT_COVALENT_DISTANCE
        )))
    }
}

impl fmt::Display for CovalentResidue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Reactive groups ───────────────────────────────────────────────────────────

/// Reactive-site names handed to ligand preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactiveGroups(Vec<String>);

impl ReactiveGroups {
    /// Validate a caller-supplied list. An empty list means "no reactive groups".
    pub fn from_list(groups: Vec<String>) -> Result<Option<Self>> {
        let groups: Vec<String> = groups.into_iter().map(|g| g.trim().to_string()).collect();
        if groups.is_empty() {
            return Ok(None);
        }

        if let Some(bad) = groups
            .iter()
            .find(|g| g.is_empty() || g.contains(',') || g.chars().any(char::is_whitespace))
        {
            return Err(DockflowError::InvalidParameter(format!(
                "reactive group '{}' must be a single non-empty token",
                bad
            )));
        }

        Ok(Some(Self(groups)))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Comma-joined form expected by the ligand preparation tool.
    pub fn to_arg(&self) -> String {
        self.0.join(",")
    }
}
