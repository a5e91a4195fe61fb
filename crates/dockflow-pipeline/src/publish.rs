//! Publishing of job outputs.
//!
//! Every output is uploaded on its own; a failed or missing file is recorded
//! and the remaining uploads still run.

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use dockflow_common::WorkflowKind;

use crate::artifact::{ArtifactRole, Artifacts};
use crate::storage::{object_key, ArtifactStore};

/// Format of the timestamp that names published objects.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Published outputs of a docking job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSlot {
    LigandDocking,
    LigandPose,
    ReceptorVisualization,
}

impl OutputSlot {
    pub const ALL: [OutputSlot; 3] = [
        OutputSlot::LigandDocking,
        OutputSlot::LigandPose,
        OutputSlot::ReceptorVisualization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSlot::LigandDocking => "ligand_docking",
            OutputSlot::LigandPose => "ligand_pose",
            OutputSlot::ReceptorVisualization => "receptor_visualization",
        }
    }

    pub fn role(&self) -> ArtifactRole {
        match self {
            OutputSlot::LigandDocking => ArtifactRole::DockingResult,
            OutputSlot::LigandPose => ArtifactRole::LigandPose,
            OutputSlot::ReceptorVisualization => ArtifactRole::ReceptorHydrogenated,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputSlot::LigandDocking => "pdbqt",
            OutputSlot::LigandPose => "sdf",
            OutputSlot::ReceptorVisualization => "pdb",
        }
    }
}

/// Where one output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSpec {
    pub slot: OutputSlot,
    pub file_name: String,
    /// Full object key (destination prefix + file name).
    pub key: String,
}

/// Upload destinations for a job.
///
/// Basic and scored jobs publish into one sub-directory per output under
/// `output_dir`; reactive jobs publish directly into `output_dir`.
pub fn plan_uploads(kind: WorkflowKind, output_dir: &str, timestamp: &str) -> Vec<UploadSpec> {
    OutputSlot::ALL
        .iter()
        .map(|&slot| {
            let file_name = format!("{}.{}", timestamp, slot.extension());
            let key = match kind {
                WorkflowKind::Basic | WorkflowKind::Scored => {
                    object_key(&[output_dir, slot.as_str(), &file_name])
                }
                WorkflowKind::Reactive => object_key(&[output_dir, &file_name]),
            };
            UploadSpec { slot, file_name, key }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    Succeeded,
    /// The store rejected or errored on the upload.
    Failed { reason: String },
    /// The local file was absent before the upload was attempted.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub slot: OutputSlot,
    pub role: ArtifactRole,
    pub file_name: String,
    pub key: String,
    #[serde(flatten)]
    pub outcome: UploadOutcome,
}

impl UploadResult {
    pub fn succeeded(&self) -> bool {
        self.outcome == UploadOutcome::Succeeded
    }
}

/// Upload every planned output, recording one result per output.
pub async fn publish(
    store: &dyn ArtifactStore,
    artifacts: &Artifacts,
    plan: &[UploadSpec],
) -> Vec<UploadResult> {
    let mut results = Vec::with_capacity(plan.len());

    for spec in plan {
        let role = spec.slot.role();
        let outcome = match artifacts.get(role).filter(|a| a.exists()) {
            None => {
                warn!(
                    slot = spec.slot.as_str(),
                    "File not found for {}; recording {} as missing",
                    role,
                    spec.file_name
                );
                UploadOutcome::Missing
            }
            Some(artifact) => match store.upload(&artifact.path, &spec.key).await {
                Ok(()) => {
                    info!("Uploaded {} to {}", role, spec.key);
                    UploadOutcome::Succeeded
                }
                Err(e) => {
                    warn!(slot = spec.slot.as_str(), "Upload of {} failed: {}", spec.key, e);
                    UploadOutcome::Failed { reason: e.to_string() }
                }
            },
        };

        results.push(UploadResult {
            slot: spec.slot,
            role,
            file_name: spec.file_name.clone(),
            key: spec.key.clone(),
            outcome,
        });
    }

    let ok = results.iter().filter(|r| r.succeeded()).count();
    info!("Upload summary: {} succeeded, {} failed", ok, results.len() - ok);
    results
}
