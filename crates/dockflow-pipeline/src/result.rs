//! Job results and the response shapes of each workflow.
//!
//! The three workflows answer with different JSON contracts; they are kept as
//! separate report types rather than one merged shape.

use serde::Serialize;
use uuid::Uuid;

use dockflow_common::{DockflowError, Result, WorkflowKind};

use crate::publish::{OutputSlot, UploadOutcome, UploadResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Every upload succeeded.
    Success,
    /// At least one upload failed or was missing.
    PartialSuccess,
}

/// Aggregate of a finished job: per-output upload records plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub workflow: WorkflowKind,
    /// `YYYYMMDD_HHMMSS` stamp shared by all published names.
    pub timestamp: String,
    pub uploads: Vec<UploadResult>,
    pub score: Option<f64>,
}

impl JobResult {
    pub fn status(&self) -> JobStatus {
        if self.uploads.iter().all(UploadResult::succeeded) {
            JobStatus::Success
        } else {
            JobStatus::PartialSuccess
        }
    }

    pub fn uploaded_files(&self) -> Vec<String> {
        self.uploads
            .iter()
            .filter(|u| u.succeeded())
            .map(|u| u.file_name.clone())
            .collect()
    }

    /// Names of failed and missing uploads.
    pub fn failed_files(&self) -> Vec<String> {
        self.uploads
            .iter()
            .filter(|u| !u.succeeded())
            .map(|u| u.file_name.clone())
            .collect()
    }

    pub fn missing_files(&self) -> Vec<String> {
        self.uploads
            .iter()
            .filter(|u| u.outcome == UploadOutcome::Missing)
            .map(|u| u.file_name.clone())
            .collect()
    }

    fn upload(&self, slot: OutputSlot) -> Option<&UploadResult> {
        self.uploads.iter().find(|u| u.slot == slot && u.succeeded())
    }

    /// Convert into the response shape of the job's workflow.
    ///
    /// The scored workflow does not tolerate failed uploads and turns them
    /// into an `Upload` error.
    pub fn into_report(self) -> Result<JobReport> {
        match self.workflow {
            WorkflowKind::Basic => Ok(JobReport::Basic(BasicReport::from(&self))),
            WorkflowKind::Reactive => Ok(JobReport::Reactive(ReactiveReport::from(&self))),
            WorkflowKind::Scored => ScoredReport::try_from(&self).map(JobReport::Scored),
        }
    }
}

// ── Basic ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicReport {
    pub outputs: BasicOutputs,
    pub metadata: BasicMetadata,
}

/// Published file name per output; `None` when that upload did not succeed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicOutputs {
    pub ligand_docking: Option<String>,
    pub ligand_pose: Option<String>,
    pub receptor_visualization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicMetadata {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<String>,
}

impl From<&JobResult> for BasicReport {
    fn from(result: &JobResult) -> Self {
        let name = |slot| result.upload(slot).map(|u| u.file_name.clone());
        Self {
            outputs: BasicOutputs {
                ligand_docking: name(OutputSlot::LigandDocking),
                ligand_pose: name(OutputSlot::LigandPose),
                receptor_visualization: name(OutputSlot::ReceptorVisualization),
            },
            metadata: BasicMetadata {
                status: result.status(),
                failed_files: result.failed_files(),
            },
        }
    }
}

// ── Scored ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredReport {
    pub outputs: ScoredOutputs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredOutputs {
    pub ligand_docking: ScoredDocking,
    pub ligand_pose: PublishedPath,
    pub receptor_pose: PublishedPath,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocking {
    pub path: String,
    pub metadata: ScoreMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreMetadata {
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedPath {
    pub path: String,
}

impl TryFrom<&JobResult> for ScoredReport {
    type Error = DockflowError;

    fn try_from(result: &JobResult) -> Result<Self> {
        let failed_files = result.failed_files();
        if !failed_files.is_empty() {
            return Err(DockflowError::Upload { failed_files });
        }

        let path = |slot: OutputSlot| -> Result<String> {
            result
                .upload(slot)
                .map(|u| u.key.clone())
                .ok_or_else(|| DockflowError::Upload {
                    failed_files: vec![slot.as_str().to_string()],
                })
        };

        Ok(Self {
            outputs: ScoredOutputs {
                ligand_docking: ScoredDocking {
                    path: path(OutputSlot::LigandDocking)?,
                    metadata: ScoreMetadata {
                        score: result.score.unwrap_or(crate::score::DEFAULT_SCORE),
                    },
                },
                ligand_pose: PublishedPath {
                    path: path(OutputSlot::LigandPose)?,
                },
                receptor_pose: PublishedPath {
                    path: path(OutputSlot::ReceptorVisualization)?,
                },
            },
        })
    }
}

// ── Reactive ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactiveReport {
    pub status: JobStatus,
    pub uploaded_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<String>,
}

impl From<&JobResult> for ReactiveReport {
    fn from(result: &JobResult) -> Self {
        Self {
            status: result.status(),
            uploaded_files: result.uploaded_files(),
            failed_files: result.failed_files(),
        }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Workflow-specific response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobReport {
    Basic(BasicReport),
    Scored(ScoredReport),
    Reactive(ReactiveReport),
}

impl JobReport {
    pub fn status(&self) -> JobStatus {
        match self {
            JobReport::Basic(r) => r.metadata.status,
            JobReport::Scored(_) => JobStatus::Success,
            JobReport::Reactive(r) => r.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactRole;
    use serde_json::json;

    fn upload(slot: OutputSlot, outcome: UploadOutcome) -> UploadResult {
        let file_name = format!("20240501_101500.{}", slot.extension());
        UploadResult {
            slot,
            role: slot.role(),
            key: format!("runs/{}/{}", slot.as_str(), file_name),
            file_name,
            outcome,
        }
    }

    fn result(workflow: WorkflowKind, outcomes: [UploadOutcome; 3]) -> JobResult {
        let uploads = OutputSlot::ALL
            .iter()
            .zip(outcomes)
            .map(|(slot, outcome)| upload(*slot, outcome))
            .collect();
        JobResult {
            job_id: Uuid::new_v4(),
            workflow,
            timestamp: "20240501_101500".to_string(),
            uploads,
            score: Some(-7.5),
        }
    }

    fn failed() -> UploadOutcome {
        UploadOutcome::Failed { reason: "503".to_string() }
    }

    #[test]
    fn test_status_aggregation() {
        use UploadOutcome::*;
        assert_eq!(result(WorkflowKind::Basic, [Succeeded, Succeeded, Succeeded]).status(), JobStatus::Success);
        assert_eq!(result(WorkflowKind::Basic, [Succeeded, Missing, Succeeded]).status(), JobStatus::PartialSuccess);
        assert_eq!(result(WorkflowKind::Basic, [failed(), Missing, failed()]).status(), JobStatus::PartialSuccess);
    }

    #[test]
    fn test_basic_success_shape() {
        use UploadOutcome::*;
        let report = result(WorkflowKind::Basic, [Succeeded, Succeeded, Succeeded]).into_report().unwrap();
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "outputs": {
                    "ligand_docking": "20240501_101500.pdbqt",
                    "ligand_pose": "20240501_101500.sdf",
                    "receptor_visualization": "20240501_101500.pdb"
                },
                "metadata": { "status": "success" }
            })
        );
    }

    #[test]
    fn test_basic_partial_shape() {
        use UploadOutcome::*;
        let report = result(WorkflowKind::Basic, [Succeeded, Succeeded, failed()]).into_report().unwrap();
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "outputs": {
                    "ligand_docking": "20240501_101500.pdbqt",
                    "ligand_pose": "20240501_101500.sdf",
                    "receptor_visualization": null
                },
                "metadata": {
                    "status": "partial_success",
                    "failed_files": ["20240501_101500.pdb"]
                }
            })
        );
    }

    #[test]
    fn test_scored_shape_carries_score_and_paths() {
        use UploadOutcome::*;
        let report = result(WorkflowKind::Scored, [Succeeded, Succeeded, Succeeded]).into_report().unwrap();
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "outputs": {
                    "ligand_docking": {
                        "path": "runs/ligand_docking/20240501_101500.pdbqt",
                        "metadata": { "score": -7.5 }
                    },
                    "ligand_pose": { "path": "runs/ligand_pose/20240501_101500.sdf" },
                    "receptor_pose": { "path": "runs/receptor_visualization/20240501_101500.pdb" }
                }
            })
        );
    }

    #[test]
    fn test_scored_raises_on_any_failed_upload() {
        use UploadOutcome::*;
        let err = result(WorkflowKind::Scored, [Succeeded, Missing, Succeeded]).into_report().unwrap_err();
        match err {
            DockflowError::Upload { failed_files } => assert_eq!(failed_files, vec!["20240501_101500.sdf"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reactive_shape() {
        use UploadOutcome::*;
        let report = result(WorkflowKind::Reactive, [Succeeded, failed(), Succeeded]).into_report().unwrap();
        assert_eq!(report.status(), JobStatus::PartialSuccess);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "status": "partial_success",
                "uploaded_files": ["20240501_101500.pdbqt", "20240501_101500.pdb"],
                "failed_files": ["20240501_101500.sdf"]
            })
        );
    }

    #[test]
    fn test_missing_files_listed_separately() {
        use UploadOutcome::*;
        let r = result(WorkflowKind::Basic, [Succeeded, Missing, failed()]);
        assert_eq!(r.missing_files(), vec!["20240501_101500.sdf"]);
        assert_eq!(r.failed_files().len(), 2);
        assert_eq!(r.uploads[2].role, ArtifactRole::ReceptorHydrogenated);
    }
}
