//! Docking endpoints: one per workflow variant.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use dockflow_common::{
    CovalentResidue, DockflowError, InputRefs, Job, ReactiveGroups, Workflow, WorkflowKind,
};
use dockflow_pipeline::JobReport;

use crate::error::ApiError;
use crate::state::SharedState;

// ── Request ───────────────────────────────────────────────────────────────────

/// JSON body accepted by all three endpoints.
///
/// `candidate`, `target` and `outputDir` are alternative names; when both
/// spellings are sent the primary one wins.
#[derive(Debug, Default, Deserialize)]
pub struct DockingRequest {
    pub ligand: Option<String>,
    pub candidate: Option<String>,
    pub receptor: Option<String>,
    pub target: Option<String>,
    #[serde(rename = "box")]
    pub box_ref: Option<String>,
    pub dirname: Option<String>,
    #[serde(rename = "outputDir")]
    pub output_dir: Option<String>,
    pub reactive_groups: Option<Vec<String>>,
    pub reactive_residues: Option<String>,
}

impl DockingRequest {
    /// Parse a raw body; an empty body or JSON `null` counts as no payload.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(no_payload());
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Malformed JSON payload: {}", e)))?;
        if value.is_null() {
            return Err(no_payload());
        }
        serde_json::from_value(value).map_err(|e| ApiError::BadRequest(format!("Invalid payload: {}", e)))
    }

    fn inputs(&self) -> dockflow_common::Result<InputRefs> {
        Ok(InputRefs {
            ligand: required(first_present(&[&self.ligand, &self.candidate]), "ligand")?,
            receptor: required(first_present(&[&self.receptor, &self.target]), "receptor")?,
            box_ref: required(first_present(&[&self.box_ref]), "box")?,
        })
    }

    fn output_dir(&self) -> Option<&str> {
        first_present(&[&self.dirname, &self.output_dir])
    }

    /// Build the job for `kind`. Basic and scored jobs fall back to
    /// `default_output_dir`; reactive jobs must name their output directory.
    pub fn into_job(self, kind: WorkflowKind, default_output_dir: &str) -> dockflow_common::Result<Job> {
        let inputs = self.inputs()?;
        match kind {
            WorkflowKind::Basic | WorkflowKind::Scored => {
                let workflow = if kind == WorkflowKind::Basic { Workflow::Basic } else { Workflow::Scored };
                let output_dir = self.output_dir().unwrap_or(default_output_dir).to_string();
                Job::new(workflow, inputs, output_dir)
            }
            WorkflowKind::Reactive => {
                let output_dir = required(self.output_dir(), "outputDir")?;
                let residue = match self.reactive_residues.as_deref().map(str::trim) {
                    None | Some("") => None,
                    Some(text) => Some(text.parse::<CovalentResidue>()?),
                };
                let groups = ReactiveGroups::from_list(self.reactive_groups.unwrap_or_default())?;
                Job::new(Workflow::Reactive { groups, residue }, inputs, output_dir)
            }
        }
    }
}

/// First spelling holding a non-blank value, trimmed.
fn first_present<'a>(spellings: &[&'a Option<String>]) -> Option<&'a str> {
    spellings
        .iter()
        .copied()
        .filter_map(|v| v.as_deref().map(str::trim))
        .find(|v| !v.is_empty())
}

fn required(value: Option<&str>, name: &str) -> dockflow_common::Result<String> {
    value
        .map(str::to_string)
        .ok_or_else(|| DockflowError::InvalidParameter(format!("Missing required parameter: {}", name)))
}

fn no_payload() -> ApiError {
    ApiError::BadRequest("No JSON payload provided".to_string())
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Run a job to completion in its own task so a dropped connection does not
/// cut a tool invocation short.
async fn dispatch(state: &SharedState, kind: WorkflowKind, body: &[u8]) -> Result<JobReport, ApiError> {
    let request = DockingRequest::from_body(body)?;
    let job = request.into_job(kind, &state.pipeline.settings().default_output_dir)?;
    info!(job_id = %job.id, workflow = %kind, ligand = %job.inputs.ligand, "Docking request accepted");

    let pipeline = state.pipeline.clone();
    let report = tokio::spawn(async move { pipeline.run(&job).await })
        .await
        .map_err(|e| ApiError::Internal(format!("Docking task aborted: {}", e)))??;
    Ok(report)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /basic_docking
pub async fn basic_docking_info() -> Json<Value> {
    Json(json!({ "message": "Basic docking endpoint" }))
}

/// POST /basic_docking
pub async fn basic_docking(State(state): State<SharedState>, body: Bytes) -> Result<Response, ApiError> {
    let report = dispatch(&state, WorkflowKind::Basic, &body).await?;
    Ok(Json(report).into_response())
}

/// GET /scored_docking
pub async fn scored_docking_info() -> Json<Value> {
    Json(json!({ "message": "Scored docking endpoint" }))
}

/// POST /scored_docking
pub async fn scored_docking(State(state): State<SharedState>, body: Bytes) -> Result<Response, ApiError> {
    let report = dispatch(&state, WorkflowKind::Scored, &body).await?;
    Ok(Json(report).into_response())
}

/// GET /reactive_docking
pub async fn reactive_docking_info() -> Json<Value> {
    Json(json!({ "message": "Reactive docking endpoint" }))
}

/// POST /reactive_docking
pub async fn reactive_docking(State(state): State<SharedState>, body: Bytes) -> Result<Response, ApiError> {
    let report = dispatch(&state, WorkflowKind::Reactive, &body).await?;
    let body = json!({
        "message": "Reactive docking completed successfully",
        "result": report,
    });
    Ok(Json(body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_DIR: &str = "adapter_autodock/basic_docking/";

    #[test]
    fn test_empty_and_null_bodies_have_no_payload() {
        let bodies: [&[u8]; 3] = [b"", b"  \n", b"null"];
        for body in bodies {
            match DockingRequest::from_body(body) {
                Err(ApiError::BadRequest(m)) => assert_eq!(m, "No JSON payload provided"),
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn test_aliases_are_accepted() {
        let req = DockingRequest::from_body(
            br#"{"candidate": "l.smi", "target": "r.pdb", "box": "b.pdb", "outputDir": "out/"}"#,
        )
        .unwrap();
        let job = req.into_job(WorkflowKind::Basic, DEFAULT_DIR).unwrap();
        assert_eq!(job.inputs.ligand, "l.smi");
        assert_eq!(job.inputs.receptor, "r.pdb");
        assert_eq!(job.output_dir, "out/");
    }

    #[test]
    fn test_both_spellings_prefer_the_primary_name() {
        let req = DockingRequest::from_body(
            br#"{"ligand": "l.smi", "candidate": "c.smi", "receptor": " ", "target": "t.pdb",
                 "box": "b.pdb", "dirname": "d/", "outputDir": "o/"}"#,
        )
        .unwrap();
        let job = req.into_job(WorkflowKind::Basic, DEFAULT_DIR).unwrap();
        assert_eq!(job.inputs.ligand, "l.smi");
        assert_eq!(job.inputs.receptor, "t.pdb");
        assert_eq!(job.output_dir, "d/");
    }

    #[test]
    fn test_basic_output_dir_defaults() {
        let req = DockingRequest::from_body(br#"{"ligand": "l", "receptor": "r", "box": "b"}"#).unwrap();
        assert_eq!(req.into_job(WorkflowKind::Basic, DEFAULT_DIR).unwrap().output_dir, DEFAULT_DIR);
    }

    #[test]
    fn test_missing_input_is_caller_error() {
        let req = DockingRequest::from_body(br#"{"ligand": "l", "receptor": "r"}"#).unwrap();
        let err = req.into_job(WorkflowKind::Scored, DEFAULT_DIR).unwrap_err();
        assert!(err.is_caller_error());
        assert!(err.to_string().contains("box"));
    }

    #[test]
    fn test_reactive_requires_output_dir() {
        let req = DockingRequest::from_body(br#"{"ligand": "l", "receptor": "r", "box": "b"}"#).unwrap();
        let err = req.into_job(WorkflowKind::Reactive, DEFAULT_DIR).unwrap_err();
        assert!(err.to_string().contains("outputDir"));
    }

    #[test]
    fn test_reactive_parameters_are_parsed() {
        let req = DockingRequest::from_body(
            br#"{"ligand": "l", "receptor": "r", "box": "b", "outputDir": "o",
                 "reactive_groups": ["acrylamide"], "reactive_residues": "CYS87"}"#,
        )
        .unwrap();
        let job = req.into_job(WorkflowKind::Reactive, DEFAULT_DIR).unwrap();
        match job.workflow {
            Workflow::Reactive { groups, residue } => {
                assert_eq!(groups.unwrap().to_arg(), "acrylamide");
                assert_eq!(residue.unwrap().to_string(), "CYS87:SG:2.0");
            }
            other => panic!("unexpected workflow: {other:?}"),
        }
    }

    #[test]
    fn test_qualified_residue_is_forwarded_verbatim() {
        let req = DockingRequest::from_body(
            br#"{"ligand": "l", "receptor": "r", "box": "b", "outputDir": "o", "reactive_residues": "LYS12:NZ"}"#,
        )
        .unwrap();
        match req.into_job(WorkflowKind::Reactive, DEFAULT_DIR).unwrap().workflow {
            Workflow::Reactive { residue, .. } => assert_eq!(residue.unwrap().as_str(), "LYS12:NZ"),
            other => panic!("unexpected workflow: {other:?}"),
        }
    }
}
