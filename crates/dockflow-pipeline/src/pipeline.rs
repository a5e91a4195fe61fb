//! End-to-end docking job orchestration.
//!
//! For a single job:
//!   1. Allocate and reset the job's scratch directory
//!   2. Fetch the ligand, receptor and box inputs from the artifact store
//!   3. Run the workflow's stages in order, checking each stage's inputs first
//!   4. Publish the three outputs under a shared timestamp
//!   5. Aggregate upload outcomes into the workflow's report
//!   6. Emit progress events via broadcast channel
//!
//! Stage failures abort the job; upload failures are recorded and aggregated.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use dockflow_common::{DockflowError, Job, Result};
use dockflow_config::{Config, PipelineConfig, WorkspaceConfig};

use crate::artifact::{Artifact, ArtifactRole, Artifacts};
use crate::process::CommandRunner;
use crate::publish::{plan_uploads, publish, timestamp_now};
use crate::result::{JobReport, JobResult};
use crate::stages::{stages_for, StageContext};
use crate::storage::ArtifactStore;
use crate::toolchain::Toolchain;
use crate::workspace::Workspace;

// ── Progress events ───────────────────────────────────────────────────────────

/// Progress event emitted during a job (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineProgress {
    pub job_id: Uuid,
    pub workflow: String,
    pub stage: String,
    pub message: String,
    pub error: Option<String>,
}

impl PipelineProgress {
    fn new(job: &Job, stage: &str, message: impl Into<String>) -> Self {
        Self {
            job_id: job.id,
            workflow: job.kind().as_str().to_string(),
            stage: stage.to_string(),
            message: message.into(),
            error: None,
        }
    }

    fn failed(job: &Job, stage: &str, error: &DockflowError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(job, stage, "failed")
        }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct DockingPipeline {
    runner: Arc<dyn CommandRunner>,
    store: Arc<dyn ArtifactStore>,
    toolchain: Toolchain,
    settings: PipelineConfig,
    workspace: WorkspaceConfig,
    progress_tx: Option<broadcast::Sender<PipelineProgress>>,
}

impl DockingPipeline {
    pub fn new(config: &Config, runner: Arc<dyn CommandRunner>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            runner,
            store,
            toolchain: Toolchain::new(config.tools.clone()),
            settings: config.pipeline.clone(),
            workspace: config.workspace.clone(),
            progress_tx: None,
        }
    }

    /// Send progress events to `tx` for every job this pipeline runs.
    pub fn with_progress(mut self, tx: broadcast::Sender<PipelineProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn settings(&self) -> &PipelineConfig {
        &self.settings
    }

    /// Run a job and shape its outcome for the job's workflow.
    ///
    /// `complete` is only announced once the report exists, since the scored
    /// workflow can still reject the job at this point.
    pub async fn run(&self, job: &Job) -> Result<JobReport> {
        match self.execute(job).await?.into_report() {
            Ok(report) => {
                self.emit(PipelineProgress::new(job, "complete", format!("{:?}", report.status())));
                Ok(report)
            }
            Err(e) => {
                warn!(job_id = %job.id, "Docking job rejected: {}", e);
                self.emit(PipelineProgress::failed(job, "publish", &e));
                Err(e)
            }
        }
    }

    /// Run a job to completion and return its aggregated result.
    ///
    /// The scratch directory is removed afterwards, whichever way the job
    /// ended, unless `workspace.keep_scratch` is set.
    #[instrument(skip(self, job), fields(job_id = %job.id, workflow = %job.kind()))]
    pub async fn execute(&self, job: &Job) -> Result<JobResult> {
        let t0 = Instant::now();
        info!(output_dir = %job.output_dir, "Starting docking job");
        self.emit(PipelineProgress::new(job, "start", "job accepted"));

        let workspace = Workspace::allocate(&self.workspace.scratch_root, job.id).await?;
        let outcome = self.run_in(&workspace, job).await;

        if self.workspace.keep_scratch {
            info!("Keeping scratch directory {:?}", workspace.root());
        } else if let Err(e) = workspace.dispose().await {
            warn!("Failed to remove scratch directory: {}", e);
        }

        match &outcome {
            Ok(result) => {
                let missing = result.missing_files();
                if !missing.is_empty() {
                    warn!(?missing, "Outputs never produced by the toolchain");
                }
                info!(
                    status = ?result.status(),
                    duration_ms = t0.elapsed().as_millis() as u64,
                    "Docking job complete"
                );
            }
            Err(e) => warn!(duration_ms = t0.elapsed().as_millis() as u64, "Docking job failed: {}", e),
        }
        outcome
    }

    async fn run_in(&self, workspace: &Workspace, job: &Job) -> Result<JobResult> {
        workspace.reset().await?;

        let mut artifacts = Artifacts::new();
        self.fetch_inputs(workspace, job, &mut artifacts).await?;

        for stage in stages_for(&job.workflow) {
            let name = stage.name();
            for &role in stage.inputs() {
                let present = artifacts.get(role).map(Artifact::exists).unwrap_or(false);
                if !present {
                    let err = DockflowError::MissingInput {
                        stage: name.to_string(),
                        role: role.to_string(),
                        path: artifacts
                            .path(role)
                            .map(|p| p.to_path_buf())
                            .unwrap_or_else(|| workspace.path(role)),
                    };
                    self.emit(PipelineProgress::failed(job, name, &err));
                    return Err(err);
                }
            }

            self.emit(PipelineProgress::new(job, name, "running"));
            let started = Instant::now();
            let produced = {
                let ctx = StageContext {
                    job_id: job.id,
                    workspace,
                    artifacts: &artifacts,
                    runner: self.runner.as_ref(),
                    toolchain: &self.toolchain,
                    settings: &self.settings,
                };
                stage.run(&ctx).instrument(info_span!("stage", name)).await
            };
            let produced = match produced {
                Ok(produced) => produced,
                Err(e) => {
                    warn!(stage = name, "Stage failed: {}", e);
                    self.emit(PipelineProgress::failed(job, name, &e));
                    return Err(e);
                }
            };
            info!(stage = name, elapsed_ms = started.elapsed().as_millis() as u64, "Stage finished");

            for artifact in produced {
                debug!(stage = name, role = %artifact.role, path = ?artifact.path, "Artifact registered");
                artifacts.register(artifact);
            }
        }

        let timestamp = timestamp_now();
        let plan = plan_uploads(job.kind(), &job.output_dir, &timestamp);
        self.emit(PipelineProgress::new(job, "publish", format!("uploading {} outputs", plan.len())));
        let uploads = publish(self.store.as_ref(), &artifacts, &plan).await;

        let score = artifacts.get(ArtifactRole::DockingResult).and_then(|a| a.score);
        Ok(JobResult {
            job_id: job.id,
            workflow: job.kind(),
            timestamp,
            uploads,
            score,
        })
    }

    async fn fetch_inputs(&self, workspace: &Workspace, job: &Job, artifacts: &mut Artifacts) -> Result<()> {
        self.emit(PipelineProgress::new(job, "fetch", "downloading inputs"));

        let inputs = [
            (ArtifactRole::LigandInput, &job.inputs.ligand),
            (ArtifactRole::ReceptorInput, &job.inputs.receptor),
            (ArtifactRole::BoxInput, &job.inputs.box_ref),
        ];
        for (role, reference) in inputs {
            let dest = workspace.input_path(role, reference);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await?;
            }
            if let Err(e) = self.store.download(reference, &dest).await {
                let err = DockflowError::Fetch {
                    reference: reference.clone(),
                    reason: e.to_string(),
                };
                self.emit(PipelineProgress::failed(job, "fetch", &err));
                return Err(err);
            }
            debug!(role = %role, reference = %reference, "Input fetched");
            artifacts.register(Artifact::new(role, dest));
        }
        Ok(())
    }

    fn emit(&self, event: PipelineProgress) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.send(event);
        }
    }
}
