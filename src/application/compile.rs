//! The job runner: one request, one workspace, two toolchain passes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::application::toolchain::{Pass, Toolchain, ToolchainInvocation};
use crate::domain::error::DomainError;
use crate::domain::jobs::{CompileSource, Job, JobId, JobState, SOURCE_FILE_NAME};
use crate::infra::telemetry::{METRIC_COMPILE_JOBS_TOTAL, METRIC_COMPILE_MS};
use crate::infra::workspace::{CleanupOutcome, WorkspaceError, WorkspaceStore};

#[derive(Debug, Error)]
pub enum CompileFailure {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("PDF was not generated")]
    MissingArtifact,
    #[error(transparent)]
    Lifecycle(#[from] DomainError),
    #[error("compilation task stopped unexpectedly")]
    Interrupted(#[source] JoinError),
}

#[derive(Debug, Error)]
#[error("compilation job {job_id} failed")]
pub struct CompileError {
    pub job_id: JobId,
    #[source]
    pub failure: CompileFailure,
}

impl CompileError {
    /// Message safe to return to callers; details stay in server logs.
    pub fn public_message(&self) -> &'static str {
        match &self.failure {
            CompileFailure::MissingArtifact => "PDF was not generated",
            CompileFailure::Workspace(WorkspaceError::ReadArtifact { .. }) => {
                "Generated PDF could not be read"
            }
            CompileFailure::Workspace(_) => "Compilation workspace could not be prepared",
            CompileFailure::Lifecycle(_) => "Unexpected job state",
            CompileFailure::Interrupted(_) => "Compilation was interrupted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub job_id: JobId,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct CompileService {
    workspaces: Arc<WorkspaceStore>,
    toolchain: Arc<dyn Toolchain>,
    timeout: Duration,
}

impl CompileService {
    pub fn new(
        workspaces: Arc<WorkspaceStore>,
        toolchain: Arc<dyn Toolchain>,
        timeout: Duration,
    ) -> Self {
        Self {
            workspaces,
            toolchain,
            timeout,
        }
    }

    pub fn workspaces(&self) -> &Arc<WorkspaceStore> {
        &self.workspaces
    }

    /// Compile `source` in a fresh workspace. The workspace is removed before
    /// returning, whatever the outcome.
    ///
    /// The job runs on its own task: dropping the returned future (for example
    /// when the client disconnects) does not stop the job or skip its cleanup.
    pub async fn compile(&self, source: &CompileSource) -> Result<CompiledArtifact, CompileError> {
        let job = self.workspaces.new_job();
        let job_id = job.id();
        let service = self.clone();
        let source = source.clone();

        tokio::spawn(async move { service.run(job, &source).await })
            .await
            .map_err(|err| {
                error!(
                    target = "texpress::compile",
                    job_id = %job_id,
                    error = %err,
                    "Job task aborted"
                );
                counter!(METRIC_COMPILE_JOBS_TOTAL, "result" => "failed").increment(1);
                CompileError {
                    job_id,
                    failure: CompileFailure::Interrupted(err),
                }
            })?
    }

    async fn run(
        &self,
        mut job: Job,
        source: &CompileSource,
    ) -> Result<CompiledArtifact, CompileError> {
        let started_at = Instant::now();
        let job_id = job.id();

        info!(
            target = "texpress::compile",
            job_id = %job_id,
            source_bytes = source.len(),
            "Starting job"
        );

        let result = match self.execute(&mut job, source).await {
            Ok(bytes) => job
                .transition(JobState::Succeeded)
                .map(|()| bytes)
                .map_err(CompileFailure::from),
            Err(failure) => Err(failure),
        };

        match result {
            Ok(bytes) => {
                self.cleanup(&job).await;
                counter!(METRIC_COMPILE_JOBS_TOTAL, "result" => "succeeded").increment(1);
                histogram!(METRIC_COMPILE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
                info!(
                    target = "texpress::compile",
                    job_id = %job_id,
                    pdf_bytes = bytes.len(),
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "Job completed"
                );
                Ok(CompiledArtifact { job_id, bytes })
            }
            Err(failure) => {
                if let Err(err) = job.transition(JobState::Failed) {
                    warn!(
                        target = "texpress::compile",
                        job_id = %job_id,
                        error = %err,
                        "Job state not marked failed"
                    );
                }

                error!(
                    target = "texpress::compile",
                    job_id = %job_id,
                    error = %failure,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "Job failed"
                );
                if let Some(excerpt) = self.workspaces.read_log_excerpt(&job).await
                    && !excerpt.is_empty()
                {
                    error!(
                        target = "texpress::compile",
                        job_id = %job_id,
                        latex_errors = %excerpt.joined(),
                        "LaTeX errors"
                    );
                }

                self.cleanup(&job).await;
                counter!(METRIC_COMPILE_JOBS_TOTAL, "result" => "failed").increment(1);
                histogram!(METRIC_COMPILE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
                Err(CompileError { job_id, failure })
            }
        }
    }

    async fn execute(&self, job: &mut Job, source: &CompileSource) -> Result<Bytes, CompileFailure> {
        self.workspaces.create(job).await?;
        job.transition(JobState::Running)?;
        self.workspaces.write_source(job, source.as_str()).await?;

        // Reference resolution routinely fails the first pass; only the
        // artifact check below decides the outcome.
        self.run_pass(job, Pass::First).await;
        self.run_pass(job, Pass::Second).await;

        if !self.workspaces.artifact_exists(job).await {
            return Err(CompileFailure::MissingArtifact);
        }

        Ok(self.workspaces.read_artifact(job).await?)
    }

    async fn run_pass(&self, job: &Job, pass: Pass) {
        let invocation = ToolchainInvocation {
            work_dir: job.workspace().to_path_buf(),
            source_file: SOURCE_FILE_NAME.to_string(),
            pass,
            timeout: self.timeout,
        };

        match self.toolchain.run(&invocation).await {
            Ok(outcome) if outcome.success() => {}
            Ok(outcome) if pass == Pass::First => {
                info!(
                    target = "texpress::compile",
                    job_id = %job.id(),
                    exit_code = outcome.exit_code.map(i64::from).unwrap_or(-1),
                    timed_out = outcome.timed_out,
                    "First pass had warnings, continuing"
                );
            }
            Ok(outcome) => {
                warn!(
                    target = "texpress::compile",
                    job_id = %job.id(),
                    pass = pass.as_str(),
                    exit_code = outcome.exit_code.map(i64::from).unwrap_or(-1),
                    timed_out = outcome.timed_out,
                    "Toolchain pass did not exit cleanly"
                );
            }
            Err(err) => {
                warn!(
                    target = "texpress::compile",
                    job_id = %job.id(),
                    pass = pass.as_str(),
                    error = %err,
                    "Toolchain pass could not run"
                );
            }
        }
    }

    async fn cleanup(&self, job: &Job) {
        match self.workspaces.remove(job).await {
            CleanupOutcome::Removed | CleanupOutcome::AlreadyAbsent => {}
            CleanupOutcome::Failed(err) => {
                error!(
                    target = "texpress::compile",
                    job_id = %job.id(),
                    path = %job.workspace().display(),
                    error = %err,
                    "Cleanup failed"
                );
            }
        }
    }
}
