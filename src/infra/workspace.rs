//! Filesystem-backed per-job workspaces under a shared jobs root.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::domain::diagnostics::LogExcerpt;
use crate::domain::jobs::Job;

/// Errors that are fatal to a job.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace `{path}`")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write source file `{path}`")]
    WriteSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read artifact `{path}`")]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of a best-effort workspace removal. Never propagated as an error.
#[derive(Debug)]
pub enum CleanupOutcome {
    Removed,
    AlreadyAbsent,
    Failed(io::Error),
}

/// Summary of one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct WorkspaceStore {
    root: PathBuf,
}

impl WorkspaceStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a job with a fresh identifier. Nothing touches the disk yet.
    pub fn new_job(&self) -> Job {
        Job::new(&self.root)
    }

    /// Create the job's workspace directory. Fails if it already exists.
    pub async fn create(&self, job: &Job) -> Result<(), WorkspaceError> {
        let path = job.workspace();
        let create_err = |source| WorkspaceError::Create {
            path: path.to_path_buf(),
            source,
        };

        // The root may have been removed by an operator since startup.
        fs::create_dir_all(&self.root).await.map_err(create_err)?;
        fs::create_dir(path).await.map_err(create_err)
    }

    pub async fn write_source(&self, job: &Job, source: &str) -> Result<(), WorkspaceError> {
        let path = job.source_path();
        fs::write(&path, source.as_bytes())
            .await
            .map_err(|source| WorkspaceError::WriteSource { path, source })
    }

    pub async fn artifact_exists(&self, job: &Job) -> bool {
        fs::try_exists(job.artifact_path()).await.unwrap_or(false)
    }

    pub async fn read_artifact(&self, job: &Job) -> Result<Bytes, WorkspaceError> {
        let path = job.artifact_path();
        match fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(source) => Err(WorkspaceError::ReadArtifact { path, source }),
        }
    }

    /// Best effort: any failure to read the log yields `None`.
    pub async fn read_log_excerpt(&self, job: &Job) -> Option<LogExcerpt> {
        let raw = fs::read(job.log_path()).await.ok()?;
        Some(LogExcerpt::from_log(&String::from_utf8_lossy(&raw)))
    }

    pub async fn remove(&self, job: &Job) -> CleanupOutcome {
        remove_entry(job.workspace()).await
    }

    /// Remove every entry directly under the root whose modification time is
    /// older than `retention` relative to `now`. Per-entry failures are skipped.
    pub async fn sweep_expired(&self, now: SystemTime, retention: Duration) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return report,
            Err(err) => {
                debug!(
                    target = "texpress::workspace",
                    root = %self.root.display(),
                    error = %err,
                    "Jobs root unreadable; skipping sweep"
                );
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                // A failed readdir leaves the stream position undefined and
                // tends to repeat; the next interval retries from scratch.
                Err(err) => {
                    warn!(
                        target = "texpress::workspace",
                        root = %self.root.display(),
                        error = %err,
                        "Failed to read next jobs root entry; stopping sweep early"
                    );
                    report.skipped += 1;
                    break;
                }
            };
            let path = entry.path();

            let modified = match entry.metadata().await.and_then(|meta| meta.modified()) {
                Ok(modified) => modified,
                Err(err) => {
                    debug!(
                        target = "texpress::workspace",
                        path = %path.display(),
                        error = %err,
                        "Failed to stat workspace entry"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            // Entries stamped in the future are treated as fresh.
            let expired = now
                .duration_since(modified)
                .map(|age| age > retention)
                .unwrap_or(false);
            if !expired {
                continue;
            }

            match remove_entry(&path).await {
                CleanupOutcome::Removed => {
                    report.removed += 1;
                    info!(
                        target = "texpress::workspace",
                        path = %path.display(),
                        "Cleaned up old job"
                    );
                }
                CleanupOutcome::AlreadyAbsent => {}
                CleanupOutcome::Failed(err) => {
                    debug!(
                        target = "texpress::workspace",
                        path = %path.display(),
                        error = %err,
                        "Failed to remove stale workspace"
                    );
                    report.skipped += 1;
                }
            }
        }

        report
    }
}

async fn remove_entry(path: &Path) -> CleanupOutcome {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return CleanupOutcome::AlreadyAbsent,
        Err(err) => return CleanupOutcome::Failed(err),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match result {
        Ok(()) => CleanupOutcome::Removed,
        Err(err) if err.kind() == ErrorKind::NotFound => CleanupOutcome::AlreadyAbsent,
        Err(err) => CleanupOutcome::Failed(err),
    }
}
