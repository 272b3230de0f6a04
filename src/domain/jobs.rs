//! Compilation jobs: identity, lifecycle and workspace layout.
//!
//! A job owns exactly one workspace directory, `<root>/<job id>`. Because job
//! identifiers are random v4 UUIDs, two live jobs never share a path.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use super::error::DomainError;

/// File the submitted source is written to inside a workspace.
pub const SOURCE_FILE_NAME: &str = "document.tex";
/// Artifact the toolchain is expected to produce.
pub const ARTIFACT_FILE_NAME: &str = "document.pdf";
/// Toolchain transcript scraped for diagnostics on failure.
pub const LOG_FILE_NAME: &str = "document.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for JobId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Created, JobState::Running)
                | (JobState::Created, JobState::Failed)
                | (JobState::Running, JobState::Succeeded)
                | (JobState::Running, JobState::Failed)
        )
    }
}

/// Source text accepted for compilation. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSource(String);

impl CompileSource {
    pub fn parse(raw: Option<String>) -> Result<Self, DomainError> {
        match raw {
            Some(text) if !text.is_empty() => Ok(Self(text)),
            _ => Err(DomainError::validation("No LaTeX content provided")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    workspace: PathBuf,
    state: JobState,
}

impl Job {
    /// Create a job with a fresh identifier whose workspace lives under `root`.
    pub fn new(root: &Path) -> Self {
        Self::with_id(JobId::new_random(), root)
    }

    pub fn with_id(id: JobId, root: &Path) -> Self {
        Self {
            id,
            workspace: root.join(id.to_string()),
            state: JobState::Created,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn source_path(&self) -> PathBuf {
        self.workspace.join(SOURCE_FILE_NAME)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.workspace.join(ARTIFACT_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.workspace.join(LOG_FILE_NAME)
    }

    pub fn transition(&mut self, next: JobState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "job {} cannot move from {} to {}",
                self.id,
                self.state.as_str(),
                next.as_str()
            )));
        }
        self.state = next;
        Ok(())
    }
}
