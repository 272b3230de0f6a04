use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Which of the two compilation passes is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Non-interactive and halting on the first error.
    First,
    /// Non-interactive, running to completion to resolve references.
    Second,
}

impl Pass {
    pub fn as_str(self) -> &'static str {
        match self {
            Pass::First => "first",
            Pass::Second => "second",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolchainInvocation {
    pub work_dir: PathBuf,
    pub source_file: String,
    pub pass: Pass,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolchainOutcome {
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ToolchainOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("toolchain executable unavailable: {0}")]
    NotFound(#[source] io::Error),
    #[error("failed to run toolchain: {0}")]
    Spawn(#[source] io::Error),
}

/// Runs the external typesetting executable once.
#[async_trait]
pub trait Toolchain: Send + Sync {
    async fn run(&self, invocation: &ToolchainInvocation)
    -> Result<ToolchainOutcome, ToolchainError>;
}
