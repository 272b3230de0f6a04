//! `pdflatex`-compatible process runner.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::application::toolchain::{
    Pass, Toolchain, ToolchainError, ToolchainInvocation, ToolchainOutcome,
};

#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    program: PathBuf,
}

impl ProcessToolchain {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    fn pass_args(pass: Pass) -> &'static [&'static str] {
        match pass {
            Pass::First => &["-interaction=nonstopmode", "-halt-on-error"],
            Pass::Second => &["-interaction=nonstopmode"],
        }
    }
}

#[async_trait]
impl Toolchain for ProcessToolchain {
    async fn run(
        &self,
        invocation: &ToolchainInvocation,
    ) -> Result<ToolchainOutcome, ToolchainError> {
        let started_at = Instant::now();

        let mut command = Command::new(&self.program);
        command
            .args(Self::pass_args(invocation.pass))
            .arg(&invocation.source_file)
            .current_dir(&invocation.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        // Own group so a timeout also reaches helpers the toolchain forks.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|err| {
                warn!(
                    target = "texpress::toolchain",
                    program = %self.program.display(),
                    pass = invocation.pass.as_str(),
                    error = %err,
                    "Failed to spawn toolchain"
                );
                if err.kind() == ErrorKind::NotFound {
                    ToolchainError::NotFound(err)
                } else {
                    ToolchainError::Spawn(err)
                }
            })?;

        let outcome = match tokio::time::timeout(invocation.timeout, child.wait()).await {
            Ok(Ok(status)) => ToolchainOutcome {
                exit_code: status.code(),
                timed_out: false,
            },
            Ok(Err(err)) => return Err(ToolchainError::Spawn(err)),
            Err(_) => {
                kill_process_group(&child);
                if let Err(err) = child.kill().await {
                    warn!(
                        target = "texpress::toolchain",
                        pass = invocation.pass.as_str(),
                        error = %err,
                        "Failed to kill timed out toolchain"
                    );
                }
                ToolchainOutcome {
                    exit_code: None,
                    timed_out: true,
                }
            }
        };

        debug!(
            target = "texpress::toolchain",
            program = %self.program.display(),
            pass = invocation.pass.as_str(),
            exit_code = outcome.exit_code.map(i64::from).unwrap_or(-1),
            timed_out = outcome.timed_out,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Toolchain finished"
        );

        Ok(outcome)
    }
}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Some(pid) = child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: `kill` has no memory-safety preconditions; the negative pid
    // targets the group created for this child by `process_group(0)`.
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            target = "texpress::toolchain",
            pid = pid,
            error = %std::io::Error::last_os_error(),
            "Failed to kill toolchain process group"
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}
