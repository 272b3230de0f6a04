use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the texpress binary.
///
/// Overrides are global so they are accepted both before and after the
/// subcommand, and so `PORT`/`LATEX_API_KEY` are honored when no subcommand is
/// given at all.
#[derive(Debug, Parser)]
#[command(name = "texpress", version, about = "Remote LaTeX compilation service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "TEXPRESS_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the compilation HTTP service (default).
    Serve,
    /// Run a single retention sweep over the jobs root and exit.
    Sweep,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST", global = true)]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "port", env = "PORT", value_name = "PORT", global = true)]
    pub port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(
        long = "server-graceful-shutdown-seconds",
        value_name = "SECONDS",
        global = true
    )]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Shared secret expected in `Authorization: Bearer <secret>`.
    #[arg(
        long = "api-key",
        env = "LATEX_API_KEY",
        value_name = "SECRET",
        hide_env_values = true,
        global = true
    )]
    pub api_key: Option<String>,

    /// Override the typesetting executable.
    #[arg(long = "toolchain-program", value_name = "PATH", global = true)]
    pub toolchain_program: Option<PathBuf>,

    /// Override the per-invocation toolchain timeout.
    #[arg(long = "toolchain-timeout-seconds", value_name = "SECONDS", global = true)]
    pub toolchain_timeout_seconds: Option<u64>,

    /// Override the directory under which per-job workspaces are created.
    #[arg(long = "jobs-root", value_name = "PATH", global = true)]
    pub jobs_root: Option<PathBuf>,

    /// Override how long a workspace may live before the sweeper removes it.
    #[arg(long = "jobs-retention-seconds", value_name = "SECONDS", global = true)]
    pub jobs_retention_seconds: Option<u64>,

    /// Override the interval between retention sweeps.
    #[arg(
        long = "jobs-sweep-interval-seconds",
        value_name = "SECONDS",
        global = true
    )]
    pub jobs_sweep_interval_seconds: Option<u64>,

    /// Override the maximum accepted request body size in bytes.
    #[arg(long = "jobs-max-request-bytes", value_name = "BYTES", global = true)]
    pub jobs_max_request_bytes: Option<u64>,
}
