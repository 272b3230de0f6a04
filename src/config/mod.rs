//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{CliArgs, Command, Overrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "texpress";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_TOOLCHAIN_PROGRAM: &str = "pdflatex";
const DEFAULT_TOOLCHAIN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JOBS_ROOT: &str = "/tmp/latex-jobs";
const DEFAULT_JOBS_RETENTION_SECS: u64 = 60 * 60;
const DEFAULT_JOBS_SWEEP_INTERVAL_SECS: u64 = 10 * 60;
const DEFAULT_MAX_REQUEST_BYTES: u64 = 10 * 1024 * 1024;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub auth: AuthSettings,
    pub toolchain: ToolchainSettings,
    pub jobs: JobsSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Clone, Default)]
pub struct AuthSettings {
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ToolchainSettings {
    pub program: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct JobsSettings {
    pub root: PathBuf,
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub max_request_bytes: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("TEXPRESS").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    auth: RawAuthSettings,
    toolchain: RawToolchainSettings,
    jobs: RawJobsSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(key) = overrides.api_key.as_ref() {
            self.auth.api_key = Some(key.clone());
        }
        if let Some(program) = overrides.toolchain_program.as_ref() {
            self.toolchain.program = Some(program.clone());
        }
        if let Some(seconds) = overrides.toolchain_timeout_seconds {
            self.toolchain.timeout_seconds = Some(seconds);
        }
        if let Some(root) = overrides.jobs_root.as_ref() {
            self.jobs.root = Some(root.clone());
        }
        if let Some(seconds) = overrides.jobs_retention_seconds {
            self.jobs.retention_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.jobs_sweep_interval_seconds {
            self.jobs.sweep_interval_seconds = Some(seconds);
        }
        if let Some(limit) = overrides.jobs_max_request_bytes {
            self.jobs.max_request_bytes = Some(limit);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            auth,
            toolchain,
            jobs,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            auth: build_auth_settings(auth),
            toolchain: build_toolchain_settings(toolchain)?,
            jobs: build_jobs_settings(jobs)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);

    Ok(ServerSettings {
        addr,
        graceful_shutdown: positive_secs(graceful_secs, "server.graceful_shutdown_seconds")?,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_auth_settings(auth: RawAuthSettings) -> AuthSettings {
    // Blank means unset; anything else must be presented byte for byte.
    let api_key = auth.api_key.filter(|value| !value.trim().is_empty());

    AuthSettings { api_key }
}

fn build_toolchain_settings(
    toolchain: RawToolchainSettings,
) -> Result<ToolchainSettings, LoadError> {
    let program = toolchain
        .program
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TOOLCHAIN_PROGRAM));
    if program.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "toolchain.program",
            "path must not be empty",
        ));
    }

    let timeout_secs = toolchain
        .timeout_seconds
        .unwrap_or(DEFAULT_TOOLCHAIN_TIMEOUT_SECS);

    Ok(ToolchainSettings {
        program,
        timeout: positive_secs(timeout_secs, "toolchain.timeout_seconds")?,
    })
}

fn build_jobs_settings(jobs: RawJobsSettings) -> Result<JobsSettings, LoadError> {
    let root = jobs.root.unwrap_or_else(|| PathBuf::from(DEFAULT_JOBS_ROOT));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("jobs.root", "path must not be empty"));
    }

    let retention = positive_secs(
        jobs.retention_seconds
            .unwrap_or(DEFAULT_JOBS_RETENTION_SECS),
        "jobs.retention_seconds",
    )?;
    let sweep_interval = positive_secs(
        jobs.sweep_interval_seconds
            .unwrap_or(DEFAULT_JOBS_SWEEP_INTERVAL_SECS),
        "jobs.sweep_interval_seconds",
    )?;

    let max_request_bytes_value = jobs
        .max_request_bytes
        .unwrap_or(DEFAULT_MAX_REQUEST_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value)
        .ok_or_else(|| LoadError::invalid("jobs.max_request_bytes", "must be greater than zero"))?;
    let max_request_bytes = usize::try_from(max_request_bytes.get())
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::invalid(
                "jobs.max_request_bytes",
                "value exceeds supported range for usize",
            )
        })?;

    Ok(JobsSettings {
        root,
        retention,
        sweep_interval,
        max_request_bytes,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawToolchainSettings {
    program: Option<PathBuf>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawJobsSettings {
    root: Option<PathBuf>,
    retention_seconds: Option<u64>,
    sweep_interval_seconds: Option<u64>,
    max_request_bytes: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn positive_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

#[cfg(test)]
mod tests;
