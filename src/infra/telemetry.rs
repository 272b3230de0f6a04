use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const METRIC_COMPILE_JOBS_TOTAL: &str = "texpress_compile_jobs_total";
pub const METRIC_COMPILE_MS: &str = "texpress_compile_ms";
pub const METRIC_SWEEP_REMOVED_TOTAL: &str = "texpress_sweep_removed_total";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_COMPILE_JOBS_TOTAL,
            Unit::Count,
            "Total number of compile jobs, labelled by result."
        );
        describe_histogram!(
            METRIC_COMPILE_MS,
            Unit::Milliseconds,
            "End-to-end compile job latency in milliseconds."
        );
        describe_counter!(
            METRIC_SWEEP_REMOVED_TOTAL,
            Unit::Count,
            "Total number of stale workspaces removed by the retention sweeper."
        );
    });
}
