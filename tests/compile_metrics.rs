use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use metrics_util::debugging::DebuggingRecorder;
use tempfile::TempDir;
use texpress::application::compile::CompileService;
use texpress::application::retention::RetentionSweeper;
use texpress::application::toolchain::{
    Toolchain, ToolchainError, ToolchainInvocation, ToolchainOutcome,
};
use texpress::domain::jobs::CompileSource;
use texpress::infra::telemetry::{
    METRIC_COMPILE_JOBS_TOTAL, METRIC_COMPILE_MS, METRIC_SWEEP_REMOVED_TOTAL,
};
use texpress::infra::workspace::WorkspaceStore;

/// Produces a PDF only when the source asks for one.
struct EchoToolchain;

#[async_trait]
impl Toolchain for EchoToolchain {
    async fn run(
        &self,
        invocation: &ToolchainInvocation,
    ) -> Result<ToolchainOutcome, ToolchainError> {
        let source = std::fs::read_to_string(invocation.work_dir.join(&invocation.source_file))
            .expect("read source");
        if source.contains("render") {
            std::fs::write(invocation.work_dir.join("document.pdf"), b"%PDF").expect("write pdf");
        }
        Ok(ToolchainOutcome {
            exit_code: Some(0),
            timed_out: false,
        })
    }
}

#[tokio::test]
async fn compile_and_sweep_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let dir = TempDir::new().expect("temp dir");
    let workspaces = Arc::new(WorkspaceStore::new(dir.path().join("jobs")).expect("store"));
    let service = CompileService::new(
        workspaces.clone(),
        Arc::new(EchoToolchain),
        Duration::from_secs(5),
    );

    let ok = CompileSource::parse(Some("render me".to_string())).expect("source");
    let broken = CompileSource::parse(Some("broken".to_string())).expect("source");
    service.compile(&ok).await.expect("rendered");
    service.compile(&broken).await.expect_err("no artifact");

    std::fs::create_dir(workspaces.root().join("stale-job")).expect("stale entry");
    let sweeper = RetentionSweeper::new(
        workspaces.clone(),
        Duration::from_secs(3600),
        Duration::from_secs(600),
    );
    let report = sweeper
        .sweep_at(SystemTime::now() + Duration::from_secs(2 * 3600))
        .await;
    assert_eq!(report.removed, 1);

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();
    for expected in [
        METRIC_COMPILE_JOBS_TOTAL,
        METRIC_COMPILE_MS,
        METRIC_SWEEP_REMOVED_TOTAL,
    ] {
        assert!(names.contains(expected), "missing metric {expected}");
    }

    let results: HashSet<String> = snapshot
        .iter()
        .filter(|(composite_key, _, _, _)| composite_key.key().name() == METRIC_COMPILE_JOBS_TOTAL)
        .flat_map(|(composite_key, _, _, _)| {
            composite_key
                .key()
                .labels()
                .filter(|label| label.key() == "result")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    assert!(results.contains("succeeded"));
    assert!(results.contains("failed"));
}
