#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use texpress::application::auth::SharedSecret;
use texpress::application::compile::CompileService;
use texpress::infra::http::{self, ApiState};
use texpress::infra::toolchain::ProcessToolchain;
use texpress::infra::workspace::WorkspaceStore;
use tower::ServiceExt;

const SECRET: &str = "pipeline-secret";

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-pdflatex");
    fs::write(&path, body).expect("write script");
    let mut perms = fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("set perms");
    path
}

fn router_for(script: PathBuf, jobs_root: PathBuf, timeout: Duration) -> axum::Router {
    let workspaces = Arc::new(WorkspaceStore::new(jobs_root).expect("workspace store"));
    let compile = Arc::new(CompileService::new(
        workspaces,
        Arc::new(ProcessToolchain::new(script)),
        timeout,
    ));
    http::build_router(
        ApiState {
            compile,
            secret: Arc::new(SharedSecret::new(Some(SECRET))),
        },
        1024 * 1024,
    )
}

fn compile_request(latex: &str) -> Request<Body> {
    Request::post("/compile")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
        .body(Body::from(serde_json::json!({ "latex": latex }).to_string()))
        .expect("build request")
}

#[tokio::test]
async fn second_pass_output_is_served_after_a_failing_first_pass() {
    let dir = TempDir::new().expect("temp dir");
    let jobs_root = dir.path().join("jobs");
    // Halt-on-error pass fails; the lenient pass copies the source into the PDF.
    let script = write_script(
        dir.path(),
        "#!/bin/sh\n\
         case \"$2\" in\n\
           -halt-on-error) echo '! Undefined control sequence.' > document.log; exit 1 ;;\n\
         esac\n\
         cp document.tex document.pdf\n",
    );

    let response = router_for(script, jobs_root.clone(), Duration::from_secs(10))
        .oneshot(compile_request("%PDF-from-source"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    assert_eq!(&bytes[..], b"%PDF-from-source");
    assert_eq!(fs::read_dir(&jobs_root).expect("jobs root").count(), 0);
}

#[tokio::test]
async fn hung_toolchain_times_out_into_a_compilation_failure() {
    let dir = TempDir::new().expect("temp dir");
    let jobs_root = dir.path().join("jobs");
    let script = write_script(dir.path(), "#!/bin/sh\nsleep 30\n");

    let response = router_for(script, jobs_root.clone(), Duration::from_millis(200))
        .oneshot(compile_request("\\documentclass{article}"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(json["error"], "Compilation failed");
    assert_eq!(json["message"], "PDF was not generated");
    assert_eq!(fs::read_dir(&jobs_root).expect("jobs root").count(), 0);
}
