use std::{process, sync::Arc, time::Duration};

use texpress::{
    application::{
        auth::SharedSecret, compile::CompileService, error::AppError,
        retention::RetentionSweeper, toolchain::Toolchain,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, ApiState},
        telemetry,
        toolchain::ProcessToolchain,
        workspace::WorkspaceStore,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let workspaces = Arc::new(
        WorkspaceStore::new(settings.jobs.root.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );

    match cli_args.command.unwrap_or(config::Command::Serve) {
        config::Command::Serve => run_serve(settings, workspaces).await,
        config::Command::Sweep => run_sweep(settings, workspaces).await,
    }
}

async fn run_serve(
    settings: config::Settings,
    workspaces: Arc<WorkspaceStore>,
) -> Result<(), AppError> {
    let toolchain: Arc<dyn Toolchain> =
        Arc::new(ProcessToolchain::new(settings.toolchain.program.clone()));
    let compile = Arc::new(CompileService::new(
        workspaces.clone(),
        toolchain,
        settings.toolchain.timeout,
    ));
    let secret = Arc::new(SharedSecret::new(settings.auth.api_key.as_deref()));

    let sweeper_handle = RetentionSweeper::new(
        workspaces.clone(),
        settings.jobs.retention,
        settings.jobs.sweep_interval,
    )
    .spawn();

    let state = ApiState {
        compile,
        secret: secret.clone(),
    };
    let router = http::build_router(state, settings.jobs.max_request_bytes.get());

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "texpress::serve",
        addr = %settings.server.addr,
        jobs_root = %workspaces.root().display(),
        toolchain = %settings.toolchain.program.display(),
        "LaTeX service running"
    );
    if secret.is_configured() {
        info!(target = "texpress::serve", "API key configured: yes");
    } else {
        warn!(
            target = "texpress::serve",
            "API key configured: no; all compile requests will be rejected"
        );
    }

    let result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")));

    sweeper_handle.abort();
    let _ = sweeper_handle.await;

    result
}

async fn run_sweep(
    settings: config::Settings,
    workspaces: Arc<WorkspaceStore>,
) -> Result<(), AppError> {
    let report = RetentionSweeper::new(
        workspaces.clone(),
        settings.jobs.retention,
        settings.jobs.sweep_interval,
    )
    .sweep_once()
    .await;

    info!(
        target = "texpress::sweep",
        jobs_root = %workspaces.root().display(),
        removed = report.removed,
        skipped = report.skipped,
        "Sweep finished"
    );
    Ok(())
}

/// Resolve on Ctrl+C (or SIGTERM on unix), then give in-flight jobs the
/// configured grace period before forcing exit.
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(
        target = "texpress::serve",
        grace_seconds = grace.as_secs(),
        "Shutdown requested; draining in-flight jobs"
    );

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(
            target = "texpress::serve",
            "Graceful shutdown timed out; exiting"
        );
        process::exit(1);
    });
}
