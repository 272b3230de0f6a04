//! Periodic removal of workspaces that outlived the retention window.
//!
//! Normal request handling removes its own workspace; this sweeper is the
//! backstop for crashes, kills and failed cleanups. Removal is idempotent, so
//! racing a job that is finishing concurrently converges to "directory absent".

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::infra::telemetry::METRIC_SWEEP_REMOVED_TOTAL;
use crate::infra::workspace::{SweepReport, WorkspaceStore};

#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    workspaces: Arc<WorkspaceStore>,
    retention: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(workspaces: Arc<WorkspaceStore>, retention: Duration, interval: Duration) -> Self {
        Self {
            workspaces,
            retention,
            interval,
        }
    }

    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let report = self.workspaces.sweep_expired(now, self.retention).await;

        if report.removed > 0 || report.skipped > 0 {
            counter!(METRIC_SWEEP_REMOVED_TOTAL).increment(report.removed as u64);
            info!(
                target = "texpress::retention",
                removed = report.removed,
                skipped = report.skipped,
                "Retention sweep complete"
            );
        }

        report
    }

    /// Sweep every `interval` until the returned handle is aborted. The first
    /// sweep happens one full interval after spawning.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                self.sweep_once().await;
            }
        })
    }
}
