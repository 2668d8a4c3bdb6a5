// ── Periodic reconciliation ──
//
// Opt-in background task that runs `bulk_sync` for each managed SSID on
// a fixed interval. Nothing starts it implicitly.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ScheduleError;
use crate::sync::SyncReconciler;

/// Handle to a running reconcile loop. Dropping it stops the loop.
pub struct ReconcileScheduler {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReconcileScheduler {
    /// Spawn the loop. The first pass runs immediately.
    pub fn start(
        reconciler: Arc<SyncReconciler>,
        ssids: Vec<String>,
        every: Duration,
    ) -> Result<Self, ScheduleError> {
        if every.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        info!(?ssids, interval = ?every, "reconcile scheduler started");
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        for ssid in &ssids {
                            if let Err(e) = reconciler.bulk_sync(ssid).await {
                                warn!(ssid, error = %e, "scheduled reconciliation failed");
                            }
                        }
                    }
                }
            }
            debug!("reconcile scheduler stopped");
        });

        Ok(Self {
            cancel,
            task: Some(task),
        })
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop the loop and wait for an in-flight pass to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "reconcile task ended abnormally");
            }
        }
    }
}

impl Drop for ReconcileScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
