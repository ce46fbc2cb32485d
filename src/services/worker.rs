use crate::services::upload_service::UploadService;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

/// Periodically fails abandoned upload sessions and prunes idle lock entries.
pub struct BackgroundWorker {
    upload_service: Arc<UploadService>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(upload_service: Arc<UploadService>, shutdown: watch::Receiver<bool>) -> Self {
        let interval = Duration::from_secs(upload_service.config().sweep_interval_secs.max(1));
        Self {
            upload_service,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Background worker started (sweep every {}s)",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background worker shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.perform_sweep().await;
                }
            }
        }
    }

    pub async fn perform_sweep(&self) -> usize {
        tracing::info!("🧹 Sweeping stale upload sessions...");

        let expired = match self.upload_service.expire_stale_sessions(Utc::now()).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Session sweep failed: {}", e);
                0
            }
        };

        self.upload_service.locks().cleanup();

        tracing::info!("✅ Sweep completed, {} session(s) expired", expired);
        expired
    }
}
