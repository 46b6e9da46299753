use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use muster_application::AppState;
use muster_infrastructure::schedule_sync;

use crate::context::AppContext;

/// Owns the background sync task.
pub struct SyncDaemonHandle {
    shutdown_tx: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl SyncDaemonHandle {
    pub fn spawn(state: AppState, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(schedule_sync(state, interval, shutdown_rx));
        Self {
            shutdown_tx,
            worker: Some(worker),
        }
    }

    /// Signals the loop and waits for an in-flight cycle to finish.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                warn!(error = %err, "sync worker ended abnormally");
            }
        }
    }
}

/// Runs periodic sync until SIGINT/SIGTERM. The caller closes the stores afterwards.
pub async fn run_daemon(context: &AppContext) -> Result<()> {
    let config = &context.state.config;
    let handle = if config.sync_enabled {
        Some(SyncDaemonHandle::spawn(
            context.state.clone(),
            Duration::from_secs(config.sync_interval_seconds.max(1)),
        ))
    } else {
        warn!("sync disabled or no remote configured; daemon is idle");
        None
    };

    shutdown_signal().await;
    info!("shutdown requested");
    if let Some(handle) = handle {
        handle.stop().await;
    }
    info!("daemon stopped");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "sigterm handler unavailable");
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
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use muster_domain::{LocalStore, RemoteStore};
    use muster_infrastructure::{AppConfig, InMemoryLocalStore, InMemoryRemoteStore};

    use super::*;
    use crate::context::ContextOptions;

    #[tokio::test(start_paused = true)]
    async fn stop_ends_an_idle_loop() {
        let context = AppContext::with_stores(
            AppConfig::default(),
            Arc::new(InMemoryLocalStore::new()),
            Some(Arc::new(InMemoryRemoteStore::new()) as Arc<dyn RemoteStore>),
            ContextOptions::default(),
        );
        let handle = SyncDaemonHandle::spawn(context.state.clone(), Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.stop().await;
        assert!(context.state.local_store.ping().await.is_ok());
    }
}
