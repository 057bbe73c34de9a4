// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use dw_migrate_core::{SqlExecutor, Translator, WorkItemSource};
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::jobs::{JobController, JobStore};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    pub config: ServerConfig,
    /// Migration job engine.
    pub jobs: Arc<JobController>,
    /// Flips to `true` on shutdown so long-lived SSE streams end.
    pub shutdown: watch::Receiver<bool>,
    shutdown_tx: watch::Sender<bool>,
}

impl AppState {
    /// Create the state wrapped in an Arc for sharing.
    pub fn new(
        config: ServerConfig,
        source: Arc<dyn WorkItemSource>,
        translator: Arc<dyn Translator>,
        executor: Arc<dyn SqlExecutor>,
    ) -> Arc<Self> {
        let (shutdown_tx, shutdown) = watch::channel(false);
        let jobs = Arc::new(JobController::new(
            Arc::new(JobStore::new()),
            source,
            translator,
            executor,
            config.poll_interval,
        ));
        Arc::new(Self {
            start_time: Instant::now(),
            config,
            jobs,
            shutdown,
            shutdown_tx,
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Signal every open stream to close.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
