// crates/server/src/jobs/controller.rs
//! Public entry points of the job engine.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dw_migrate_core::pricing::DEFAULT_MODEL_ID;
use dw_migrate_core::{
    InventorySource, SourceDialect, SqlExecutor, TargetLocation, Translator, WorkItemSource,
};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use ts_rs::TS;

use super::recorder::ProgressRecorder;
use super::store::JobStore;
use super::streamer::{EventStreamer, StreamFrame};
use super::types::{JobError, JobId, JobMetadata, JobRecord, JobStatus, JobSummary, LogLevel};
use super::worker::WorkerTask;

/// Parameters of a new migration job.
#[derive(Debug, Clone, Deserialize)]
pub struct StartMigration {
    pub inventory: InventorySource,
    /// Source dialect; defaults to the inline inventory's `source_type`.
    #[serde(default)]
    pub source_type: Option<String>,
    pub target_catalog: String,
    pub target_schema: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct StartedJob {
    pub job_id: JobId,
    pub total_objects: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct CancelOutcome {
    pub job_id: JobId,
    /// `true` only when this call raised the flag.
    pub cancel_requested: bool,
    pub status: JobStatus,
}

/// The only component the edge layer talks to.
pub struct JobController {
    store: Arc<JobStore>,
    recorder: ProgressRecorder,
    streamer: EventStreamer,
    source: Arc<dyn WorkItemSource>,
    translator: Arc<dyn Translator>,
    executor: Arc<dyn SqlExecutor>,
}

impl JobController {
    /// Wire the engine around `store`, which the recorder, every spawned
    /// worker and every stream share.
    pub fn new(
        store: Arc<JobStore>,
        source: Arc<dyn WorkItemSource>,
        translator: Arc<dyn Translator>,
        executor: Arc<dyn SqlExecutor>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            recorder: ProgressRecorder::new(Arc::clone(&store)),
            streamer: EventStreamer::new(Arc::clone(&store), poll_interval),
            store,
            source,
            translator,
            executor,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Extract work items, register the job and spawn its worker. Returns as
    /// soon as the job exists; no item-level work has happened yet.
    pub async fn start(&self, request: StartMigration) -> Result<StartedJob, JobError> {
        let source_type = request
            .source_type
            .clone()
            .or_else(|| match &request.inventory {
                InventorySource::Inline(inv) => inv.source_type.clone(),
                InventorySource::File(_) => None,
            })
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| JobError::InvalidRequest("source_type is required".to_string()))?;
        let dialect: SourceDialect = source_type
            .parse()
            .map_err(|e: String| JobError::InvalidRequest(e))?;
        if request.target_catalog.trim().is_empty() || request.target_schema.trim().is_empty() {
            return Err(JobError::InvalidRequest(
                "target_catalog and target_schema are required".to_string(),
            ));
        }
        let model_id = request
            .model_id
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());

        let items = self.source.extract(&request.inventory).await?;
        if items.is_empty() {
            return Err(JobError::NoObjects);
        }
        let total_objects = u32::try_from(items.len())
            .map_err(|_| JobError::InvalidRequest("too many objects".to_string()))?;

        let job_id = JobId::generate();
        self.store.create(
            job_id.clone(),
            total_objects,
            JobMetadata {
                source_type: dialect.as_str().to_string(),
                target_catalog: request.target_catalog.clone(),
                target_schema: request.target_schema.clone(),
                model_id: model_id.clone(),
                dry_run: request.dry_run,
            },
        )?;
        self.recorder.initialize(
            &job_id,
            total_objects,
            dialect.as_str(),
            &request.target_catalog,
            &request.target_schema,
        )?;
        self.recorder.add_log(
            &job_id,
            LogLevel::Info,
            format!(
                "Starting {}migration of {} objects from {} to {}.{}",
                if request.dry_run { "dry-run " } else { "" },
                total_objects,
                dialect.display_name(),
                request.target_catalog,
                request.target_schema
            ),
        )?;

        tracing::info!(
            job_id = %job_id,
            total_objects,
            source = %dialect,
            dry_run = request.dry_run,
            "Migration job created"
        );

        WorkerTask {
            job_id: job_id.clone(),
            items,
            target: TargetLocation::new(request.target_catalog, request.target_schema),
            source_dialect: dialect,
            model_id,
            dry_run: request.dry_run,
            recorder: self.recorder.clone(),
            translator: Arc::clone(&self.translator),
            executor: Arc::clone(&self.executor),
        }
        .spawn();

        Ok(StartedJob {
            job_id,
            total_objects,
        })
    }

    /// Ask a running job to stop at its next item boundary. A terminal job is
    /// left untouched.
    pub fn cancel(&self, job_id: &JobId) -> Result<CancelOutcome, JobError> {
        let cancel_requested = self.recorder.request_cancel(job_id)?;
        let status = self.store.get(job_id)?.status;
        if cancel_requested {
            tracing::info!(job_id = %job_id, "Migration cancellation requested");
        }
        Ok(CancelOutcome {
            job_id: job_id.clone(),
            cancel_requested,
            status,
        })
    }

    pub fn snapshot(&self, job_id: &JobId) -> Result<JobRecord, JobError> {
        self.store.get(job_id)
    }

    pub fn list(&self) -> Vec<JobSummary> {
        self.store.list()
    }

    /// Remove a job record. Does not wait for a running worker; the worker
    /// stops on its next store access.
    pub fn delete(&self, job_id: &JobId) -> Result<(), JobError> {
        self.store.delete(job_id)?;
        tracing::info!(job_id = %job_id, "Migration job deleted");
        Ok(())
    }

    pub fn stream(
        &self,
        job_id: JobId,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> impl Stream<Item = StreamFrame> + Send + 'static {
        self.streamer.stream(job_id, shutdown)
    }

    /// Drop jobs that have been terminal for longer than `older_than`.
    pub fn purge_terminal(&self, older_than: Duration) -> Vec<JobId> {
        let older_than = chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(older_than)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let removed = self.store.purge_terminal(cutoff);
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "Purged terminal migration jobs");
        }
        removed
    }
}
