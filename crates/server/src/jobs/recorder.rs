// crates/server/src/jobs/recorder.rs
//! The only code path that mutates a job record.
//!
//! Every operation re-fetches the job's lock from the store, holds it for its
//! whole body and recomputes derived fields before releasing it, so counters
//! and percentages never drift apart.

use std::sync::Arc;

use chrono::Utc;
use dw_migrate_core::TokenUsage;

use super::store::{acquire, JobStore};
use super::types::{
    JobError, JobId, JobRecord, JobStatus, LogEntry, LogLevel, ObjectResult, MAX_LOG_ENTRIES,
};

/// Partial update applied by [`ProgressRecorder::update_progress`].
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub current_object: Option<String>,
    pub completed: u32,
    pub failed: u32,
    /// Subset of `completed` that was skipped.
    pub skipped: u32,
    pub usage: Option<TokenUsage>,
}

impl ProgressUpdate {
    pub fn current(name: impl Into<String>) -> Self {
        Self {
            current_object: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn completed() -> Self {
        Self {
            completed: 1,
            ..Default::default()
        }
    }

    pub fn failed() -> Self {
        Self {
            failed: 1,
            ..Default::default()
        }
    }

    pub fn skipped() -> Self {
        Self {
            completed: 1,
            skipped: 1,
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[derive(Clone)]
pub struct ProgressRecorder {
    store: Arc<JobStore>,
}

impl ProgressRecorder {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Mark a freshly created job as running. Must be called exactly once,
    /// with the total and target the job was created with; those stay fixed.
    pub fn initialize(
        &self,
        job_id: &JobId,
        total_objects: u32,
        source_type: &str,
        target_catalog: &str,
        target_schema: &str,
    ) -> Result<(), JobError> {
        self.mutate(job_id, |record| {
            if record.initialized {
                return Err(JobError::AlreadyInitialized(job_id.clone()));
            }
            if record.total_objects != total_objects {
                return Err(JobError::InvalidRequest(format!(
                    "total_objects {total_objects} does not match {} fixed at creation",
                    record.total_objects
                )));
            }
            if record.source_type != source_type
                || record.target_catalog != target_catalog
                || record.target_schema != target_schema
            {
                return Err(JobError::InvalidRequest(
                    "source and target do not match the job's metadata".to_string(),
                ));
            }
            record.initialized = true;
            record.status = JobStatus::Running;
            record.start_time = Utc::now();
            record.recompute_derived(record.start_time);
            tracing::debug!(job_id = %job_id, total_objects, "Job initialized");
            Ok(())
        })?
    }

    /// Apply a partial update and recompute percentage and ETA.
    pub fn update_progress(&self, job_id: &JobId, update: ProgressUpdate) -> Result<(), JobError> {
        self.mutate(job_id, |record| {
            if let Some(name) = update.current_object {
                record.current_object = Some(name);
            }
            let room = record.total_objects.saturating_sub(record.processed());
            let completed = update.completed.min(room);
            let failed = update.failed.min(room - completed);
            record.completed_objects += completed;
            record.failed_objects += failed;
            record.skipped_objects += update.skipped.min(completed);
            if let Some(usage) = update.usage {
                record.usage.add(&usage);
            }
            record.recompute_derived(Utc::now());
            tracing::debug!(
                job_id = %job_id,
                completed = record.completed_objects,
                failed = record.failed_objects,
                percent = record.progress_percentage,
                "Progress updated"
            );
        })
    }

    /// Append a log line, evicting the oldest entries beyond the cap.
    pub fn add_log(
        &self,
        job_id: &JobId,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<(), JobError> {
        let message = message.into();
        self.mutate(job_id, |record| {
            tracing::debug!(job_id = %job_id, level = ?level, message = %message, "Job log");
            record.logs.push(LogEntry {
                timestamp: Utc::now(),
                level,
                message,
            });
            if record.logs.len() > MAX_LOG_ENTRIES {
                let excess = record.logs.len() - MAX_LOG_ENTRIES;
                record.logs.drain(..excess);
                record.logs_evicted += excess as u64;
            }
        })
    }

    /// Append one per-object result, stamped with the current time.
    pub fn add_object_result(&self, job_id: &JobId, mut result: ObjectResult) -> Result<(), JobError> {
        self.mutate(job_id, |record| {
            result.timestamp = Utc::now();
            tracing::debug!(
                job_id = %job_id,
                object = %result.object_name,
                status = ?result.status,
                "Object result recorded"
            );
            record.object_results.push(result);
        })
    }

    /// Move the job into a terminal state. Fails on an already-terminal job so
    /// a late worker can never overwrite a cancellation.
    pub fn complete(&self, job_id: &JobId, final_status: JobStatus) -> Result<(), JobError> {
        if !final_status.is_terminal() {
            return Err(JobError::NotTerminal(final_status));
        }
        self.mutate(job_id, |record| {
            let now = Utc::now();
            record.status = final_status;
            record.end_time = Some(now);
            record.recompute_derived(now);
            tracing::debug!(job_id = %job_id, status = %final_status, "Job finished");
        })
    }

    /// Whether cancellation was requested for a running job.
    pub fn cancel_requested(&self, job_id: &JobId) -> Result<bool, JobError> {
        let lock = self.store.lock(job_id)?;
        let record = acquire(&lock);
        Ok(record.cancel_requested)
    }

    /// Raise the cancellation flag if the job is still running. Returns
    /// whether the flag was newly set.
    pub fn request_cancel(&self, job_id: &JobId) -> Result<bool, JobError> {
        let lock = self.store.lock(job_id)?;
        let mut record = acquire(&lock);
        if record.status.is_terminal() || record.cancel_requested {
            return Ok(false);
        }
        record.cancel_requested = true;
        tracing::debug!(job_id = %job_id, "Cancellation requested");
        Ok(true)
    }

    fn mutate<T>(
        &self,
        job_id: &JobId,
        f: impl FnOnce(&mut JobRecord) -> T,
    ) -> Result<T, JobError> {
        let lock = self.store.lock(job_id)?;
        let mut record = acquire(&lock);
        if record.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(job_id.clone()));
        }
        Ok(f(&mut record))
    }
}
