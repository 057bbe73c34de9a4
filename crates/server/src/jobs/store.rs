// crates/server/src/jobs/store.rs
//! In-memory registry of job records, one lock per job.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};

use super::types::{JobError, JobId, JobMetadata, JobRecord, JobSummary};

/// Handle to one job's record. Holding the mutex is the only way to touch it.
pub type JobLock = Arc<Mutex<JobRecord>>;

/// Process-wide job registry.
///
/// The map lock is held only long enough to look up or insert a handle; the
/// per-job mutex guards the record itself. Callers re-fetch the handle with
/// [`JobStore::lock`] before every acquisition instead of caching it, so a
/// deleted job is observed as `NotFound` rather than mutated in limbo.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, JobLock>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record. Fails if the id is already registered.
    pub fn create(
        &self,
        job_id: JobId,
        total_objects: u32,
        metadata: JobMetadata,
    ) -> Result<(), JobError> {
        let mut jobs = match self.jobs.write() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!("RwLock poisoned writing jobs map: {e}");
                e.into_inner()
            }
        };
        if jobs.contains_key(&job_id) {
            return Err(JobError::Duplicate(job_id));
        }
        let record = JobRecord::new(job_id.clone(), total_objects, metadata);
        jobs.insert(job_id, Arc::new(Mutex::new(record)));
        Ok(())
    }

    /// The lock guarding `job_id`'s record.
    pub fn lock(&self, job_id: &JobId) -> Result<JobLock, JobError> {
        self.read_map()
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.clone()))
    }

    /// Point-in-time copy of a record.
    pub fn get(&self, job_id: &JobId) -> Result<JobRecord, JobError> {
        let lock = self.lock(job_id)?;
        let record = acquire(&lock).clone();
        Ok(record)
    }

    /// Remove a record. Safe while a worker still runs the job: its next
    /// `lock` call fails with `NotFound`.
    pub fn delete(&self, job_id: &JobId) -> Result<(), JobError> {
        let mut jobs = match self.jobs.write() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!("RwLock poisoned writing jobs map: {e}");
                e.into_inner()
            }
        };
        jobs.remove(job_id)
            .map(|_| ())
            .ok_or_else(|| JobError::NotFound(job_id.clone()))
    }

    /// Summaries of every job, oldest first.
    pub fn list(&self) -> Vec<JobSummary> {
        let handles: Vec<JobLock> = self.read_map().values().cloned().collect();
        let mut summaries: Vec<JobSummary> =
            handles.iter().map(|lock| acquire(lock).summary()).collect();
        summaries.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        summaries
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop terminal jobs that ended before `cutoff`. Running jobs are never
    /// touched. Returns the removed ids.
    pub fn purge_terminal(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        let mut jobs = match self.jobs.write() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!("RwLock poisoned writing jobs map: {e}");
                e.into_inner()
            }
        };
        let expired: Vec<JobId> = jobs
            .iter()
            .filter(|(_, lock)| {
                let record = acquire(lock);
                record.status.is_terminal() && record.end_time.is_some_and(|end| end < cutoff)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            jobs.remove(id);
        }
        expired
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<JobId, JobLock>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                e.into_inner()
            }
        }
    }
}

/// Lock a job record, recovering from poisoning.
pub fn acquire(lock: &JobLock) -> MutexGuard<'_, JobRecord> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(e) => {
            tracing::error!("Mutex poisoned for job record: {e}");
            e.into_inner()
        }
    }
}
