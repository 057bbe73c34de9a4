// crates/server/src/jobs/streamer.rs
//! Per-consumer incremental delta feed built by polling the job store.
//!
//! Each consumer keeps its own cursors. Log cursors are absolute (they count
//! evicted entries too), so the log cap never causes duplicates.

use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::store::{acquire, JobStore};
use super::types::{DeltaEvent, JobError, JobId, JobRecord};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One unit emitted to a stream consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// Incremental update; the last one of a stream has `complete == true`.
    Delta(DeltaEvent),
    /// The job does not exist (never did, or was deleted mid-stream).
    Error(StreamError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamError {
    pub error: String,
}

/// Read positions of one consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaCursor {
    /// Absolute index of the next log entry to send.
    pub next_log: u64,
    pub next_result: usize,
}

impl DeltaCursor {
    /// Build the delta for `record` and advance past everything it contains.
    pub fn advance(&mut self, record: &JobRecord) -> DeltaEvent {
        let first_kept = record.logs_evicted;
        if self.next_log < first_kept {
            tracing::debug!(
                job_id = %record.job_id,
                missed = first_kept - self.next_log,
                "Log entries evicted before they were streamed"
            );
        }
        let skip = self.next_log.saturating_sub(first_kept) as usize;
        let new_logs = record.logs.get(skip..).unwrap_or_default().to_vec();
        self.next_log = record.log_end();

        let new_results = record
            .object_results
            .get(self.next_result..)
            .unwrap_or_default()
            .to_vec();
        self.next_result = record.object_results.len();

        DeltaEvent {
            job_id: record.job_id.clone(),
            status: record.status,
            progress_percentage: record.progress_percentage,
            completed_objects: record.completed_objects,
            failed_objects: record.failed_objects,
            skipped_objects: record.skipped_objects,
            total_objects: record.total_objects,
            current_object: record.current_object.clone(),
            estimated_time_remaining: record.estimated_time_remaining,
            new_logs,
            new_results,
            complete: false,
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }
}

/// Turns store polling into delta streams.
#[derive(Clone)]
pub struct EventStreamer {
    store: Arc<JobStore>,
    poll_interval: Duration,
}

impl EventStreamer {
    pub fn new(store: Arc<JobStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Stream deltas for `job_id` until it is terminal, missing, or
    /// `shutdown` flips to `true`. Dropping the stream detaches the consumer
    /// without touching the job.
    pub fn stream(
        &self,
        job_id: JobId,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> impl Stream<Item = StreamFrame> + Send + 'static {
        let store = Arc::clone(&self.store);
        let poll_interval = self.poll_interval;

        async_stream::stream! {
            let mut shutdown = shutdown;
            let mut cursor = DeltaCursor::default();
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                match shutdown.as_mut() {
                    Some(rx) => {
                        tokio::select! {
                            _ = interval.tick() => {}
                            changed = rx.changed() => {
                                if changed.is_err() || *rx.borrow() {
                                    tracing::debug!(job_id = %job_id, "Stream closed by shutdown");
                                    break;
                                }
                                continue;
                            }
                        }
                    }
                    None => {
                        interval.tick().await;
                    }
                }

                let delta = match poll_once(&store, &job_id, &mut cursor) {
                    Ok(delta) => delta,
                    Err(_) => {
                        yield StreamFrame::Error(StreamError {
                            error: "Job not found".to_string(),
                        });
                        break;
                    }
                };

                if delta.status.is_terminal() {
                    let mut last = delta.clone();
                    last.new_logs.clear();
                    last.new_results.clear();
                    last.complete = true;
                    yield StreamFrame::Delta(delta);
                    yield StreamFrame::Delta(last);
                    break;
                }
                yield StreamFrame::Delta(delta);
            }
        }
    }
}

/// Read one consistent snapshot under the job's lock.
fn poll_once(store: &JobStore, job_id: &JobId, cursor: &mut DeltaCursor) -> Result<DeltaEvent, JobError> {
    let lock = store.lock(job_id)?;
    let record = acquire(&lock);
    Ok(cursor.advance(&record))
}
