// crates/server/src/jobs/mod.rs
//! Migration job engine.
//!
//! Provides:
//! - `JobStore`: in-memory job records, one lock per job
//! - `ProgressRecorder`: the only mutator of job records
//! - `WorkerTask`: background loop over a job's work items
//! - `EventStreamer`: per-consumer delta streams over store polling
//! - `JobController`: entry points used by the HTTP layer and the CLI

pub mod controller;
pub mod recorder;
pub mod report;
pub mod store;
pub mod streamer;
pub mod types;
pub mod worker;

pub use controller::{CancelOutcome, JobController, StartMigration, StartedJob};
pub use recorder::{ProgressRecorder, ProgressUpdate};
pub use store::JobStore;
pub use streamer::{DeltaCursor, EventStreamer, StreamError, StreamFrame, DEFAULT_POLL_INTERVAL};
pub use types::{
    DeltaEvent, JobError, JobId, JobMetadata, JobRecord, JobStatus, JobSummary, LogEntry,
    LogLevel, ObjectResult, ObjectStatus, MAX_LOG_ENTRIES,
};
pub use worker::WorkerTask;
