// crates/server/src/jobs/types.rs
//! Types for the migration job engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dw_migrate_core::{ObjectType, TokenUsage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Maximum log entries kept per job; older entries are evicted first.
pub const MAX_LOG_ENTRIES: usize = 1000;

/// Opaque, immutable job identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(type = "string")]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job lifecycle status. `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct LogEntry {
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Outcome of one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub enum ObjectStatus {
    Success,
    Error,
    Skipped,
}

/// Per-object result, appended once per processed work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct ObjectResult {
    pub object_name: String,
    pub object_type: ObjectType,
    pub status: ObjectStatus,
    pub error: Option<String>,
    #[ts(type = "number | null")]
    pub execution_time_ms: Option<u64>,
    /// Source SQL, kept only for failed objects (error report).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub source_sql: Option<String>,
    /// Present whenever translation succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub translated_sql: Option<String>,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

impl ObjectResult {
    pub fn new(object_name: impl Into<String>, object_type: ObjectType, status: ObjectStatus) -> Self {
        Self {
            object_name: object_name.into(),
            object_type,
            status,
            error: None,
            execution_time_ms: None,
            source_sql: None,
            translated_sql: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_execution_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    pub fn with_source_sql(mut self, sql: impl Into<String>) -> Self {
        self.source_sql = Some(sql.into());
        self
    }

    pub fn with_translated_sql(mut self, sql: impl Into<String>) -> Self {
        self.translated_sql = Some(sql.into());
        self
    }
}

/// Metadata fixed when a job is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub source_type: String,
    pub target_catalog: String,
    pub target_schema: String,
    pub model_id: String,
    pub dry_run: bool,
}

/// The mutable state of one migration job.
///
/// Only `ProgressRecorder` mutates it, always while holding the job's lock.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct JobRecord {
    pub job_id: JobId,
    pub status: JobStatus,
    pub source_type: String,
    pub target_catalog: String,
    pub target_schema: String,
    pub model_id: String,
    pub dry_run: bool,
    pub total_objects: u32,
    pub completed_objects: u32,
    pub failed_objects: u32,
    pub skipped_objects: u32,
    pub current_object: Option<String>,
    pub progress_percentage: u32,
    #[ts(type = "number | null")]
    pub estimated_time_remaining: Option<u64>,
    #[ts(type = "string")]
    pub start_time: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub end_time: Option<DateTime<Utc>>,
    pub logs: Vec<LogEntry>,
    /// Entries dropped by the log cap. `logs[i]` has absolute index `logs_evicted + i`.
    #[ts(type = "number")]
    pub logs_evicted: u64,
    pub object_results: Vec<ObjectResult>,
    pub usage: TokenUsage,
    pub cancel_requested: bool,
    #[serde(skip)]
    #[ts(skip)]
    pub(crate) initialized: bool,
}

impl JobRecord {
    pub fn new(job_id: JobId, total_objects: u32, metadata: JobMetadata) -> Self {
        Self {
            job_id,
            status: JobStatus::Running,
            source_type: metadata.source_type,
            target_catalog: metadata.target_catalog,
            target_schema: metadata.target_schema,
            model_id: metadata.model_id,
            dry_run: metadata.dry_run,
            total_objects,
            completed_objects: 0,
            failed_objects: 0,
            skipped_objects: 0,
            current_object: None,
            progress_percentage: 0,
            estimated_time_remaining: None,
            start_time: Utc::now(),
            end_time: None,
            logs: Vec::new(),
            logs_evicted: 0,
            object_results: Vec::new(),
            usage: TokenUsage::default(),
            cancel_requested: false,
            initialized: false,
        }
    }

    pub fn processed(&self) -> u32 {
        self.completed_objects + self.failed_objects
    }

    /// Absolute index one past the newest log entry.
    pub fn log_end(&self) -> u64 {
        self.logs_evicted + self.logs.len() as u64
    }

    /// Recompute `progress_percentage` and `estimated_time_remaining`.
    pub fn recompute_derived(&mut self, now: DateTime<Utc>) {
        self.progress_percentage = progress_percentage(self.processed(), self.total_objects);

        let processed = self.processed();
        self.estimated_time_remaining = if processed == 0 {
            None
        } else {
            let elapsed_ms = (now - self.start_time).num_milliseconds().max(0) as u128;
            let remaining = self.total_objects.saturating_sub(processed) as u128;
            // Rounded to the nearest whole second.
            let eta_ms = elapsed_ms * remaining / processed as u128;
            Some(((eta_ms + 500) / 1000) as u64)
        };
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.job_id.clone(),
            status: self.status,
            source_type: self.source_type.clone(),
            target_catalog: self.target_catalog.clone(),
            target_schema: self.target_schema.clone(),
            model_id: self.model_id.clone(),
            dry_run: self.dry_run,
            total_objects: self.total_objects,
            completed_objects: self.completed_objects,
            failed_objects: self.failed_objects,
            skipped_objects: self.skipped_objects,
            current_object: self.current_object.clone(),
            progress_percentage: self.progress_percentage,
            estimated_time_remaining: self.estimated_time_remaining,
            start_time: self.start_time,
            end_time: self.end_time,
            usage: self.usage,
        }
    }
}

/// `round(100 * processed / total)`, half rounded up; 0 when `total == 0`.
pub fn progress_percentage(processed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let processed = processed.min(total) as u64;
    let total = total as u64;
    ((200 * processed + total) / (2 * total)) as u32
}

/// A job record without its logs and object results.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub source_type: String,
    pub target_catalog: String,
    pub target_schema: String,
    pub model_id: String,
    pub dry_run: bool,
    pub total_objects: u32,
    pub completed_objects: u32,
    pub failed_objects: u32,
    pub skipped_objects: u32,
    pub current_object: Option<String>,
    pub progress_percentage: u32,
    #[ts(type = "number | null")]
    pub estimated_time_remaining: Option<u64>,
    #[ts(type = "string")]
    pub start_time: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub end_time: Option<DateTime<Utc>>,
    pub usage: TokenUsage,
}

/// Incremental update sent to one stream consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct DeltaEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress_percentage: u32,
    pub completed_objects: u32,
    pub failed_objects: u32,
    pub skipped_objects: u32,
    pub total_objects: u32,
    pub current_object: Option<String>,
    #[ts(type = "number | null")]
    pub estimated_time_remaining: Option<u64>,
    pub new_logs: Vec<LogEntry>,
    pub new_results: Vec<ObjectResult>,
    pub complete: bool,
    #[ts(type = "string")]
    pub start_time: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Structural errors surfaced by the job engine.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job already exists: {0}")]
    Duplicate(JobId),

    #[error("No objects found to migrate")]
    NoObjects,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Job {0} is already in a terminal state")]
    AlreadyTerminal(JobId),

    #[error("Job {0} was already initialized")]
    AlreadyInitialized(JobId),

    #[error("Cannot finish a job with non-terminal status {0}")]
    NotTerminal(JobStatus),

    #[error(transparent)]
    Extraction(#[from] dw_migrate_core::InventoryError),
}
