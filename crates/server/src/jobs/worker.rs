// crates/server/src/jobs/worker.rs
//! Background task that drives one migration job to a terminal state.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use dw_migrate_core::{
    SourceDialect, SqlExecutor, TargetLocation, TokenUsage, TranslationRequest, Translator,
    WorkItem,
};
use futures_util::FutureExt;
use tracing::Instrument;

use super::recorder::{ProgressRecorder, ProgressUpdate};
use super::types::{JobError, JobId, JobStatus, LogLevel, ObjectResult, ObjectStatus};
use crate::metrics;

/// Error text recorded for work items without source SQL.
pub const NO_SOURCE_SQL: &str = "No source SQL available";

/// Everything a worker needs to run one job.
pub struct WorkerTask {
    pub job_id: JobId,
    pub items: Vec<WorkItem>,
    pub target: TargetLocation,
    pub source_dialect: SourceDialect,
    pub model_id: String,
    pub dry_run: bool,
    pub recorder: ProgressRecorder,
    pub translator: Arc<dyn Translator>,
    pub executor: Arc<dyn SqlExecutor>,
}

/// What happened to one work item.
enum ItemOutcome {
    Skipped,
    Succeeded {
        execution_time_ms: u64,
        translated_sql: String,
        usage: TokenUsage,
    },
    Failed {
        error: String,
        translated_sql: Option<String>,
        usage: Option<TokenUsage>,
    },
}

#[derive(Default)]
struct Tally {
    succeeded: u32,
    failed: u32,
    skipped: u32,
}

impl WorkerTask {
    /// Spawn the task detached from the caller.
    pub fn spawn(self) -> tokio::task::JoinHandle<Option<JobStatus>> {
        let span = tracing::info_span!("migration_job", job_id = %self.job_id);
        tokio::spawn(self.run().instrument(span))
    }

    /// Run to completion. Returns the final status, or `None` when the job
    /// record disappeared mid-run.
    pub async fn run(self) -> Option<JobStatus> {
        let started = Instant::now();
        metrics::record_job_started();
        tracing::info!(
            total = self.items.len(),
            dry_run = self.dry_run,
            model = %self.model_id,
            "Migration job started"
        );

        match self.drive().await {
            Ok(status) => {
                metrics::record_job_finished(status.as_str(), started.elapsed());
                tracing::info!(status = %status, elapsed_ms = started.elapsed().as_millis() as u64, "Migration job finished");
                Some(status)
            }
            Err(JobError::NotFound(_)) => {
                metrics::record_job_finished("deleted", started.elapsed());
                tracing::warn!("Job deleted while running; stopping worker");
                None
            }
            Err(e) => {
                metrics::record_job_finished("aborted", started.elapsed());
                tracing::error!(error = %e, "Migration worker stopped");
                None
            }
        }
    }

    async fn drive(&self) -> Result<JobStatus, JobError> {
        let id = &self.job_id;
        let mut tally = Tally::default();
        let mut cancelled = false;

        for item in &self.items {
            if self.recorder.cancel_requested(id)? {
                cancelled = true;
                break;
            }

            let name = item.qualified_name();
            self.recorder.update_progress(id, ProgressUpdate::current(&name))?;
            self.recorder
                .add_log(id, LogLevel::Info, format!("Processing {} {}", item.object_type, name))?;

            let outcome = match AssertUnwindSafe(self.process_item(item)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => ItemOutcome::Failed {
                    error: format!("Unexpected error: {}", panic_message(&*panic)),
                    translated_sql: None,
                    usage: None,
                },
            };
            self.record_outcome(item, &name, outcome, &mut tally)?;
        }

        let final_status = if cancelled {
            self.recorder
                .add_log(id, LogLevel::Warning, "Migration cancelled by user")?;
            JobStatus::Cancelled
        } else if !self.items.is_empty() && tally.failed as usize == self.items.len() {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };

        if !cancelled {
            let level = if tally.failed > 0 { LogLevel::Warning } else { LogLevel::Info };
            self.recorder.add_log(
                id,
                level,
                format!(
                    "Migration finished: {} succeeded, {} failed, {} skipped",
                    tally.succeeded, tally.failed, tally.skipped
                ),
            )?;
        }
        self.recorder.complete(id, final_status)?;
        Ok(final_status)
    }

    async fn process_item(&self, item: &WorkItem) -> ItemOutcome {
        if !item.has_source_sql() {
            return ItemOutcome::Skipped;
        }

        let request = TranslationRequest {
            source_sql: item.source_sql.clone(),
            source_dialect: self.source_dialect,
            model_id: self.model_id.clone(),
            target_catalog: self.target.catalog.clone(),
            target_schema: self.target.schema.clone(),
        };
        let translation = match self.translator.translate(request).await {
            Ok(t) => t,
            Err(e) => {
                return ItemOutcome::Failed {
                    error: format!("Translation failed: {e}"),
                    translated_sql: None,
                    usage: None,
                }
            }
        };
        let usage = translation.metrics.usage;
        metrics::record_tokens(&translation.metrics.model_used, usage.total_tokens);

        let result = if self.dry_run {
            self.executor
                .validate(&translation.translated_sql, &self.target)
                .await
        } else {
            self.executor
                .execute(&translation.translated_sql, &self.target)
                .await
        };
        match result {
            Ok(outcome) => ItemOutcome::Succeeded {
                execution_time_ms: outcome.execution_time_ms,
                translated_sql: translation.translated_sql,
                usage,
            },
            Err(e) => ItemOutcome::Failed {
                error: if self.dry_run {
                    format!("Validation failed: {e}")
                } else {
                    format!("Execution failed: {e}")
                },
                translated_sql: Some(translation.translated_sql),
                usage: Some(usage),
            },
        }
    }

    fn record_outcome(
        &self,
        item: &WorkItem,
        name: &str,
        outcome: ItemOutcome,
        tally: &mut Tally,
    ) -> Result<(), JobError> {
        let id = &self.job_id;
        match outcome {
            ItemOutcome::Skipped => {
                tally.skipped += 1;
                metrics::record_object(item.object_type.as_str(), "skipped");
                self.recorder.add_log(
                    id,
                    LogLevel::Warning,
                    format!("Skipped {name}: {NO_SOURCE_SQL}"),
                )?;
                self.recorder.add_object_result(
                    id,
                    ObjectResult::new(name, item.object_type, ObjectStatus::Skipped)
                        .with_error(NO_SOURCE_SQL),
                )?;
                self.recorder.update_progress(id, ProgressUpdate::skipped())
            }
            ItemOutcome::Succeeded {
                execution_time_ms,
                translated_sql,
                usage,
            } => {
                tally.succeeded += 1;
                metrics::record_object(item.object_type.as_str(), "success");
                let verb = if self.dry_run { "Validated" } else { "Migrated" };
                self.recorder.add_log(
                    id,
                    LogLevel::Info,
                    format!("{verb} {name} in {execution_time_ms} ms"),
                )?;
                self.recorder.add_object_result(
                    id,
                    ObjectResult::new(name, item.object_type, ObjectStatus::Success)
                        .with_execution_time(execution_time_ms)
                        .with_translated_sql(translated_sql),
                )?;
                self.recorder
                    .update_progress(id, ProgressUpdate::completed().with_usage(usage))
            }
            ItemOutcome::Failed {
                error,
                translated_sql,
                usage,
            } => {
                tally.failed += 1;
                metrics::record_object(item.object_type.as_str(), "error");
                tracing::warn!(object = %name, error = %error, "Object migration failed");
                self.recorder
                    .add_log(id, LogLevel::Error, format!("Failed {name}: {error}"))?;
                let mut result = ObjectResult::new(name, item.object_type, ObjectStatus::Error)
                    .with_error(error)
                    .with_source_sql(item.source_sql.clone());
                if let Some(sql) = translated_sql {
                    result = result.with_translated_sql(sql);
                }
                self.recorder.add_object_result(id, result)?;
                let mut update = ProgressUpdate::failed();
                update.usage = usage;
                self.recorder.update_progress(id, update)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic in work item".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_payloads() {
        let p: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*p), "boom");
        let p: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(&*p), "owned boom");
        let p: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*p), "panic in work item");
    }
}
