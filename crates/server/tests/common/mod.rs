//! Shared collaborator stubs for the job engine integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dw_migrate_core::{
    ExecutionError, ExecutionOutcome, InventoryError, InventorySource, ObjectType, SqlExecutor,
    TargetLocation, TokenUsage, Translation, TranslationError, TranslationMetrics,
    TranslationRequest, Translator, WorkItem, WorkItemSource,
};
use dw_migrate_server::jobs::{JobController, JobId, JobRecord, JobStore, StartMigration};

/// Source SQL that makes [`ScriptedTranslator`] panic.
pub const PANIC_SQL: &str = "PANIC";

/// Hands out a fixed list of work items regardless of the inventory.
pub struct FixedSource(pub Vec<WorkItem>);

#[async_trait]
impl WorkItemSource for FixedSource {
    async fn extract(&self, _source: &InventorySource) -> Result<Vec<WorkItem>, InventoryError> {
        Ok(self.0.clone())
    }
}

/// Uppercases the input, optionally after a delay. Fails for source SQL in
/// `fail_on` and panics on [`PANIC_SQL`].
#[derive(Default)]
pub struct ScriptedTranslator {
    pub delay: Duration,
    pub fail_on: HashSet<String>,
    pub seen: Mutex<Vec<String>>,
}

impl ScriptedTranslator {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn failing(sql: &[&str]) -> Self {
        Self {
            fail_on: sql.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, request: TranslationRequest) -> Result<Translation, TranslationError> {
        self.seen.lock().unwrap().push(request.source_sql.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if request.source_sql == PANIC_SQL {
            panic!("translator blew up");
        }
        if self.fail_on.contains(&request.source_sql) {
            return Err(TranslationError::Api {
                status: 500,
                message: "model unavailable".to_string(),
            });
        }
        Ok(Translation {
            translated_sql: request.source_sql.to_uppercase(),
            metrics: TranslationMetrics {
                model_used: request.model_id,
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                    estimated_cost_usd: 0.0,
                },
                latency_ms: 1,
            },
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Counts calls; fails any statement containing `BAD`.
#[derive(Default)]
pub struct CountingExecutor {
    pub executed: AtomicUsize,
    pub validated: AtomicUsize,
}

impl CountingExecutor {
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn validated(&self) -> usize {
        self.validated.load(Ordering::SeqCst)
    }

    fn outcome(sql: &str) -> Result<ExecutionOutcome, ExecutionError> {
        if sql.contains("BAD") {
            Err(ExecutionError::StatementFailed {
                state: "FAILED".to_string(),
                message: "TABLE_OR_VIEW_NOT_FOUND".to_string(),
            })
        } else {
            Ok(ExecutionOutcome {
                execution_time_ms: 3,
            })
        }
    }
}

#[async_trait]
impl SqlExecutor for CountingExecutor {
    async fn execute(&self, sql: &str, _target: &TargetLocation) -> Result<ExecutionOutcome, ExecutionError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        Self::outcome(sql)
    }

    async fn validate(&self, sql: &str, _target: &TargetLocation) -> Result<ExecutionOutcome, ExecutionError> {
        self.validated.fetch_add(1, Ordering::SeqCst);
        Self::outcome(sql)
    }
}

pub fn table(name: &str, sql: &str) -> WorkItem {
    WorkItem::new("edw", name, ObjectType::Table, sql)
}

pub fn view(name: &str, sql: &str) -> WorkItem {
    WorkItem::new("edw", name, ObjectType::View, sql)
}

pub fn controller(
    items: Vec<WorkItem>,
    translator: Arc<ScriptedTranslator>,
    executor: Arc<CountingExecutor>,
) -> JobController {
    controller_with_store(Arc::new(JobStore::new()), items, translator, executor)
}

pub fn controller_with_store(
    store: Arc<JobStore>,
    items: Vec<WorkItem>,
    translator: Arc<ScriptedTranslator>,
    executor: Arc<CountingExecutor>,
) -> JobController {
    JobController::new(
        store,
        Arc::new(FixedSource(items)),
        translator,
        executor,
        Duration::from_millis(5),
    )
}

pub fn start_request(dry_run: bool) -> StartMigration {
    StartMigration {
        inventory: InventorySource::Inline(Default::default()),
        source_type: Some("teradata".to_string()),
        target_catalog: "main".to_string(),
        target_schema: "edw".to_string(),
        model_id: None,
        dry_run,
    }
}

/// Poll until the job is terminal. Panics after five seconds.
pub async fn wait_terminal(controller: &JobController, job_id: &JobId) -> JobRecord {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let record = controller.snapshot(job_id).expect("job exists");
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job reached a terminal state in time")
}
