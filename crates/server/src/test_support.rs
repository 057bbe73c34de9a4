// crates/server/src/test_support.rs
//! Collaborator stubs for in-crate tests.

use std::sync::Arc;

use async_trait::async_trait;
use dw_migrate_core::{
    ExecutionError, ExecutionOutcome, InventoryExtractor, SqlExecutor, TargetLocation,
    Translation, TranslationError, TranslationMetrics, TranslationRequest, Translator,
};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Echoes the source SQL back as its translation.
pub struct EchoTranslator;

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate(&self, request: TranslationRequest) -> Result<Translation, TranslationError> {
        Ok(Translation {
            translated_sql: request.source_sql,
            metrics: TranslationMetrics {
                model_used: request.model_id,
                ..Default::default()
            },
        })
    }

    fn name(&self) -> &str {
        "echo"
    }
}

pub struct OkExecutor;

#[async_trait]
impl SqlExecutor for OkExecutor {
    async fn execute(&self, _sql: &str, _target: &TargetLocation) -> Result<ExecutionOutcome, ExecutionError> {
        Ok(ExecutionOutcome { execution_time_ms: 1 })
    }

    async fn validate(&self, _sql: &str, _target: &TargetLocation) -> Result<ExecutionOutcome, ExecutionError> {
        Ok(ExecutionOutcome { execution_time_ms: 1 })
    }
}

pub fn test_state() -> Arc<AppState> {
    AppState::new(
        ServerConfig {
            poll_interval: std::time::Duration::from_millis(10),
            ..Default::default()
        },
        Arc::new(InventoryExtractor::new()),
        Arc::new(EchoTranslator),
        Arc::new(OkExecutor),
    )
}
