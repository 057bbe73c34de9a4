// crates/core/src/executor/mod.rs
//! Execution of translated SQL against the target lakehouse.

pub mod statement_api;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

pub use statement_api::{StatementApiExecutor, WarehouseConfig};

/// Catalog and schema a job writes into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLocation {
    pub catalog: String,
    pub schema: String,
}

impl TargetLocation {
    pub fn new(catalog: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
        }
    }
}

/// Successful statement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub execution_time_ms: u64,
}

/// Runs DDL/DML against the target warehouse.
///
/// Timeouts are the implementation's concern; the job engine only reacts to
/// the call returning.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(
        &self,
        sql: &str,
        target: &TargetLocation,
    ) -> Result<ExecutionOutcome, ExecutionError>;

    /// Syntax-only check used by dry runs. Never applies the statement.
    async fn validate(
        &self,
        sql: &str,
        target: &TargetLocation,
    ) -> Result<ExecutionOutcome, ExecutionError>;
}
