// crates/core/src/executor/statement_api.rs
//! `SqlExecutor` backed by the SQL Statement Execution REST API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ExecutionOutcome, SqlExecutor, TargetLocation};
use crate::error::ExecutionError;
use crate::llm::config::normalize_host;

/// Longest server-side wait the API accepts per request.
const WAIT_TIMEOUT: &str = "50s";
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Warehouse connection settings.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub host: String,
    pub token: Option<String>,
    pub warehouse_id: Option<String>,
    /// Upper bound on a single statement, including polling.
    pub timeout_secs: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: None,
            warehouse_id: None,
            timeout_secs: 300,
        }
    }
}

impl WarehouseConfig {
    /// Read `DATABRICKS_HOST`, `DATABRICKS_TOKEN`, `DATABRICKS_WAREHOUSE_ID`
    /// (falling back to the last segment of `DATABRICKS_HTTP_PATH`) and
    /// `DW_MIGRATE_STATEMENT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let warehouse_id = std::env::var("DATABRICKS_WAREHOUSE_ID")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| {
                std::env::var("DATABRICKS_HTTP_PATH")
                    .ok()
                    .and_then(|p| warehouse_id_from_http_path(&p))
            });
        Self {
            host: std::env::var("DATABRICKS_HOST").unwrap_or_default(),
            token: std::env::var("DATABRICKS_TOKEN").ok().filter(|t| !t.is_empty()),
            warehouse_id,
            timeout_secs: std::env::var("DW_MIGRATE_STATEMENT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && self.token.is_some() && self.warehouse_id.is_some()
    }
}

/// `/sql/1.0/warehouses/abc123` -> `abc123`.
pub fn warehouse_id_from_http_path(http_path: &str) -> Option<String> {
    http_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    warehouse_id: &'a str,
    statement: &'a str,
    catalog: &'a str,
    schema: &'a str,
    wait_timeout: &'a str,
    on_wait_timeout: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    statement_id: Option<String>,
    status: StatementStatus,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<StatementErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StatementErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct StatementApiExecutor {
    http_client: Client,
    config: WarehouseConfig,
}

impl StatementApiExecutor {
    pub fn new(config: WarehouseConfig) -> Result<Self, ExecutionError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(60)))
            .build()
            .map_err(|e| ExecutionError::NotConfigured(e.to_string()))?;
        Ok(Self {
            http_client,
            config,
        })
    }

    fn statements_url(&self) -> String {
        format!("{}/api/2.0/sql/statements", normalize_host(&self.config.host))
    }

    async fn run_statement(
        &self,
        statement: &str,
        target: &TargetLocation,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let (Some(token), Some(warehouse_id)) =
            (self.config.token.as_deref(), self.config.warehouse_id.as_deref())
        else {
            return Err(ExecutionError::NotConfigured(
                "DATABRICKS_TOKEN and DATABRICKS_WAREHOUSE_ID must be set".to_string(),
            ));
        };
        if self.config.host.is_empty() {
            return Err(ExecutionError::NotConfigured(
                "DATABRICKS_HOST is not set".to_string(),
            ));
        }

        let start = Instant::now();
        let deadline = start + Duration::from_secs(self.config.timeout_secs);
        let body = StatementRequest {
            warehouse_id,
            statement,
            catalog: &target.catalog,
            schema: &target.schema,
            wait_timeout: WAIT_TIMEOUT,
            on_wait_timeout: "CONTINUE",
        };

        let response = self
            .http_client
            .post(self.statements_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExecutionError::Network(e.to_string()))?;
        let mut current = parse_response(response).await?;

        loop {
            match current.status.state.as_str() {
                "SUCCEEDED" => {
                    let execution_time_ms = start.elapsed().as_millis() as u64;
                    tracing::debug!(
                        statement_id = current.statement_id.as_deref().unwrap_or(""),
                        execution_time_ms,
                        "Statement succeeded"
                    );
                    return Ok(ExecutionOutcome { execution_time_ms });
                }
                "PENDING" | "RUNNING" => {}
                state => {
                    let message = current
                        .status
                        .error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| format!("statement ended in state {state}"));
                    return Err(ExecutionError::StatementFailed {
                        state: state.to_string(),
                        message,
                    });
                }
            }

            let Some(statement_id) = current.statement_id.clone() else {
                return Err(ExecutionError::ParseFailed(
                    "pending statement without statement_id".to_string(),
                ));
            };
            if Instant::now() >= deadline {
                // Best effort; the statement is abandoned either way.
                let _ = self
                    .http_client
                    .post(format!("{}/{}/cancel", self.statements_url(), statement_id))
                    .bearer_auth(token)
                    .send()
                    .await;
                return Err(ExecutionError::StatementFailed {
                    state: "TIMEOUT".to_string(),
                    message: format!(
                        "statement did not finish within {}s",
                        self.config.timeout_secs
                    ),
                });
            }

            tokio::time::sleep(POLL_INTERVAL).await;
            let response = self
                .http_client
                .get(format!("{}/{}", self.statements_url(), statement_id))
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| ExecutionError::Network(e.to_string()))?;
            current = parse_response(response).await?;
        }
    }
}

async fn parse_response(response: reqwest::Response) -> Result<StatementResponse, ExecutionError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "Statement API error");
        return Err(ExecutionError::Api {
            status: status.as_u16(),
            message: message.chars().take(500).collect(),
        });
    }
    response
        .json()
        .await
        .map_err(|e| ExecutionError::ParseFailed(e.to_string()))
}

#[async_trait]
impl SqlExecutor for StatementApiExecutor {
    async fn execute(
        &self,
        sql: &str,
        target: &TargetLocation,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        self.run_statement(sql.trim(), target).await
    }

    async fn validate(
        &self,
        sql: &str,
        target: &TargetLocation,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let statement = format!("EXPLAIN {}", sql.trim().trim_end_matches(';'));
        self.run_statement(&statement, target).await
    }
}
