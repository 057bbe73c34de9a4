// crates/server/src/routes/jobs.rs
//! API routes for migration jobs.
//!
//! - POST   /migrate/jobs                   - Start a job (202)
//! - GET    /migrate/jobs                   - List job summaries
//! - POST   /migrate/jobs/purge             - Drop long-terminal jobs
//! - GET    /migrate/jobs/{job_id}          - Point-in-time snapshot
//! - DELETE /migrate/jobs/{job_id}          - Delete a finished job
//! - POST   /migrate/jobs/{job_id}/cancel   - Request cancellation
//! - GET    /migrate/jobs/{job_id}/stream   - SSE delta stream
//! - GET    /migrate/jobs/{job_id}/errors   - Error report of failed objects

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dw_migrate_core::inventory::Inventory;
use dw_migrate_core::InventorySource;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ApiError, ApiResult};
use crate::jobs::report::error_report;
use crate::jobs::{
    CancelOutcome, JobId, JobRecord, JobSummary, StartMigration, StartedJob, StreamFrame,
};
use crate::metrics::RequestTimer;
use crate::state::AppState;

const DEFAULT_PURGE_AGE_SECS: u64 = 3600;

// ============================================================================
// Request/Response types
// ============================================================================

/// Body of POST /api/migrate/jobs. Exactly one of `inventory` and
/// `inventory_path` must be given.
#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    #[serde(default)]
    pub inventory: Option<Inventory>,
    #[serde(default)]
    pub inventory_path: Option<PathBuf>,
    #[serde(default)]
    pub source_type: Option<String>,
    pub target_catalog: String,
    pub target_schema: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

impl StartJobRequest {
    fn into_start(self) -> ApiResult<StartMigration> {
        let inventory = match (self.inventory, self.inventory_path) {
            (Some(inv), None) => InventorySource::Inline(inv),
            (None, Some(path)) => InventorySource::File(path),
            (Some(_), Some(_)) => {
                return Err(ApiError::BadRequest(
                    "give either inventory or inventory_path, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "inventory or inventory_path is required".to_string(),
                ))
            }
        };
        Ok(StartMigration {
            inventory,
            source_type: self.source_type,
            target_catalog: self.target_catalog,
            target_schema: self.target_schema,
            model_id: self.model_id,
            dry_run: self.dry_run,
        })
    }
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct DeleteJobResponse {
    pub job_id: JobId,
    pub deleted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurgeRequest {
    #[serde(default)]
    pub older_than_secs: Option<u64>,
}

#[derive(Debug, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct PurgeResponse {
    pub purged: Vec<JobId>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/migrate/jobs - Extract work items and start a job.
async fn start_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartJobRequest>,
) -> ApiResult<(StatusCode, Json<StartedJob>)> {
    let timer = RequestTimer::new("start_job");
    let result = async {
        let start = request.into_start()?;
        Ok::<_, ApiError>(state.jobs.start(start).await?)
    }
    .await;
    match result {
        Ok(started) => {
            timer.finish("202");
            Ok((StatusCode::ACCEPTED, Json(started)))
        }
        Err(e) => {
            timer.finish("error");
            Err(e)
        }
    }
}

/// GET /api/migrate/jobs - Summaries of all jobs, oldest first.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSummary>> {
    Json(state.jobs.list())
}

/// GET /api/migrate/jobs/{job_id} - Full job record.
async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(state.jobs.snapshot(&JobId::from(job_id))?))
}

/// POST /api/migrate/jobs/{job_id}/cancel - Cancel at the next item boundary.
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CancelOutcome>> {
    Ok(Json(state.jobs.cancel(&JobId::from(job_id))?))
}

/// DELETE /api/migrate/jobs/{job_id} - Delete a job that is no longer running.
async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<DeleteJobResponse>> {
    let job_id = JobId::from(job_id);
    let record = state.jobs.snapshot(&job_id)?;
    if !record.status.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Job {job_id} is still running; cancel it first"
        )));
    }
    state.jobs.delete(&job_id)?;
    Ok(Json(DeleteJobResponse {
        job_id,
        deleted: true,
    }))
}

/// GET /api/migrate/jobs/{job_id}/errors - SQL-comment report of failed
/// objects; 204 when nothing failed.
async fn job_errors(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let record = state.jobs.snapshot(&JobId::from(job_id))?;
    Ok(match error_report(&record) {
        Some(report) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            report,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// POST /api/migrate/jobs/purge - Drop jobs terminal for longer than
/// `older_than_secs` (default one hour). Running jobs are kept.
async fn purge_jobs(
    State(state): State<Arc<AppState>>,
    body: Option<Json<PurgeRequest>>,
) -> Json<PurgeResponse> {
    let older_than = body
        .and_then(|Json(b)| b.older_than_secs)
        .unwrap_or(DEFAULT_PURGE_AGE_SECS);
    let purged = state.jobs.purge_terminal(Duration::from_secs(older_than));
    Json(PurgeResponse { purged })
}

/// GET /api/migrate/jobs/{job_id}/stream - SSE stream of job deltas.
///
/// Events: `progress` for each delta, `complete` for the final one, `error`
/// when the job does not exist.
async fn stream_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let frames = state
        .jobs
        .stream(JobId::from(job_id), Some(state.shutdown.clone()));

    let stream = async_stream::stream! {
        let mut frames = std::pin::pin!(frames);
        while let Some(frame) = frames.next().await {
            let (event, json) = match &frame {
                StreamFrame::Delta(delta) => (
                    if delta.complete { "complete" } else { "progress" },
                    serde_json::to_string(delta),
                ),
                StreamFrame::Error(err) => ("error", serde_json::to_string(err)),
            };
            match json {
                Ok(json) => yield Ok(Event::default().event(event).data(json)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize SSE job delta");
                    continue;
                }
            }
        }
    };

    Sse::new(stream)
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/migrate/jobs", post(start_job).get(list_jobs))
        .route("/migrate/jobs/purge", post(purge_jobs))
        .route("/migrate/jobs/{job_id}", get(get_job).delete(delete_job))
        .route("/migrate/jobs/{job_id}/cancel", post(cancel_job))
        .route("/migrate/jobs/{job_id}/stream", get(stream_job))
        .route("/migrate/jobs/{job_id}/errors", get(job_errors))
}
