//! API route handlers for the migration server.

pub mod health;
pub mod jobs;
pub mod metrics;
pub mod models;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET    /api/health - Health check
/// - GET    /api/models - Serving-endpoint model catalog
/// - GET    /api/metrics - Prometheus metrics
/// - POST   /api/migrate/jobs - Start a migration job
/// - GET    /api/migrate/jobs - List job summaries
/// - POST   /api/migrate/jobs/purge - Drop long-terminal jobs
/// - GET    /api/migrate/jobs/{job_id} - Job snapshot
/// - DELETE /api/migrate/jobs/{job_id} - Delete a finished job
/// - POST   /api/migrate/jobs/{job_id}/cancel - Cancel a running job
/// - GET    /api/migrate/jobs/{job_id}/stream - SSE stream of job deltas
/// - GET    /api/migrate/jobs/{job_id}/errors - Error report of failed objects
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", models::router())
        .nest("/api", metrics::router())
        .nest("/api", jobs::router())
        .with_state(state)
}
