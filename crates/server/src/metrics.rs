//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric definitions for jobs, objects and API requests
//! - Helper functions for recording metrics

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "migration_requests_total",
        "Total number of API requests to migration endpoints"
    );
    describe_histogram!(
        "migration_request_duration_seconds",
        "Duration of API requests in seconds"
    );

    describe_counter!("migration_jobs_started_total", "Migration jobs started");
    describe_counter!(
        "migration_jobs_finished_total",
        "Migration jobs finished, by final status"
    );
    describe_histogram!(
        "migration_job_duration_seconds",
        "Wall-clock duration of migration jobs in seconds"
    );
    describe_gauge!("migration_jobs_running", "Migration jobs currently running");

    describe_counter!(
        "migration_objects_total",
        "Work items processed, by object type and outcome"
    );
    describe_counter!(
        "migration_llm_tokens_total",
        "LLM tokens consumed by translations"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record a completed API request.
pub fn record_request(endpoint: &str, status: &str, duration: Duration) {
    counter!("migration_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("migration_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_job_started() {
    counter!("migration_jobs_started_total").increment(1);
    gauge!("migration_jobs_running").increment(1.0);
}

/// Record a job leaving the running state. `status` is the final status, or
/// "deleted" when the record disappeared mid-run.
pub fn record_job_finished(status: &str, duration: Duration) {
    counter!("migration_jobs_finished_total", "status" => status.to_string()).increment(1);
    histogram!("migration_job_duration_seconds").record(duration.as_secs_f64());
    gauge!("migration_jobs_running").decrement(1.0);
}

pub fn record_object(object_type: &str, status: &str) {
    counter!(
        "migration_objects_total",
        "object_type" => object_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_tokens(model: &str, tokens: u64) {
    counter!("migration_llm_tokens_total", "model" => model.to_string()).increment(tokens);
}

/// Helper for timing request handlers.
///
/// ```ignore
/// let timer = RequestTimer::new("start_job");
/// // ... do work ...
/// timer.finish("202");
/// ```
pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
        }
    }

    pub fn finish(self, status: &str) {
        record_request(self.endpoint, status, self.start.elapsed());
    }
}
