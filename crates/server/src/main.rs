// crates/server/src/main.rs
//! dw-migrate binary.
//!
//! `serve` starts the HTTP/SSE server. `run` drives one migration job from an
//! inventory file in-process and renders its progress in the terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dw_migrate_core::executor::{StatementApiExecutor, WarehouseConfig};
use dw_migrate_core::llm::{create_translator, LlmConfig};
use dw_migrate_core::{InventoryExtractor, InventorySource, SqlExecutor, Translator};
use dw_migrate_server::jobs::report::error_report;
use dw_migrate_server::jobs::{
    JobController, JobStatus, JobStore, LogLevel, StartMigration, StreamFrame,
};
use dw_migrate_server::metrics::init_metrics;
use dw_migrate_server::{create_app, AppState, ServerConfig};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "dw-migrate")]
#[command(version, about = "Translate and apply legacy warehouse SQL to a lakehouse")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "DW_MIGRATE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Stream poll interval in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// Migrate one inventory file and wait for the job to finish
    Run {
        /// Inventory JSON document
        #[arg(long)]
        inventory: PathBuf,
        #[arg(long)]
        catalog: String,
        #[arg(long)]
        schema: String,
        /// Source dialect; defaults to the inventory's `source_type`
        #[arg(long)]
        source_type: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Translate and validate without executing
        #[arg(long)]
        dry_run: bool,
        /// Write the error report of failed objects here
        #[arg(long)]
        error_report: Option<PathBuf>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,dw_migrate_server=info,dw_migrate_core=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().compact()))
        .init();
}

/// Build the translator and executor from the environment. Missing
/// credentials are reported as warnings; the first call then fails per item.
fn collaborators() -> Result<(Arc<dyn Translator>, Arc<dyn SqlExecutor>)> {
    let translator = create_translator(&LlmConfig::from_env())
        .context("failed to build the translation client")?;

    let warehouse = WarehouseConfig::from_env();
    if !warehouse.is_configured() {
        tracing::warn!(
            "DATABRICKS_HOST, DATABRICKS_TOKEN or DATABRICKS_WAREHOUSE_ID not set; execution will fail"
        );
    }
    let executor = StatementApiExecutor::new(warehouse)
        .context("failed to build the statement execution client")?;

    Ok((translator, Arc::new(executor)))
}

async fn serve(host: Option<String>, port: Option<u16>, poll_interval_ms: Option<u64>) -> Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(ms) = poll_interval_ms.filter(|ms| *ms > 0) {
        config.poll_interval = Duration::from_millis(ms);
    }

    let (translator, executor) = collaborators()?;
    let state = AppState::new(
        config.clone(),
        Arc::new(InventoryExtractor::new()),
        translator,
        executor,
    );
    let app = create_app(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;

    eprintln!("\n  dw-migrate v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  \u{2192} http://{}\n", config.bind_addr());
    tracing::info!(addr = %config.bind_addr(), "Server listening");

    let shutdown_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            tracing::info!("Shutdown requested; closing streams");
            shutdown_state.trigger_shutdown();
        })
        .await?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run(
    inventory: PathBuf,
    catalog: String,
    schema: String,
    source_type: Option<String>,
    model: Option<String>,
    dry_run: bool,
    report_path: Option<PathBuf>,
) -> Result<JobStatus> {
    let (translator, executor) = collaborators()?;
    let poll_interval = ServerConfig::from_env().poll_interval;
    let controller = Arc::new(JobController::new(
        Arc::new(JobStore::new()),
        Arc::new(InventoryExtractor::new()),
        translator,
        executor,
        poll_interval,
    ));

    let started = controller
        .start(StartMigration {
            inventory: InventorySource::File(inventory),
            source_type,
            target_catalog: catalog,
            target_schema: schema,
            model_id: model,
            dry_run,
        })
        .await?;
    let job_id = started.job_id.clone();

    let cancel_controller = Arc::clone(&controller);
    let cancel_job = job_id.clone();
    let cancel_watch = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("  Cancelling after the current object...");
            if let Err(e) = cancel_controller.cancel(&cancel_job) {
                tracing::warn!(error = %e, "Cancel failed");
            }
        }
    });

    let pb = ProgressBar::new(u64::from(started.total_objects));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let run_start = Instant::now();
    let mut frames = std::pin::pin!(controller.stream(job_id.clone(), None));
    while let Some(frame) = frames.next().await {
        match frame {
            StreamFrame::Delta(delta) => {
                for entry in &delta.new_logs {
                    if entry.level != LogLevel::Info {
                        pb.println(format!("  [{}] {}", entry.level, entry.message));
                    }
                }
                pb.set_position(u64::from(delta.completed_objects + delta.failed_objects));
                pb.set_message(delta.current_object.unwrap_or_default());
                if delta.complete {
                    break;
                }
            }
            StreamFrame::Error(err) => {
                pb.finish_and_clear();
                anyhow::bail!("{}: {}", err.error, job_id);
            }
        }
    }
    pb.finish_and_clear();
    cancel_watch.abort();

    let record = controller.snapshot(&job_id)?;
    eprintln!(
        "  {} {}: {} completed ({} skipped), {} failed of {} in {:.1}s",
        if record.status == JobStatus::Completed { "\u{2713}" } else { "\u{2717}" },
        record.status,
        record.completed_objects,
        record.skipped_objects,
        record.failed_objects,
        record.total_objects,
        run_start.elapsed().as_secs_f64(),
    );
    if record.usage.total_tokens > 0 {
        eprintln!(
            "  tokens: {} (${:.4})",
            record.usage.total_tokens, record.usage.estimated_cost_usd
        );
    }

    if let (Some(path), Some(report)) = (report_path, error_report(&record)) {
        tokio::fs::write(&path, report)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("  error report: {}", path.display());
    }

    Ok(record.status)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    // Exactly one rustls provider may be installed per process.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    init_metrics();

    match cli.command {
        Commands::Serve {
            host,
            port,
            poll_interval_ms,
        } => serve(host, port, poll_interval_ms).await,
        Commands::Run {
            inventory,
            catalog,
            schema,
            source_type,
            model,
            dry_run,
            error_report,
        } => {
            let status = run(
                inventory,
                catalog,
                schema,
                source_type,
                model,
                dry_run,
                error_report,
            )
            .await?;
            if status == JobStatus::Failed {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
