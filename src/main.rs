//! DimFlow - Dimensional Warehouse Toolkit
//!
//! Batch jobs for a file-backed dimensional warehouse:
//! - Calendar: a dense date spine expanded into reporting-period rows
//! - Snapshot: SCD Type 2 historization of point-in-time source extracts
//! - Rollup: category hierarchy flattened to root/depth/path annotations
//!
//! One process run executes whichever jobs the environment configures,
//! writes the result tables and exits; scheduling and run serialization
//! live outside (cron, Airflow, whatever the deployment uses).

mod calendar;
mod config;
mod error;
mod extract;
mod hierarchy;
mod history;
mod pipeline;
mod state;
mod warehouse;

use crate::config::Settings;
use crate::pipeline::JobOrchestrator;
use crate::state::{AppState, SharedState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting DimFlow - Dimensional Warehouse Toolkit...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let state: SharedState = Arc::new(AppState::new(&settings)?);
    info!(
        "🗄️  Warehouse ready at {}",
        state.warehouse.root().display()
    );

    let orchestrator = JobOrchestrator::new();
    let mut reports = Vec::new();

    if let Some(calendar) = &settings.calendar {
        reports.push(orchestrator.run_calendar(&state, calendar).await?);
    }
    if let Some(snapshot) = &settings.snapshot {
        reports.push(orchestrator.run_snapshot(&state, snapshot).await?);
    }
    if let Some(rollup) = &settings.rollup {
        reports.push(orchestrator.run_rollup(&state, rollup).await?);
    }

    if reports.is_empty() {
        warn!("⚠️  No jobs configured, nothing to do");
        info!("");
        info!("📚 Configure jobs via environment variables:");
        info!("   ─── Calendar Dimension ───");
        info!("   CALENDAR_START=2020-01-01        - first spine date");
        info!("   CALENDAR_END=2025-12-31          - last spine date");
        info!("   CALENDAR_GRANULARITIES=day,month - optional, default all five");
        info!("   HOLIDAYS=10-28:National Day      - optional extra fixed dates");
        info!("");
        info!("   ─── SCD Type 2 Snapshot ───");
        info!("   SNAPSHOT_ENTITY=customers        - entity / table prefix");
        info!("   SNAPSHOT_EXTRACT=extract.json    - point-in-time extract file");
        info!("   SNAPSHOT_TRACKED_COLUMNS=city    - columns that open versions");
        info!("   SNAPSHOT_KEY_COLUMN=id           - optional natural-id field");
        info!("   SNAPSHOT_INVALIDATE_DELETES=true - optional hard-delete expiry");
        info!("");
        info!("   ─── Category Rollup ───");
        info!("   CATEGORY_EXTRACT=categories.json - flat (id, name, parent_id)");
        return Ok(());
    }

    info!("");
    info!("📊 Run reports:");
    for report in &reports {
        info!(
            "   {} [{}]: {} rows written, {} inserts, {} expirations, {}ms",
            report.job,
            report.id,
            report.rows_written,
            report.inserts,
            report.expirations,
            report.duration_ms
        );
    }

    info!("👋 Batch run complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dimflow=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}
