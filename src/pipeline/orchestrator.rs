//! Orchestrator - executes the configured batch jobs
//!
//! Each runner is one full pass: read inputs, compute, persist, report.
//! The scheduler outside this process is responsible for making sure two
//! runs never overlap on the same entity.

use crate::calendar::PeriodGenerator;
use crate::config::{CalendarJobConfig, RollupJobConfig, SnapshotJobConfig};
use crate::error::AppResult;
use crate::extract::load_extract;
use crate::hierarchy::{CategoryRow, HierarchyWalker};
use crate::history::{HistorizedRecord, SnapshotEngine, SnapshotOptions};
use crate::pipeline::types::{JobKind, RunResult};
use crate::state::AppState;
use chrono::Utc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// Name of the reporting-period dimension table
const PERIODS_TABLE: &str = "reporting_periods";
/// Name of the category rollup table
const ROLLUP_TABLE: &str = "category_rollup";

/// Orchestrator for running batch jobs against the warehouse
pub struct JobOrchestrator;

impl JobOrchestrator {
    pub fn new() -> Self {
        Self
    }

    /// Rebuild the reporting-period dimension. Stateless: the table is
    /// fully recomputed from the configured range on every run.
    pub async fn run_calendar(
        &self,
        state: &AppState,
        config: &CalendarJobConfig,
    ) -> AppResult<RunResult> {
        let started = Instant::now();
        info!(
            "Building reporting periods {} .. {} at {} granularities",
            config.start_date,
            config.end_date,
            config.granularities.len()
        );

        let rows = PeriodGenerator::generate(
            config.start_date,
            config.end_date,
            &config.granularities,
            &state.holidays,
        )?;
        state.warehouse.save_table(PERIODS_TABLE, &rows)?;

        Ok(RunResult {
            id: Uuid::new_v4(),
            job: JobKind::Calendar,
            success: true,
            rows_written: rows.len(),
            inserts: 0,
            expirations: 0,
            duration_ms: started.elapsed().as_millis() as u64,
            executed_at: Utc::now(),
        })
    }

    /// Run one SCD Type 2 snapshot pass for an entity: load its history,
    /// diff the extract against the open rows, commit the plan atomically
    /// and persist the history plus the current-row projection.
    pub async fn run_snapshot(
        &self,
        state: &AppState,
        config: &SnapshotJobConfig,
    ) -> AppResult<RunResult> {
        let started = Instant::now();
        let as_of = Utc::now();
        let history_table = format!("{}_history", config.entity);
        let current_table = format!("{}_current", config.entity);

        let existing: Vec<HistorizedRecord> = state.warehouse.load_table(&history_table)?;
        info!(
            "Snapshotting '{}': {} historized rows on disk",
            config.entity,
            existing.len()
        );
        state.history.seed(&config.entity, existing).await?;

        let extract = load_extract(&config.extract_path, &config.key_column)?;
        let options = SnapshotOptions {
            tracked_columns: config.tracked_columns.clone(),
            invalidate_hard_deletes: config.invalidate_hard_deletes,
            allow_empty_extract: config.allow_empty_extract,
        };

        let open = state.history.open_rows(&config.entity).await;
        let plan = SnapshotEngine::plan(&config.entity, &extract, &open, &options, as_of)?;
        info!(
            "Plan for '{}': {} new, {} changed, {} unchanged, {} expired",
            config.entity,
            plan.summary.new_entities,
            plan.summary.changed,
            plan.summary.unchanged,
            plan.summary.expired
        );

        if plan.is_noop() {
            info!("Nothing changed for '{}', history left as-is", config.entity);
        } else {
            state.history.apply(&plan).await?;
        }

        let full_history = state.history.dump(&config.entity).await;
        state.warehouse.save_table(&history_table, &full_history)?;
        let current = state.history.current(&config.entity).await;
        state.warehouse.save_table(&current_table, &current)?;

        Ok(RunResult {
            id: Uuid::new_v4(),
            job: JobKind::Snapshot,
            success: true,
            rows_written: full_history.len(),
            inserts: plan.inserts.len(),
            expirations: plan.expirations.len(),
            duration_ms: started.elapsed().as_millis() as u64,
            executed_at: as_of,
        })
    }

    /// Flatten the category hierarchy extract into the rollup table
    pub async fn run_rollup(
        &self,
        state: &AppState,
        config: &RollupJobConfig,
    ) -> AppResult<RunResult> {
        let started = Instant::now();

        let extract = load_extract(&config.extract_path, "id")?;
        let categories = extract
            .iter()
            .map(CategoryRow::from_source)
            .collect::<AppResult<Vec<_>>>()?;
        let rollups = HierarchyWalker::flatten(&categories)?;
        state.warehouse.save_table(ROLLUP_TABLE, &rollups)?;

        Ok(RunResult {
            id: Uuid::new_v4(),
            job: JobKind::CategoryRollup,
            success: true,
            rows_written: rollups.len(),
            inserts: 0,
            expirations: 0,
            duration_ms: started.elapsed().as_millis() as u64,
            executed_at: Utc::now(),
        })
    }
}

impl Default for JobOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}
