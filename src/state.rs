//! Application state management
//!
//! Contains the shared stores every job runs against. One AppState is
//! built per batch run from the loaded settings.

use crate::calendar::HolidayCalendar;
use crate::config::Settings;
use crate::error::AppResult;
use crate::history::HistoryStore;
use crate::warehouse::Warehouse;
use std::sync::Arc;

/// Shared state for one batch run
pub struct AppState {
    /// File-backed warehouse catalog all jobs read and write
    pub warehouse: Warehouse,

    /// Historized entity tables (exclusive owner of history writes)
    pub history: HistoryStore,

    /// Fixed-date holiday lookup for the calendar job
    pub holidays: HolidayCalendar,
}

impl AppState {
    /// Build run state from loaded settings
    pub fn new(settings: &Settings) -> AppResult<Self> {
        let warehouse = Warehouse::new(&settings.storage.warehouse_dir)?;
        let holidays = HolidayCalendar::standard(&settings.holidays)?;

        Ok(Self {
            warehouse,
            history: HistoryStore::new(),
            holidays,
        })
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
