//! Shared pipeline types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kinds of batch job a run can execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Calendar,
    Snapshot,
    CategoryRollup,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobKind::Calendar => "calendar",
            JobKind::Snapshot => "snapshot",
            JobKind::CategoryRollup => "category_rollup",
        };
        write!(f, "{}", name)
    }
}

/// Report for one completed job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub id: Uuid,
    pub job: JobKind,
    pub success: bool,
    /// Rows in the table(s) the job wrote
    pub rows_written: usize,
    /// New versions opened (snapshot job only)
    pub inserts: usize,
    /// Versions closed (snapshot job only)
    pub expirations: usize,
    pub duration_ms: u64,
    pub executed_at: DateTime<Utc>,
}
