//! Historized Record Store
//!
//! Owns every write to the change history. Think of each entity's history
//! as "git log" for its source table: one commit per version, never
//! rewritten once closed.

use crate::error::{conflict_error, AppResult};
use crate::history::engine::SnapshotPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// One version of a tracked entity over a validity interval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorizedRecord {
    /// Natural id of the source entity (not unique at this layer)
    pub id: String,
    /// Tracked and passthrough column values as of this version
    pub values: BTreeMap<String, Value>,
    /// Content fingerprint over the tracked columns
    pub fingerprint: String,
    /// When this version became effective
    pub valid_from: DateTime<Utc>,
    /// When this version was superseded; None means "still current"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<Utc>>,
}

impl HistorizedRecord {
    pub fn is_current(&self) -> bool {
        self.valid_to.is_none()
    }
}

/// Verify the per-id interval invariants over a full history table:
/// intervals sorted by valid_from never overlap, and at most one row per id
/// is open.
pub fn check_invariants(records: &[HistorizedRecord]) -> AppResult<()> {
    let mut by_id: HashMap<&str, Vec<&HistorizedRecord>> = HashMap::new();
    for record in records {
        by_id.entry(record.id.as_str()).or_default().push(record);
    }

    for (id, mut versions) in by_id {
        versions.sort_by_key(|r| r.valid_from);

        let open_count = versions.iter().filter(|r| r.is_current()).count();
        if open_count > 1 {
            return Err(conflict_error(format!(
                "Id '{}' has {} open versions (at most one allowed)",
                id, open_count
            )));
        }

        for pair in versions.windows(2) {
            let earlier_end = match pair[0].valid_to {
                Some(end) => end,
                None => {
                    return Err(conflict_error(format!(
                        "Id '{}' has an open version that is not the latest",
                        id
                    )));
                }
            };
            if pair[1].valid_from < earlier_end {
                return Err(conflict_error(format!(
                    "Id '{}' has overlapping validity intervals",
                    id
                )));
            }
        }
    }

    Ok(())
}

/// Store for historized entity tables
pub struct HistoryStore {
    /// Entity name -> all versions, open and closed
    records: Arc<RwLock<HashMap<String, Vec<HistorizedRecord>>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Replace an entity's history with rows loaded from the warehouse.
    /// A table that already violates the interval invariants is refused.
    pub async fn seed(&self, entity: &str, rows: Vec<HistorizedRecord>) -> AppResult<()> {
        check_invariants(&rows)?;
        let mut records = self.records.write().await;
        records.insert(entity.to_string(), rows);
        Ok(())
    }

    /// The open row per id, keyed by natural id
    pub async fn open_rows(&self, entity: &str) -> HashMap<String, HistorizedRecord> {
        let records = self.records.read().await;
        records
            .get(entity)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.is_current())
                    .map(|r| (r.id.clone(), r.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply a snapshot plan atomically: every expiration and insert commits
    /// under a single write lock, or the whole plan is rejected.
    pub async fn apply(&self, plan: &SnapshotPlan) -> AppResult<()> {
        let mut records = self.records.write().await;
        let rows = records.entry(plan.entity.clone()).or_default();

        // Precondition pass before any mutation - a stale plan must not
        // half-apply.
        for id in &plan.expirations {
            let open = rows.iter().find(|r| r.id == *id && r.is_current());
            match open {
                None => {
                    return Err(conflict_error(format!(
                        "Plan expires id '{}' but it has no open version",
                        id
                    )));
                }
                Some(open) if open.valid_from > plan.as_of => {
                    return Err(conflict_error(format!(
                        "Plan timestamp precedes the open version of id '{}'",
                        id
                    )));
                }
                Some(_) => {}
            }
        }
        for insert in &plan.inserts {
            let still_open = rows
                .iter()
                .any(|r| r.id == insert.id && r.is_current())
                && !plan.expirations.contains(&insert.id);
            if still_open {
                return Err(conflict_error(format!(
                    "Plan inserts id '{}' but an open version already exists",
                    insert.id
                )));
            }
        }

        for id in &plan.expirations {
            if let Some(open) = rows.iter_mut().find(|r| r.id == *id && r.is_current()) {
                open.valid_to = Some(plan.as_of);
            }
        }
        rows.extend(plan.inserts.iter().cloned());

        info!(
            "Applied snapshot plan for '{}': {} inserts, {} expirations, {} rows total",
            plan.entity,
            plan.inserts.len(),
            plan.expirations.len(),
            rows.len()
        );
        Ok(())
    }

    /// Every version of one id, oldest first
    pub async fn history(&self, entity: &str, id: &str) -> Vec<HistorizedRecord> {
        let records = self.records.read().await;
        let mut versions: Vec<HistorizedRecord> = records
            .get(entity)
            .map(|rows| rows.iter().filter(|r| r.id == id).cloned().collect())
            .unwrap_or_default();
        versions.sort_by_key(|r| r.valid_from);
        versions
    }

    /// Current-row projection: only open versions. Downstream consumers
    /// read this; they never write through it.
    pub async fn current(&self, entity: &str) -> Vec<HistorizedRecord> {
        let records = self.records.read().await;
        let mut current: Vec<HistorizedRecord> = records
            .get(entity)
            .map(|rows| rows.iter().filter(|r| r.is_current()).cloned().collect())
            .unwrap_or_default();
        current.sort_by(|a, b| a.id.cmp(&b.id));
        current
    }

    /// Full table dump for persistence
    pub async fn dump(&self, entity: &str) -> Vec<HistorizedRecord> {
        let records = self.records.read().await;
        records.get(entity).cloned().unwrap_or_default()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
