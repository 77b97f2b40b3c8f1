//! Snapshot Engine
//!
//! The core comparison engine: given a point-in-time extract and the open
//! rows of the historized table, compute the minimal set of inserts and
//! expirations that brings the history up to date. Planning is pure - the
//! store applies the result atomically.

use crate::error::{configuration_error, validation_error, AppResult};
use crate::extract::SourceRow;
use crate::history::fingerprint::compute_fingerprint;
use crate::history::store::HistorizedRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Per-entity snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOptions {
    /// Columns whose values define a version; anything else is carried
    /// along but never triggers a new version
    pub tracked_columns: Vec<String>,
    /// Close the open row of ids that vanished from the source. When off,
    /// a disappeared id's open row is left untouched (stale-but-current).
    pub invalidate_hard_deletes: bool,
    /// Explicit opt-in for treating an empty extract as authoritative.
    /// Guards against mass expiration from a transient empty read.
    pub allow_empty_extract: bool,
}

impl SnapshotOptions {
    pub fn new(tracked_columns: Vec<String>) -> Self {
        Self {
            tracked_columns,
            invalidate_hard_deletes: false,
            allow_empty_extract: false,
        }
    }
}

/// Summary statistics for a snapshot plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub source_rows: usize,
    pub new_entities: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub expired: usize,
}

/// The computed change set for one snapshot run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPlan {
    pub entity: String,
    pub as_of: DateTime<Utc>,
    /// New open versions to append (first appearances and replacements)
    pub inserts: Vec<HistorizedRecord>,
    /// Ids whose open row closes at `as_of`
    pub expirations: Vec<String>,
    pub summary: PlanSummary,
}

impl SnapshotPlan {
    /// True when re-running over unchanged input - nothing to commit
    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.expirations.is_empty()
    }
}

/// The engine that diffs an extract against the open history rows
pub struct SnapshotEngine;

impl SnapshotEngine {
    /// Compute the plan for one entity type.
    ///
    /// State machine per id: first appearance opens a version; a changed
    /// fingerprint closes the open version and opens a new one; an equal
    /// fingerprint is a no-op; an id missing from the extract expires only
    /// when `invalidate_hard_deletes` is on.
    pub fn plan(
        entity: &str,
        extract: &[SourceRow],
        open_rows: &HashMap<String, HistorizedRecord>,
        options: &SnapshotOptions,
        as_of: DateTime<Utc>,
    ) -> AppResult<SnapshotPlan> {
        if options.tracked_columns.is_empty() {
            return Err(configuration_error(format!(
                "Snapshot of '{}' has an empty tracked-column set",
                entity
            )));
        }
        if extract.is_empty() && options.invalidate_hard_deletes && !options.allow_empty_extract {
            return Err(validation_error(format!(
                "Refusing to expire all of '{}' from an empty extract; \
                 set allow_empty_extract if the source is really empty",
                entity
            )));
        }

        let mut inserts = Vec::new();
        let mut expirations = Vec::new();
        let mut summary = PlanSummary {
            source_rows: extract.len(),
            new_entities: 0,
            changed: 0,
            unchanged: 0,
            expired: 0,
        };

        let mut seen_ids: HashSet<&str> = HashSet::with_capacity(extract.len());
        for row in extract {
            if !seen_ids.insert(row.id.as_str()) {
                return Err(validation_error(format!(
                    "Extract for '{}' contains duplicate id '{}'",
                    entity, row.id
                )));
            }

            let fingerprint = compute_fingerprint(row, &options.tracked_columns)?;
            match open_rows.get(&row.id) {
                None => {
                    summary.new_entities += 1;
                    inserts.push(Self::open_version(row, fingerprint, as_of));
                }
                Some(open) if open.fingerprint != fingerprint => {
                    summary.changed += 1;
                    expirations.push(row.id.clone());
                    inserts.push(Self::open_version(row, fingerprint, as_of));
                }
                Some(_) => {
                    summary.unchanged += 1;
                }
            }
        }

        if options.invalidate_hard_deletes {
            let mut vanished: Vec<&String> = open_rows
                .keys()
                .filter(|id| !seen_ids.contains(id.as_str()))
                .collect();
            vanished.sort();
            for id in vanished {
                summary.expired += 1;
                expirations.push(id.clone());
            }
        }

        Ok(SnapshotPlan {
            entity: entity.to_string(),
            as_of,
            inserts,
            expirations,
            summary,
        })
    }

    fn open_version(
        row: &SourceRow,
        fingerprint: String,
        as_of: DateTime<Utc>,
    ) -> HistorizedRecord {
        HistorizedRecord {
            id: row.id.clone(),
            values: row.values.clone(),
            fingerprint,
            valid_from: as_of,
            valid_to: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn create_test_row(id: &str, city: &str) -> SourceRow {
        let values: BTreeMap<String, Value> = [
            ("city".to_string(), json!(city)),
            ("created_at".to_string(), json!("2020-05-01")),
        ]
        .into_iter()
        .collect();
        SourceRow::new(id, values)
    }

    fn create_test_options() -> SnapshotOptions {
        SnapshotOptions::new(vec!["city".to_string()])
    }

    fn open_rows_from(plan: &SnapshotPlan) -> HashMap<String, HistorizedRecord> {
        plan.inserts
            .iter()
            .map(|r| (r.id.clone(), r.clone()))
            .collect()
    }

    #[test]
    fn test_first_appearance_opens_a_version() {
        let extract = vec![create_test_row("7", "Lyon")];
        let plan = SnapshotEngine::plan(
            "customers",
            &extract,
            &HashMap::new(),
            &create_test_options(),
            ts(0),
        )
        .unwrap();

        assert_eq!(plan.inserts.len(), 1);
        assert!(plan.expirations.is_empty());
        assert_eq!(plan.summary.new_entities, 1);
        assert_eq!(plan.inserts[0].valid_from, ts(0));
        assert!(plan.inserts[0].is_current());
        // Passthrough columns ride along on the stored version
        assert_eq!(plan.inserts[0].values["created_at"], json!("2020-05-01"));
    }

    #[test]
    fn test_unchanged_source_is_idempotent() {
        let extract = vec![create_test_row("7", "Lyon"), create_test_row("8", "Nice")];
        let options = create_test_options();

        let first = SnapshotEngine::plan("customers", &extract, &HashMap::new(), &options, ts(0))
            .unwrap();
        let open = open_rows_from(&first);

        let second = SnapshotEngine::plan("customers", &extract, &open, &options, ts(0)).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.summary.unchanged, 2);
    }

    #[test]
    fn test_changed_tracked_column_supersedes_version() {
        let options = create_test_options();
        let first = SnapshotEngine::plan(
            "customers",
            &[create_test_row("7", "Lyon")],
            &HashMap::new(),
            &options,
            ts(0),
        )
        .unwrap();
        let open = open_rows_from(&first);

        let second = SnapshotEngine::plan(
            "customers",
            &[create_test_row("7", "Marseille")],
            &open,
            &options,
            ts(6),
        )
        .unwrap();

        assert_eq!(second.expirations, vec!["7".to_string()]);
        assert_eq!(second.inserts.len(), 1);
        assert_eq!(second.inserts[0].values["city"], json!("Marseille"));
        assert_eq!(second.inserts[0].valid_from, ts(6));
        assert_eq!(second.summary.changed, 1);
    }

    #[test]
    fn test_untracked_change_is_a_noop() {
        let options = create_test_options();
        let first = SnapshotEngine::plan(
            "customers",
            &[create_test_row("7", "Lyon")],
            &HashMap::new(),
            &options,
            ts(0),
        )
        .unwrap();
        let open = open_rows_from(&first);

        let mut row = create_test_row("7", "Lyon");
        row.values
            .insert("created_at".to_string(), json!("2021-01-01"));
        let second = SnapshotEngine::plan("customers", &[row], &open, &options, ts(6)).unwrap();
        assert!(second.is_noop());
    }

    #[test]
    fn test_hard_delete_expires_without_replacement() {
        let options = SnapshotOptions {
            invalidate_hard_deletes: true,
            ..create_test_options()
        };
        let first = SnapshotEngine::plan(
            "customers",
            &[create_test_row("7", "Lyon"), create_test_row("8", "Nice")],
            &HashMap::new(),
            &options,
            ts(0),
        )
        .unwrap();
        let open = open_rows_from(&first);

        let second = SnapshotEngine::plan(
            "customers",
            &[create_test_row("8", "Nice")],
            &open,
            &options,
            ts(6),
        )
        .unwrap();

        assert_eq!(second.expirations, vec!["7".to_string()]);
        assert!(second.inserts.is_empty());
        assert_eq!(second.summary.expired, 1);
    }

    #[test]
    fn test_disabled_invalidation_leaves_vanished_id_open() {
        let options = create_test_options();
        let first = SnapshotEngine::plan(
            "customers",
            &[create_test_row("7", "Lyon")],
            &HashMap::new(),
            &options,
            ts(0),
        )
        .unwrap();
        let open = open_rows_from(&first);

        let second = SnapshotEngine::plan("customers", &[], &open, &options, ts(6)).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.summary.expired, 0);
    }

    #[test]
    fn test_reappearance_restarts_history() {
        // After a hard delete nothing is open, so a returning id is a
        // plain first appearance again.
        let options = SnapshotOptions {
            invalidate_hard_deletes: true,
            allow_empty_extract: true,
            ..create_test_options()
        };
        let plan = SnapshotEngine::plan(
            "customers",
            &[create_test_row("7", "Lyon")],
            &HashMap::new(),
            &options,
            ts(12),
        )
        .unwrap();
        assert_eq!(plan.summary.new_entities, 1);
        assert_eq!(plan.inserts[0].valid_from, ts(12));
    }

    #[test]
    fn test_empty_extract_guard() {
        let options = SnapshotOptions {
            invalidate_hard_deletes: true,
            ..create_test_options()
        };
        let open: HashMap<String, HistorizedRecord> = HashMap::new();
        let err =
            SnapshotEngine::plan("customers", &[], &open, &options, ts(0)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let opted_in = SnapshotOptions {
            allow_empty_extract: true,
            ..options
        };
        assert!(SnapshotEngine::plan("customers", &[], &open, &opted_in, ts(0)).is_ok());
    }

    #[test]
    fn test_empty_tracked_columns_rejected() {
        let options = SnapshotOptions::new(vec![]);
        let err = SnapshotEngine::plan(
            "customers",
            &[create_test_row("7", "Lyon")],
            &HashMap::new(),
            &options,
            ts(0),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_extract_ids_rejected() {
        let extract = vec![create_test_row("7", "Lyon"), create_test_row("7", "Nice")];
        let err = SnapshotEngine::plan(
            "customers",
            &extract,
            &HashMap::new(),
            &create_test_options(),
            ts(0),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_coverage_every_extract_id_has_one_open_row() {
        let extract = vec![
            create_test_row("7", "Lyon"),
            create_test_row("8", "Nice"),
            create_test_row("9", "Brest"),
        ];
        let plan = SnapshotEngine::plan(
            "customers",
            &extract,
            &HashMap::new(),
            &create_test_options(),
            ts(0),
        )
        .unwrap();

        let open = open_rows_from(&plan);
        assert_eq!(open.len(), 3);
        for row in &extract {
            assert!(open[&row.id].is_current());
        }
    }
}
