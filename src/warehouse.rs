//! Warehouse Catalog
//!
//! File-backed table storage for batch runs. Each table is one JSON file
//! under the warehouse root; writes go to a temp file first and rename into
//! place, so an interrupted run leaves the previous table intact.

use crate::error::{validation_error, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Handle on the warehouse directory
#[derive(Debug, Clone)]
pub struct Warehouse {
    root: PathBuf,
}

impl Warehouse {
    /// Open (creating if needed) a warehouse rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, name: &str) -> AppResult<PathBuf> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(validation_error(format!(
                "Invalid table name '{}' (alphanumeric and underscore only)",
                name
            )));
        }
        Ok(self.root.join(format!("{}.json", name)))
    }

    /// Load a table. A table that was never written reads as empty.
    pub fn load_table<T: DeserializeOwned>(&self, name: &str) -> AppResult<Vec<T>> {
        let path = self.table_path(name)?;
        if !path.exists() {
            debug!("Table '{}' not present yet, reading as empty", name);
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&path)?;
        let rows = serde_json::from_str(&raw)?;
        Ok(rows)
    }

    /// Write a full table atomically (temp file + rename)
    pub fn save_table<T: Serialize>(&self, name: &str, rows: &[T]) -> AppResult<()> {
        let path = self.table_path(name)?;
        let tmp_path = self.root.join(format!("{}.json.tmp", name));

        let raw = serde_json::to_string_pretty(rows)?;
        std::fs::write(&tmp_path, raw)?;
        std::fs::rename(&tmp_path, &path)?;

        info!("Saved table '{}': {} rows", name, rows.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestRow {
        id: String,
        value: i64,
    }

    fn create_test_rows() -> Vec<TestRow> {
        vec![
            TestRow {
                id: "a".to_string(),
                value: 1,
            },
            TestRow {
                id: "b".to_string(),
                value: 2,
            },
        ]
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = Warehouse::new(dir.path()).unwrap();

        let rows = create_test_rows();
        warehouse.save_table("test_rows", &rows).unwrap();
        let loaded: Vec<TestRow> = warehouse.load_table("test_rows").unwrap();
        assert_eq!(loaded, rows);
    }

    #[test]
    fn test_unwritten_table_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = Warehouse::new(dir.path()).unwrap();
        let loaded: Vec<TestRow> = warehouse.load_table("nothing_here").unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_overwrites_whole_table() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = Warehouse::new(dir.path()).unwrap();

        warehouse.save_table("test_rows", &create_test_rows()).unwrap();
        let single = vec![TestRow {
            id: "c".to_string(),
            value: 3,
        }];
        warehouse.save_table("test_rows", &single).unwrap();

        let loaded: Vec<TestRow> = warehouse.load_table("test_rows").unwrap();
        assert_eq!(loaded, single);
    }

    #[test]
    fn test_rejects_path_traversal_names() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = Warehouse::new(dir.path()).unwrap();
        let err = warehouse.save_table("../evil", &create_test_rows()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = warehouse.save_table("", &create_test_rows()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = Warehouse::new(dir.path()).unwrap();
        warehouse.save_table("test_rows", &create_test_rows()).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }
}
