//! Category Hierarchy Rollup
//!
//! "Which root does this category roll up to?"
//! This module flattens a parent-pointer category table into one row per
//! category carrying its root, depth and full name path. The walk is
//! iterative (explicit queue), so deep trees cannot blow the call stack.

use crate::error::{conflict_error, validation_error, AppResult};
use crate::extract::SourceRow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};

/// One row of the flat category source table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl CategoryRow {
    /// Build a category row from a generic extract row. Expects a `name`
    /// column and an optional `parent_id` column.
    pub fn from_source(row: &SourceRow) -> AppResult<Self> {
        let name = match row.value("name") {
            Value::String(s) if !s.is_empty() => s.clone(),
            other => {
                return Err(validation_error(format!(
                    "Category '{}' has no usable name (got {})",
                    row.id, other
                )));
            }
        };
        let parent_id = match row.value("parent_id") {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            other => {
                return Err(validation_error(format!(
                    "Category '{}' has a non-scalar parent_id: {}",
                    row.id, other
                )));
            }
        };
        Ok(Self {
            id: row.id.clone(),
            name,
            parent_id,
        })
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A category annotated with its place in the tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRollup {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub root_id: String,
    pub root_name: String,
    /// Hops from the root; roots are depth 0
    pub depth: u32,
    /// Name chain from root to this category
    pub path: String,
}

/// The walker that flattens parent-pointer trees
pub struct HierarchyWalker;

impl HierarchyWalker {
    /// Flatten the category forest. Every input row comes back exactly once,
    /// ordered by (root_id, depth, id). A row pointing at a missing parent
    /// fails validation; rows trapped in a parent cycle fail the run.
    pub fn flatten(rows: &[CategoryRow]) -> AppResult<Vec<CategoryRollup>> {
        let mut by_id: HashMap<&str, &CategoryRow> = HashMap::with_capacity(rows.len());
        for row in rows {
            if by_id.insert(row.id.as_str(), row).is_some() {
                return Err(validation_error(format!(
                    "Duplicate category id '{}'",
                    row.id
                )));
            }
        }

        // Parent -> children adjacency, children sorted for stable output
        let mut children: HashMap<&str, Vec<&CategoryRow>> = HashMap::new();
        for row in rows {
            if let Some(parent_id) = &row.parent_id {
                if !by_id.contains_key(parent_id.as_str()) {
                    return Err(validation_error(format!(
                        "Category '{}' references missing parent '{}'",
                        row.id, parent_id
                    )));
                }
                children.entry(parent_id.as_str()).or_default().push(row);
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| a.id.cmp(&b.id));
        }

        // BFS from the roots, carrying accumulated rollup state per node
        let mut queue: VecDeque<(&CategoryRow, String, String, u32, String)> = VecDeque::new();
        for row in rows.iter().filter(|r| r.is_root()) {
            queue.push_back((
                row,
                row.id.clone(),
                row.name.clone(),
                0,
                row.name.clone(),
            ));
        }

        let mut visited: HashSet<&str> = HashSet::with_capacity(rows.len());
        let mut rollups = Vec::with_capacity(rows.len());
        while let Some((row, root_id, root_name, depth, path)) = queue.pop_front() {
            if !visited.insert(row.id.as_str()) {
                continue;
            }

            if let Some(descendants) = children.get(row.id.as_str()) {
                for child in descendants {
                    queue.push_back((
                        child,
                        root_id.clone(),
                        root_name.clone(),
                        depth + 1,
                        format!("{} > {}", path, child.name),
                    ));
                }
            }

            rollups.push(CategoryRollup {
                id: row.id.clone(),
                name: row.name.clone(),
                parent_id: row.parent_id.clone(),
                root_id,
                root_name,
                depth,
                path,
            });
        }

        // Anything the walk never reached sits in a parent cycle
        if visited.len() != rows.len() {
            let mut trapped: Vec<&str> = rows
                .iter()
                .filter(|r| !visited.contains(r.id.as_str()))
                .map(|r| r.id.as_str())
                .collect();
            trapped.sort();
            return Err(conflict_error(format!(
                "Category parent cycle detected involving: {}",
                trapped.join(", ")
            )));
        }

        rollups.sort_by(|a, b| {
            (&a.root_id, a.depth, &a.id).cmp(&(&b.root_id, b.depth, &b.id))
        });
        Ok(rollups)
    }
}
