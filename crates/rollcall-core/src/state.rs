use crate::error::Result;
use crate::paths;
use crate::scanner::ScanResult;
use crate::todo::TodoItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTodo {
    pub hash: String,
    #[serde(flatten)]
    pub todo: TodoItem,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMetadata {
    #[serde(default)]
    pub tool_version: String,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub files_scanned: usize,
}

// ---------------------------------------------------------------------------
// ScanState
// ---------------------------------------------------------------------------

/// Snapshot of a previous scan, kept in `.rollcall/state.json` so later runs
/// can report only the markers that appeared since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanState {
    pub last_updated: DateTime<Utc>,
    pub processed_todos: Vec<ProcessedTodo>,
    #[serde(default)]
    pub metadata: StateMetadata,
}

impl ScanState {
    pub fn from_scan(scan: &ScanResult) -> Self {
        Self {
            last_updated: Utc::now(),
            processed_todos: scan
                .todos
                .iter()
                .map(|todo| ProcessedTodo {
                    hash: todo.hash(),
                    todo: todo.clone(),
                })
                .collect(),
            metadata: StateMetadata {
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                total: scan.summary.total,
                files_scanned: scan.summary.files_scanned,
            },
        }
    }

    /// The saved state for `root`, or `None` if no scan has been saved yet.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = paths::state_path(root);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        crate::io::atomic_write(&paths::state_path(root), data.as_bytes())
    }

    pub fn hashes(&self) -> HashSet<&str> {
        self.processed_todos.iter().map(|p| p.hash.as_str()).collect()
    }

    /// Items in `todos` whose hash is not in this snapshot.
    pub fn find_new_todos<'t>(&self, todos: &'t [TodoItem]) -> Vec<&'t TodoItem> {
        let known = self.hashes();
        todos
            .iter()
            .filter(|t| !known.contains(t.hash().as_str()))
            .collect()
    }
}

/// Every item is new when there is no previous state.
pub fn find_new_todos<'t>(previous: Option<&ScanState>, todos: &'t [TodoItem]) -> Vec<&'t TodoItem> {
    match previous {
        Some(state) => state.find_new_todos(todos),
        None => todos.iter().collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
