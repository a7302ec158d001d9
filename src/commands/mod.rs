//! Command implementations for the `pm` CLI.
//!
//! Each command returns a result type implementing [`Output`], which renders
//! either compact JSON (the default, for agents) or human-readable text.
//! Commands are grouped by concern:
//! - `project` - init, status, burndown, show, reindex
//! - `items` - epic, story and task CRUD plus claiming
//! - `work` - board, readiness, audit, search, estimation and scoping
//! - `hub` - sub-project registry, rollup and dashboards
//! - `maintenance` - malformed-file quarantine and preferences

mod hub;
mod items;
mod maintenance;
mod project;
mod work;

pub use hub::*;
pub use items::*;
pub use maintenance::*;
pub use project::*;
pub use work::*;

use serde::Serialize;
use std::path::Path;

use crate::Result;
use crate::config::find_project_root;
use crate::hub::project_store;
use crate::indexer;
use crate::models::Points;
use crate::storage::Store;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output: Serialize {
    /// Serialize to a compact JSON string.
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Open the project containing `repo`, or one of its hub sub-projects.
pub fn open_store(repo: &Path, project: Option<&str>) -> Result<Store> {
    let root = find_project_root(repo)?;
    let store = Store::open(&root)?;
    match project {
        Some(name) => project_store(&store, name),
        None => Ok(store),
    }
}

/// Rewrite the index after a mutation and hand the result back.
fn reindexed<T>(store: &Store, value: T) -> Result<T> {
    indexer::write_index(store)?;
    Ok(value)
}

fn points_label(points: Option<Points>) -> String {
    match points {
        Some(p) => format!("{}pts", p),
        None => "-".to_string(),
    }
}

/// Indent every line of `text` by two spaces.
fn indent(text: &str) -> String {
    text.lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("  {}", line) })
        .collect::<Vec<_>>()
        .join("\n")
}
