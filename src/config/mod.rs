//! Configuration for projectman.
//!
//! Two distinct kinds of configuration live here:
//!
//! ## config.yaml - Project data config (committed with the project)
//!
//! Located at `.project/config.yaml`. Holds the project name, ID prefix,
//! hub flag, registered sub-projects and the story/epic ID counters.
//!
//! ## preferences.kdl - User preferences
//!
//! Located at:
//! - Project: `.project/preferences.kdl`
//! - System: `$PM_CONFIG_DIR/preferences.kdl` or `~/.config/projectman/preferences.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `default-assignee` - Assignee used when claiming tasks
//! - `default-priority` - Priority for new epics and stories
//!
//! ## Precedence
//!
//! CLI flag > project preferences > system preferences > defaults.
//! Use the [`resolver`] module for precedence resolution.

pub mod preferences;
pub mod resolver;
pub mod schema;

pub use preferences::Preferences;
pub use resolver::{
    PreferenceOverrides, Resolved, ResolvedPreferences, ValueSource, resolve_preferences,
};
pub use schema::{OutputFormat, ProjectConfig};

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Name of the project data directory.
pub const PROJECT_DIR: &str = ".project";

/// Name of the project data config file.
pub const CONFIG_FILE: &str = "config.yaml";

/// Walk up from `start` to the first directory containing `.project/config.yaml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(PROJECT_DIR).join(CONFIG_FILE).is_file() {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(Error::NotInitialized)
}
