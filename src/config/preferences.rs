//! KDL schema for user preferences (`preferences.kdl`).
//!
//! ```kdl
//! // User preferences - safe to sync across machines
//! output-format "human"  // or "json"
//! default-assignee "alice"
//! default-priority "must"
//! ```

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;
use crate::config::OutputFormat;
use crate::models::Priority;

/// File name used at both project and system level.
pub const PREFERENCES_FILE: &str = "preferences.kdl";

/// Environment variable overriding the system preferences directory.
pub const CONFIG_DIR_ENV: &str = "PM_CONFIG_DIR";

/// User preferences. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Assignee used by `pm task grab` when none is given
    pub default_assignee: Option<String>,

    /// Priority for newly created epics and stories
    pub default_priority: Option<Priority>,
}

fn first_string<'a>(doc: &'a KdlDocument, key: &str) -> Option<&'a str> {
    doc.get(key)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
}

fn string_node(key: &str, value: &str) -> KdlNode {
    let mut node = KdlNode::new(key);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    node
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse preferences from a KDL document.
    ///
    /// Unknown keys and unparseable values are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut prefs = Self::new();

        if let Some(s) = first_string(doc, "output-format") {
            prefs.output_format = OutputFormat::parse(s);
        }

        if let Some(s) = first_string(doc, "default-assignee") {
            let name = s.trim();
            if !name.is_empty() {
                prefs.default_assignee = Some(name.to_string());
            }
        }

        if let Some(s) = first_string(doc, "default-priority") {
            prefs.default_priority = s.parse::<Priority>().ok();
        }

        prefs
    }

    /// Convert preferences to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            doc.nodes_mut().push(string_node("output-format", format.as_str()));
        }
        if let Some(ref assignee) = self.default_assignee {
            doc.nodes_mut().push(string_node("default-assignee", assignee));
        }
        if let Some(priority) = self.default_priority {
            doc.nodes_mut().push(string_node("default-priority", priority.as_str()));
        }

        doc
    }

    /// Merge another layer into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Preferences) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.default_assignee.is_some() {
            self.default_assignee = other.default_assignee.clone();
        }
        if other.default_priority.is_some() {
            self.default_priority = other.default_priority;
        }
    }

    /// Load preferences from a file. A missing file yields empty preferences.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let doc: KdlDocument = content.parse()?;
        Ok(Self::from_kdl(&doc))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_kdl().to_string())?;
        Ok(())
    }
}

/// Path of the system-level preferences file.
///
/// `$PM_CONFIG_DIR/preferences.kdl` when set, otherwise
/// `<config_dir>/projectman/preferences.kdl`.
pub fn system_preferences_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir).join(PREFERENCES_FILE));
        }
    }
    dirs::config_dir().map(|d| d.join("projectman").join(PREFERENCES_FILE))
}

/// Path of the project-level preferences file inside a data directory.
pub fn project_preferences_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PREFERENCES_FILE)
}
