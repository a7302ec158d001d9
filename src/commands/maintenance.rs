//! Malformed-file quarantine and user preference commands.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{Output, reindexed};
use crate::config::preferences::{Preferences, project_preferences_path, system_preferences_path};
use crate::config::{OutputFormat, ResolvedPreferences};
use crate::models::{Item, Priority};
use crate::storage::{QuarantinedFile, Store};
use crate::{Error, Result};

// ==================== Malformed files ====================

#[derive(Serialize)]
pub struct MalformedList {
    pub files: Vec<String>,
    pub count: usize,
}

impl Output for MalformedList {
    fn to_human(&self) -> String {
        if self.files.is_empty() {
            return "No malformed files.".to_string();
        }
        let mut lines = vec![format!("{} malformed file(s):", self.count)];
        lines.extend(self.files.iter().map(|f| format!("  {}", f)));
        lines.join("\n")
    }
}

pub fn malformed_list(store: &Store) -> Result<MalformedList> {
    let files = store.list_malformed()?;
    Ok(MalformedList {
        count: files.len(),
        files,
    })
}

#[derive(Serialize)]
pub struct QuarantineResult {
    pub quarantined: Vec<QuarantinedFile>,
}

impl Output for QuarantineResult {
    fn to_human(&self) -> String {
        if self.quarantined.is_empty() {
            return "All entity files parse cleanly.".to_string();
        }
        let mut lines = vec![format!("Quarantined {} file(s):", self.quarantined.len())];
        for q in &self.quarantined {
            lines.push(format!("  {} ({}): {}", q.file, q.kind, q.error));
        }
        lines.join("\n")
    }
}

/// Move unparseable entity files aside so every listing sees a clean tree.
pub fn malformed_quarantine(store: &Store) -> Result<QuarantineResult> {
    let quarantined = store.quarantine_malformed()?;
    reindexed(store, QuarantineResult { quarantined })
}

#[derive(Serialize)]
pub struct MalformedContent {
    pub file: String,
    pub content: String,
}

impl Output for MalformedContent {
    fn to_human(&self) -> String {
        self.content.clone()
    }
}

pub fn malformed_show(store: &Store, file: &str) -> Result<MalformedContent> {
    Ok(MalformedContent {
        file: file.to_string(),
        content: store.read_malformed(file)?,
    })
}

#[derive(Serialize)]
pub struct Restored {
    pub restored: Item,
}

impl Output for Restored {
    fn to_human(&self) -> String {
        format!(
            "Restored {} {}: {}",
            self.restored.kind(),
            self.restored.id(),
            self.restored.title()
        )
    }
}

pub fn malformed_restore(store: &Store, file: &str) -> Result<Restored> {
    let restored = store.restore_malformed(file)?;
    reindexed(store, Restored { restored })
}

// ==================== Preferences ====================

impl Output for ResolvedPreferences {
    fn to_human(&self) -> String {
        [
            format!(
                "output-format    = {:<8} ({})",
                self.output_format.value.as_str(),
                self.output_format.source
            ),
            format!(
                "default-assignee = {:<8} ({})",
                self.default_assignee.value, self.default_assignee.source
            ),
            format!(
                "default-priority = {:<8} ({})",
                self.default_priority.value.as_str(),
                self.default_priority.source
            ),
        ]
        .join("\n")
    }
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl Output for ConfigSet {
    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

/// Write one preference key to the project file, or the system file when `global`.
pub fn config_set(project_dir: Option<&Path>, key: &str, value: &str, global: bool) -> Result<ConfigSet> {
    let path = if global {
        system_preferences_path()
            .ok_or_else(|| Error::Config("cannot determine the system config directory".to_string()))?
    } else {
        let dir = project_dir.ok_or(Error::NotInitialized)?;
        project_preferences_path(dir)
    };

    let mut prefs = Preferences::load(&path)?;
    let value = value.trim();
    match key {
        "output-format" => {
            let format = OutputFormat::parse(value).ok_or_else(|| {
                Error::InvalidInput(format!("Invalid output format '{}' (expected json or human)", value))
            })?;
            prefs.output_format = Some(format);
        }
        "default-assignee" => {
            if value.is_empty() {
                return Err(Error::InvalidInput("assignee must not be empty".to_string()));
            }
            prefs.default_assignee = Some(value.to_string());
        }
        "default-priority" => {
            prefs.default_priority = Some(value.parse::<Priority>()?);
        }
        other => {
            return Err(Error::InvalidInput(format!(
                "Unknown preference '{}' (expected output-format, default-assignee or default-priority)",
                other
            )));
        }
    }
    prefs.save(&path)?;
    tracing::info!(key = %key, path = %path.display(), "saved preference");

    Ok(ConfigSet {
        key: key.to_string(),
        value: value.to_string(),
        path,
    })
}
