//! Schema for the project data config (`.project/config.yaml`) and the
//! shared output-format preference.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_prefix() -> String {
    "PRJ".to_string()
}

fn default_counter() -> u32 {
    1
}

/// Per-project settings and ID counters stored in `config.yaml`.
///
/// # YAML Schema
///
/// ```yaml
/// name: my-project
/// prefix: PRJ
/// description: ""
/// hub: false
/// next_story_id: 1
/// next_epic_id: 1
/// projects: []
/// repo: ""
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,

    /// ID prefix, uppercase ASCII letters only
    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub description: String,

    /// Whether this project aggregates registered sub-projects
    #[serde(default)]
    pub hub: bool,

    #[serde(default = "default_counter")]
    pub next_story_id: u32,

    #[serde(default = "default_counter")]
    pub next_epic_id: u32,

    /// Registered sub-project names (hub only)
    #[serde(default)]
    pub projects: Vec<String>,

    /// Upstream repository of a hub sub-project
    #[serde(default)]
    pub repo: String,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: default_prefix(),
            description: String::new(),
            hub: false,
            next_story_id: 1,
            next_epic_id: 1,
            projects: Vec::new(),
            repo: String::new(),
        }
    }

    /// Validate the config values.
    pub fn validate(&self) -> Result<()> {
        validate_prefix(&self.prefix)?;
        if self.name.trim().is_empty() {
            return Err(Error::Config("project name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ProjectConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config file, replacing any existing content.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Prefixes are non-empty and made of uppercase ASCII letters.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Prefix must be uppercase letters, got '{}'",
            prefix
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("human"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("xml"), None);
    }

    #[test]
    fn test_defaults_applied_on_load() {
        let config: ProjectConfig = serde_yaml::from_str("name: demo\n").unwrap();
        assert_eq!(config.prefix, "PRJ");
        assert_eq!(config.next_story_id, 1);
        assert_eq!(config.next_epic_id, 1);
        assert!(!config.hub);
        assert!(config.projects.is_empty());
        assert_eq!(config.repo, "");
    }

    #[test]
    fn test_prefix_validation() {
        assert!(validate_prefix("ABC").is_ok());
        assert!(validate_prefix("abc").is_err());
        assert!(validate_prefix("AB1").is_err());
        assert!(validate_prefix("").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = ProjectConfig::new("demo");
        config.prefix = "DEM".to_string();
        config.next_story_id = 7;
        config.save(&path).unwrap();

        let loaded = ProjectConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_bad_prefix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "name: demo\nprefix: lower\n").unwrap();
        assert!(matches!(ProjectConfig::load(&path), Err(Error::Config(_))));
    }
}
