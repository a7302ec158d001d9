//! Precedence resolution for user preferences.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Project preferences (`.project/preferences.kdl`)
//! 3. System preferences (`$PM_CONFIG_DIR` or `~/.config/projectman/preferences.kdl`)
//! 4. Built-in defaults

use serde::Serialize;
use std::path::Path;

use crate::Result;
use crate::config::OutputFormat;
use crate::config::preferences::{Preferences, project_preferences_path, system_preferences_path};
use crate::models::Priority;

/// Environment variable consulted for the fallback assignee.
pub const USER_ENV: &str = "USER";

/// Assignee used when nothing else is configured.
pub const FALLBACK_ASSIGNEE: &str = "agent";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the project's preferences file
    Project,
    /// Value from the system preferences file
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Project => write!(f, "project"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved preferences with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPreferences {
    pub output_format: Resolved<OutputFormat>,
    pub default_assignee: Resolved<String>,
    pub default_priority: Resolved<Priority>,
}

impl Default for ResolvedPreferences {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            default_assignee: Resolved::new(FALLBACK_ASSIGNEE.to_string(), ValueSource::Default),
            default_priority: Resolved::new(Priority::Should, ValueSource::Default),
        }
    }
}

impl ResolvedPreferences {
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn default_assignee(&self) -> &str {
        &self.default_assignee.value
    }

    pub fn default_priority(&self) -> Priority {
        self.default_priority.value
    }
}

/// CLI overrides for preference resolution.
#[derive(Debug, Clone, Default)]
pub struct PreferenceOverrides {
    pub output_format: Option<OutputFormat>,
    pub default_assignee: Option<String>,
    pub default_priority: Option<Priority>,
}

impl PreferenceOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_default_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.default_assignee = Some(assignee.into());
        self
    }

    pub fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = Some(priority);
        self
    }
}

/// Resolve preferences from the standard file locations.
///
/// `project_dir` is the project data directory, when one has been found.
pub fn resolve_preferences(
    project_dir: Option<&Path>,
    overrides: &PreferenceOverrides,
) -> Result<ResolvedPreferences> {
    let system = match system_preferences_path() {
        Some(path) => Preferences::load(&path)?,
        None => Preferences::default(),
    };
    let project = match project_dir {
        Some(dir) => Preferences::load(&project_preferences_path(dir))?,
        None => Preferences::default(),
    };
    let user_env = std::env::var(USER_ENV).ok().filter(|u| !u.trim().is_empty());
    Ok(resolve_layers(&system, &project, user_env, overrides))
}

/// Pure precedence merge over already-loaded layers.
///
/// The `USER` environment value only participates in assignee resolution,
/// below both preference files.
pub fn resolve_layers(
    system: &Preferences,
    project: &Preferences,
    user_env: Option<String>,
    overrides: &PreferenceOverrides,
) -> ResolvedPreferences {
    let mut result = ResolvedPreferences::default();

    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = project.output_format {
        result.output_format = Resolved::new(format, ValueSource::Project);
    } else if let Some(format) = system.output_format {
        result.output_format = Resolved::new(format, ValueSource::System);
    }

    if let Some(ref assignee) = overrides.default_assignee {
        result.default_assignee = Resolved::new(assignee.clone(), ValueSource::CliFlag);
    } else if let Some(ref assignee) = project.default_assignee {
        result.default_assignee = Resolved::new(assignee.clone(), ValueSource::Project);
    } else if let Some(ref assignee) = system.default_assignee {
        result.default_assignee = Resolved::new(assignee.clone(), ValueSource::System);
    } else if let Some(user) = user_env {
        result.default_assignee = Resolved::new(user, ValueSource::EnvVar(USER_ENV.to_string()));
    }

    if let Some(priority) = overrides.default_priority {
        result.default_priority = Resolved::new(priority, ValueSource::CliFlag);
    } else if let Some(priority) = project.default_priority {
        result.default_priority = Resolved::new(priority, ValueSource::Project);
    } else if let Some(priority) = system.default_priority {
        result.default_priority = Resolved::new(priority, ValueSource::System);
    }

    result
}
