//! Entity identifiers and shape-based dispatch.
//!
//! Every lookup that accepts "some ID" goes through [`ItemId::parse`] once at
//! the boundary, after which the entity kind is carried in the type.
//!
//! Shapes:
//! - `EPIC-PRJ-1` - epic (fixed `EPIC-` prefix)
//! - `US-PRJ-1-2` - task (at least three segments, last two numeric)
//! - `US-PRJ-1` - story (anything else that is a valid ID)

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::models::EntityKind;
use crate::{Error, Result};

const EPIC_PREFIX: &str = "EPIC-";

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][\w-]*$").expect("Invalid regex"))
}

/// Check that `id` is safe to use as a file stem.
pub fn validate_id(id: &str) -> Result<()> {
    if id_pattern().is_match(id) {
        Ok(())
    } else {
        Err(Error::InvalidId(id.to_string()))
    }
}

/// A validated entity ID tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ItemId {
    Epic(String),
    Story(String),
    Task(String),
}

impl ItemId {
    /// Parse and classify an ID string.
    pub fn parse(raw: &str) -> Result<Self> {
        let id = raw.trim();
        validate_id(id)?;

        if id.starts_with(EPIC_PREFIX) {
            return Ok(ItemId::Epic(id.to_string()));
        }

        let segments: Vec<&str> = id.split('-').collect();
        let is_numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if segments.len() >= 3
            && is_numeric(segments[segments.len() - 1])
            && is_numeric(segments[segments.len() - 2])
        {
            return Ok(ItemId::Task(id.to_string()));
        }

        Ok(ItemId::Story(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ItemId::Epic(id) | ItemId::Story(id) | ItemId::Task(id) => id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            ItemId::Epic(_) => EntityKind::Epic,
            ItemId::Story(_) => EntityKind::Story,
            ItemId::Task(_) => EntityKind::Task,
        }
    }

    /// Parent story of a task ID (the ID with its last segment removed).
    pub fn story_id(&self) -> Option<&str> {
        match self {
            ItemId::Task(id) => id.rsplit_once('-').map(|(story, _)| story),
            _ => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ItemId::parse(s)
    }
}
