//! Data models for projectman entities.
//!
//! This module defines the core data structures:
//! - `Epic` - Strategic grouping of stories
//! - `Story` - User-facing unit of work, decomposed into tasks
//! - `Task` - Smallest claimable unit of work
//! - `IndexEntry` / `ProjectIndex` - Derived index rebuilt from the entity files
//!
//! Entities are persisted as YAML frontmatter; the structs here are the
//! frontmatter schema. The markdown body travels alongside as a plain `String`.

pub mod id;
pub mod points;

pub use id::ItemId;
pub use points::{FIBONACCI_POINTS, Points};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Generates `as_str`, `Display` and `FromStr` for a kebab-case status enum.
macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Get the string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => {
                        let valid: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        Err(Error::InvalidInput(format!(
                            "Invalid {} '{}' (expected one of: {})",
                            $label,
                            other,
                            valid.join(", ")
                        )))
                    }
                }
            }
        }
    };
}

/// Epic lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EpicStatus {
    #[default]
    Draft,
    Active,
    Done,
    Archived,
}

string_enum!(EpicStatus, "epic status", {
    Draft => "draft",
    Active => "active",
    Done => "done",
    Archived => "archived",
});

/// Story lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoryStatus {
    #[default]
    Backlog,
    Ready,
    Active,
    Done,
    Archived,
}

string_enum!(StoryStatus, "story status", {
    Backlog => "backlog",
    Ready => "ready",
    Active => "active",
    Done => "done",
    Archived => "archived",
});

impl StoryStatus {
    /// Whether work is expected to be happening on the story right now.
    pub fn is_workable(&self) -> bool {
        matches!(self, StoryStatus::Active | StoryStatus::Ready)
    }

    /// Done or archived stories are closed for reporting purposes.
    pub fn is_closed(&self) -> bool {
        matches!(self, StoryStatus::Done | StoryStatus::Archived)
    }
}

/// Task workflow status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
    Blocked,
}

string_enum!(TaskStatus, "task status", {
    Todo => "todo",
    InProgress => "in-progress",
    Review => "review",
    Done => "done",
    Blocked => "blocked",
});

/// MoSCoW priority shared by epics and stories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Must,
    #[default]
    Should,
    Could,
    Wont,
}

string_enum!(Priority, "priority", {
    Must => "must",
    Should => "should",
    Could => "could",
    Wont => "wont",
});

impl Priority {
    /// Sort rank, lower is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Must => 0,
            Priority::Should => 1,
            Priority::Could => 2,
            Priority::Wont => 3,
        }
    }
}

/// A strategic grouping of stories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    /// Identifier (e.g., "EPIC-PRJ-1")
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub status: EpicStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub points: Option<Points>,

    /// Target completion date
    #[serde(default)]
    pub target_date: Option<NaiveDate>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub created: NaiveDate,

    pub updated: NaiveDate,
}

impl Epic {
    /// Create a new draft epic dated `today`.
    pub fn new(id: String, title: String, today: NaiveDate) -> Self {
        Self {
            id,
            title,
            status: EpicStatus::default(),
            priority: Priority::default(),
            points: None,
            target_date: None,
            tags: Vec::new(),
            created: today,
            updated: today,
        }
    }
}

/// A user-facing unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Identifier (e.g., "US-PRJ-1")
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub status: StoryStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub points: Option<Points>,

    /// Owning epic. Not checked at write time; the audit reports dangling references.
    #[serde(default)]
    pub epic_id: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub acceptance_criteria: Vec<String>,

    pub created: NaiveDate,

    pub updated: NaiveDate,
}

impl Story {
    /// Create a new backlog story dated `today`.
    pub fn new(id: String, title: String, today: NaiveDate) -> Self {
        Self {
            id,
            title,
            status: StoryStatus::default(),
            priority: Priority::default(),
            points: None,
            epic_id: None,
            tags: Vec::new(),
            acceptance_criteria: Vec::new(),
            created: today,
            updated: today,
        }
    }
}

/// The smallest actionable unit, claimable by an assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier (e.g., "US-PRJ-1-2")
    pub id: String,

    /// Parent story, which must exist when the task is created
    pub story_id: String,

    pub title: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub points: Option<Points>,

    #[serde(default)]
    pub assignee: Option<String>,

    pub created: NaiveDate,

    pub updated: NaiveDate,
}

impl Task {
    /// Create a new todo task dated `today`.
    pub fn new(id: String, story_id: String, title: String, today: NaiveDate) -> Self {
        Self {
            id,
            story_id,
            title,
            status: TaskStatus::default(),
            points: None,
            assignee: None,
            created: today,
            updated: today,
        }
    }
}

/// Kind of entity an index entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Epic,
    Story,
    Task,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Epic => "epic",
            EntityKind::Story => "story",
            EntityKind::Task => "task",
        }
    }

    /// Capitalized label used in report messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Epic => "Epic",
            EntityKind::Story => "Story",
            EntityKind::Task => "Task",
        }
    }

    /// Directory under the project data dir holding this kind's files.
    pub fn dir_name(&self) -> &'static str {
        match self {
            EntityKind::Epic => "epics",
            EntityKind::Story => "stories",
            EntityKind::Task => "tasks",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Any of the three entity types, as returned by ID-dispatched lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Item {
    Epic(Epic),
    Story(Story),
    Task(Task),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Epic(e) => &e.id,
            Item::Story(s) => &s.id,
            Item::Task(t) => &t.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Item::Epic(e) => &e.title,
            Item::Story(s) => &s.title,
            Item::Task(t) => &t.title,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Item::Epic(_) => EntityKind::Epic,
            Item::Story(_) => EntityKind::Story,
            Item::Task(_) => EntityKind::Task,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Item::Epic(e) => e.status.as_str(),
            Item::Story(s) => s.status.as_str(),
            Item::Task(t) => t.status.as_str(),
        }
    }

    pub fn points(&self) -> Option<Points> {
        match self {
            Item::Epic(e) => e.points,
            Item::Story(s) => s.points,
            Item::Task(t) => t.points,
        }
    }
}

/// One row of the derived project index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub status: String,
    #[serde(default)]
    pub points: Option<Points>,
    #[serde(default)]
    pub story_id: Option<String>,
    #[serde(default)]
    pub epic_id: Option<String>,
}

/// Derived index of every entity plus aggregate totals.
///
/// Always rebuilt from the entity files, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIndex {
    #[serde(default)]
    pub entries: Vec<IndexEntry>,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub completed_points: u32,
    #[serde(default)]
    pub story_count: usize,
    #[serde(default)]
    pub task_count: usize,
    #[serde(default)]
    pub epic_count: usize,
}

impl ProjectIndex {
    /// Completion percentage rounded to the nearest integer, 0 when nothing is estimated.
    pub fn completion_pct(&self) -> u32 {
        completion_pct(self.completed_points, self.total_points)
    }
}

/// `completed / total` as a percentage, halves rounded to even.
pub fn completion_pct(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round_ties_even() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn test_task_status_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        let err = "finished".parse::<StoryStatus>().unwrap_err();
        assert!(err.to_string().contains("backlog, ready, active, done, archived"));
    }

    #[test]
    fn test_priority_rank_order() {
        let ranks: Vec<u8> = Priority::ALL.iter().map(|p| p.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert_eq!(Priority::default(), Priority::Should);
    }

    #[test]
    fn test_story_defaults_on_deserialize() {
        let yaml = "id: US-PRJ-1\ntitle: Login\ncreated: 2026-03-01\nupdated: 2026-03-01\n";
        let story: Story = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(story.status, StoryStatus::Backlog);
        assert_eq!(story.priority, Priority::Should);
        assert!(story.acceptance_criteria.is_empty());
        assert_eq!(story.created, day());
    }

    #[test]
    fn test_story_rejects_non_fibonacci_points() {
        let yaml = "id: US-PRJ-1\ntitle: Login\npoints: 4\ncreated: 2026-03-01\nupdated: 2026-03-01\n";
        let err = serde_yaml::from_str::<Story>(yaml).unwrap_err();
        assert!(err.to_string().contains("fibonacci"));
    }

    #[test]
    fn test_story_workable_and_closed() {
        assert!(StoryStatus::Active.is_workable());
        assert!(StoryStatus::Ready.is_workable());
        assert!(!StoryStatus::Backlog.is_workable());
        assert!(StoryStatus::Archived.is_closed());
        assert!(!StoryStatus::Active.is_closed());
    }

    #[test]
    fn test_completion_pct() {
        assert_eq!(completion_pct(0, 0), 0);
        assert_eq!(completion_pct(1, 3), 33);
        assert_eq!(completion_pct(2, 3), 67);
    }

    #[test]
    fn test_completion_pct_rounds_halves_to_even() {
        assert_eq!(completion_pct(1, 8), 12);
        assert_eq!(completion_pct(3, 8), 38);
        assert_eq!(completion_pct(1, 200), 0);
        assert_eq!(completion_pct(3, 200), 2);
        assert_eq!(completion_pct(8, 8), 100);
    }

    #[test]
    fn test_item_accessors() {
        let task = Task::new("US-PRJ-1-1".into(), "US-PRJ-1".into(), "Wire it".into(), day());
        let item = Item::Task(task);
        assert_eq!(item.kind(), EntityKind::Task);
        assert_eq!(item.status(), "todo");
        assert_eq!(item.title(), "Wire it");
    }
}
