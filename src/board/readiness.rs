//! Definition-of-Ready checks for claimable tasks.
//!
//! A task is ready when every hard gate passes:
//! - status is `todo`
//! - nobody is assigned
//! - it has a point estimate
//! - the trimmed description is at least 50 characters
//! - its parent story exists and is `active` or `ready`
//!
//! Soft checks produce warnings without blocking. All gates are evaluated;
//! a task failing several of them reports every failure.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use chrono::NaiveDate;
//! use projectman::board::readiness::check_readiness;
//! use projectman::models::{Story, Task};
//!
//! let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
//! let task = Task::new("US-PRJ-1-1".into(), "US-PRJ-1".into(), "Wire it".into(), day);
//! let stories: HashMap<String, Story> = HashMap::new();
//!
//! let result = check_readiness(&task, "", &stories);
//! assert!(!result.ready);
//! assert!(result.blockers.contains(&"parent story US-PRJ-1 not found".to_string()));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{Story, Task, TaskStatus};
use crate::storage::Store;

/// Thresholds for readiness and hint computation.
pub mod thresholds {
    /// Minimum trimmed description length for a claimable task.
    pub const MIN_DESCRIPTION_CHARS: usize = 50;

    /// Estimates above this draw a decomposition warning.
    pub const HIGH_POINTS: u8 = 5;

    /// Trimmed description length at which a task counts as well-scoped.
    pub const WELL_SCOPED_CHARS: usize = 200;

    /// Estimates at or below this are quick wins.
    pub const QUICK_WIN_POINTS: u8 = 3;
}

const DESIGN_KEYWORDS: [&str; 4] = ["design", "ux", "user experience", "mockup"];
const COORDINATION_KEYWORDS: [&str; 4] = ["coordinate", "vendor", "api key", "meeting"];

/// Resolves a story ID to the story, if it exists.
///
/// Any failure to produce the story (missing file, unreadable file) is
/// reported as `None` and becomes a "not found" blocker.
pub trait StoryLookup {
    fn lookup_story(&self, story_id: &str) -> Option<Story>;
}

impl StoryLookup for Store {
    fn lookup_story(&self, story_id: &str) -> Option<Story> {
        self.get_story(story_id).ok().map(|(story, _)| story)
    }
}

impl StoryLookup for HashMap<String, Story> {
    fn lookup_story(&self, story_id: &str) -> Option<Story> {
        self.get(story_id).cloned()
    }
}

/// Outcome of a readiness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResult {
    pub ready: bool,
    pub blockers: Vec<String>,
    pub warnings: Vec<String>,
}

fn trimmed_len(body: &str) -> usize {
    body.trim().chars().count()
}

fn has_impl_section(body_lower: &str) -> bool {
    body_lower.contains("## implementation")
}

fn has_testing_section(body_lower: &str) -> bool {
    body_lower.contains("## testing")
}

fn has_dod_checklist(body: &str) -> bool {
    body.contains("- [ ]")
}

/// Evaluate every hard gate and soft check for `task`.
pub fn check_readiness<L: StoryLookup + ?Sized>(task: &Task, body: &str, lookup: &L) -> ReadinessResult {
    let mut blockers = Vec::new();
    let mut warnings = Vec::new();

    if task.status != TaskStatus::Todo {
        blockers.push(format!("status is '{}', not 'todo'", task.status));
    }
    if let Some(ref assignee) = task.assignee {
        blockers.push(format!("already assigned to '{}'", assignee));
    }
    if task.points.is_none() {
        blockers.push("no point estimate".to_string());
    }
    if trimmed_len(body) < thresholds::MIN_DESCRIPTION_CHARS {
        blockers.push("description too thin (<50 chars)".to_string());
    }

    match lookup.lookup_story(&task.story_id) {
        Some(story) if story.status.is_workable() => {}
        Some(story) => blockers.push(format!(
            "parent story {} is '{}' — must be 'active' or 'ready'",
            task.story_id, story.status
        )),
        None => blockers.push(format!("parent story {} not found", task.story_id)),
    }

    if let Some(points) = task.points {
        if points.get() > thresholds::HIGH_POINTS {
            warnings.push(format!("high points ({}) — consider decomposing", points));
        }
    }
    let body_lower = body.to_lowercase();
    if !has_impl_section(&body_lower) {
        warnings.push("no Implementation section in description".to_string());
    }
    if !has_testing_section(&body_lower) {
        warnings.push("no Testing section in description".to_string());
    }
    if !has_dod_checklist(body) {
        warnings.push("no Definition of Done checklist".to_string());
    }

    ReadinessResult {
        ready: blockers.is_empty(),
        blockers,
        warnings,
    }
}

/// Informational tags shown next to available work. Independent of readiness.
pub fn compute_hints(task: &Task, body: &str) -> Vec<String> {
    let body_lower = body.to_lowercase();
    let mut hints = Vec::new();

    if trimmed_len(body) >= thresholds::WELL_SCOPED_CHARS {
        hints.push("well-scoped");
    }
    if has_impl_section(&body_lower) {
        hints.push("has-impl-plan");
    }
    if has_testing_section(&body_lower) {
        hints.push("has-test-plan");
    }
    if has_dod_checklist(body) {
        hints.push("has-dod");
    }
    if task.points.is_some_and(|p| p.get() <= thresholds::QUICK_WIN_POINTS) {
        hints.push("quick-win");
    }
    if DESIGN_KEYWORDS.iter().any(|kw| body_lower.contains(kw)) {
        hints.push("needs-design");
    }
    if COORDINATION_KEYWORDS.iter().any(|kw| body_lower.contains(kw)) {
        hints.push("needs-coordination");
    }

    hints.into_iter().map(String::from).collect()
}
