//! The audit rule registry.
//!
//! Each rule is a named check with a fixed severity. Rules report plain
//! [`Hit`]s; [`Rule::evaluate`] stamps them with the rule's name and
//! severity. Registry order is report order.

use super::docs::{self, DocSet, DocSlot};
use super::{AuditContext, Finding, Severity};
use crate::models::{EpicStatus, Story, StoryStatus, TaskStatus, points::sum_points};
use crate::storage::{HUB_DOCS, PROJECT_DOCS};

/// In-progress work untouched for longer than this is stale.
pub const STALE_TASK_DAYS: i64 = 14;

/// Draft epics and docs untouched for longer than this are stale.
pub const STALE_DOC_DAYS: i64 = 30;

/// Bodies shorter than this are thin.
pub const THIN_DESCRIPTION_CHARS: usize = 20;

/// Quarantined file names listed on the malformed finding.
pub const MALFORMED_SAMPLE: usize = 5;

/// What a rule reports before it is tagged with severity and check name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub message: String,
    pub items: Vec<String>,
}

impl Hit {
    pub fn new(message: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            message: message.into(),
            items,
        }
    }
}

type Evaluate = Box<dyn Fn(&AuditContext) -> Vec<Hit> + Send + Sync>;

pub struct Rule {
    pub name: &'static str,
    pub severity: Severity,
    evaluate: Evaluate,
}

impl Rule {
    pub fn new<F>(name: &'static str, severity: Severity, evaluate: F) -> Self
    where
        F: Fn(&AuditContext) -> Vec<Hit> + Send + Sync + 'static,
    {
        Self {
            name,
            severity,
            evaluate: Box::new(evaluate),
        }
    }

    pub fn evaluate(&self, ctx: &AuditContext) -> Vec<Finding> {
        (self.evaluate)(ctx)
            .into_iter()
            .map(|hit| Finding {
                severity: self.severity,
                check: self.name.to_string(),
                message: hit.message,
                items: hit.items,
            })
            .collect()
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

/// All rules in report order.
///
/// Documentation rules are expanded per document so that each doc's
/// missing, unfilled and stale findings appear together.
pub fn registry() -> Vec<Rule> {
    let mut rules = vec![
        Rule::new("done-story-incomplete-tasks", Severity::Error, done_story_incomplete_tasks),
        Rule::new("undecomposed-story", Severity::Warning, undecomposed_story),
        Rule::new("stale-in-progress", Severity::Warning, stale_in_progress),
        Rule::new("point-mismatch", Severity::Info, point_mismatch),
        Rule::new("thin-description", Severity::Info, thin_description),
        Rule::new("missing-acceptance-criteria", Severity::Warning, missing_acceptance_criteria),
    ];

    for doc in PROJECT_DOCS {
        rules.push(Rule::new("missing-documentation", Severity::Error, move |ctx| {
            missing_doc(&ctx.snapshot.project_docs, doc, "from .project/")
        }));
        rules.push(Rule::new("unfilled-documentation", Severity::Warning, move |ctx| {
            unfilled_doc(&ctx.snapshot.project_docs, doc, DocSet::Project)
        }));
        rules.push(Rule::new("stale-documentation", Severity::Info, move |ctx| {
            stale_doc(&ctx.snapshot.project_docs, doc, ctx)
        }));
    }

    rules.extend([
        Rule::new("empty-active-epic", Severity::Warning, empty_active_epic),
        Rule::new("done-epic-open-stories", Severity::Error, done_epic_open_stories),
        Rule::new("orphaned-epic-reference", Severity::Warning, orphaned_epic_reference),
        Rule::new("stale-draft-epic", Severity::Info, stale_draft_epic),
    ]);

    // Hub docs are only gathered for hubs, so these find nothing elsewhere.
    for doc in HUB_DOCS {
        rules.push(Rule::new("missing-hub-documentation", Severity::Warning, move |ctx| {
            missing_doc(&ctx.snapshot.hub_docs, doc, "from hub .project/")
        }));
        rules.push(Rule::new("unfilled-hub-documentation", Severity::Info, move |ctx| {
            unfilled_doc(&ctx.snapshot.hub_docs, doc, DocSet::Hub)
        }));
        rules.push(Rule::new("stale-hub-documentation", Severity::Info, move |ctx| {
            stale_doc(&ctx.snapshot.hub_docs, doc, ctx)
        }));
    }

    rules.extend([
        Rule::new("stale-assignment", Severity::Warning, stale_assignment),
        Rule::new("malformed-files", Severity::Warning, malformed_files),
    ]);

    rules
}

/// Run every rule and concatenate findings in registry order.
pub fn evaluate_rules(ctx: &AuditContext) -> Vec<Finding> {
    registry().iter().flat_map(|rule| rule.evaluate(ctx)).collect()
}

fn days_since(ctx: &AuditContext, date: chrono::NaiveDate) -> i64 {
    (ctx.today - date).num_days()
}

// ==================== Story and task rules ====================

fn done_story_incomplete_tasks(ctx: &AuditContext) -> Vec<Hit> {
    let snapshot = &ctx.snapshot;
    snapshot
        .stories
        .iter()
        .map(|s| &s.item)
        .filter(|story| story.status == StoryStatus::Done)
        .filter_map(|story| {
            let incomplete: Vec<String> = snapshot
                .tasks_of(&story.id)
                .filter(|t| t.status != TaskStatus::Done)
                .map(|t| t.id.clone())
                .collect();
            (!incomplete.is_empty()).then(|| {
                Hit::new(
                    format!(
                        "Story {} is done but has {} incomplete task(s)",
                        story.id,
                        incomplete.len()
                    ),
                    incomplete,
                )
            })
        })
        .collect()
}

fn undecomposed_story(ctx: &AuditContext) -> Vec<Hit> {
    let snapshot = &ctx.snapshot;
    snapshot
        .stories
        .iter()
        .map(|s| &s.item)
        .filter(|story| story.status.is_workable())
        .filter(|story| snapshot.tasks_of(&story.id).next().is_none())
        .map(|story| {
            Hit::new(
                format!("Story {} is {} but has no tasks", story.id, story.status),
                vec![story.id.clone()],
            )
        })
        .collect()
}

fn stale_in_progress(ctx: &AuditContext) -> Vec<Hit> {
    ctx.snapshot
        .tasks
        .iter()
        .map(|t| &t.item)
        .filter(|task| task.status == TaskStatus::InProgress)
        .filter_map(|task| {
            let days = days_since(ctx, task.updated);
            (days > STALE_TASK_DAYS).then(|| {
                Hit::new(
                    format!("Task {} has been in-progress for {} days", task.id, days),
                    vec![task.id.clone()],
                )
            })
        })
        .collect()
}

fn point_mismatch(ctx: &AuditContext) -> Vec<Hit> {
    let snapshot = &ctx.snapshot;
    snapshot
        .stories
        .iter()
        .map(|s| &s.item)
        .filter_map(|story| {
            let story_points = story.points?.as_u32();
            let tasks: Vec<_> = snapshot.tasks_of(&story.id).collect();
            if tasks.is_empty() {
                return None;
            }
            let task_points = sum_points(tasks.iter().map(|t| t.points));
            (task_points > 0 && task_points != story_points).then(|| {
                Hit::new(
                    format!(
                        "Story {} has {}pts but tasks sum to {}pts",
                        story.id, story_points, task_points
                    ),
                    vec![story.id.clone()],
                )
            })
        })
        .collect()
}

fn thin_description(ctx: &AuditContext) -> Vec<Hit> {
    fn thin(label: &str, id: &str, chars: usize) -> Option<Hit> {
        (chars < THIN_DESCRIPTION_CHARS).then(|| {
            Hit::new(
                format!("{label} {id} has a thin description ({chars} chars)"),
                vec![id.to_string()],
            )
        })
    }

    let snapshot = &ctx.snapshot;
    let stories = snapshot
        .stories
        .iter()
        .filter_map(|s| thin("Story", &s.item.id, s.body_chars));
    let tasks = snapshot
        .tasks
        .iter()
        .filter_map(|t| thin("Task", &t.item.id, t.body_chars));
    stories.chain(tasks).collect()
}

fn missing_acceptance_criteria(ctx: &AuditContext) -> Vec<Hit> {
    ctx.snapshot
        .stories
        .iter()
        .map(|s| &s.item)
        .filter(|story| story.status.is_workable() && story.acceptance_criteria.is_empty())
        .map(|story| {
            Hit::new(
                format!(
                    "Story {} is {} but has no acceptance criteria",
                    story.id, story.status
                ),
                vec![story.id.clone()],
            )
        })
        .collect()
}

// ==================== Documentation rules ====================

fn find_slot<'a>(slots: &'a [DocSlot], doc: &str) -> Option<&'a DocSlot> {
    slots.iter().find(|slot| slot.name == doc)
}

fn missing_doc(slots: &[DocSlot], doc: &str, location: &str) -> Vec<Hit> {
    match find_slot(slots, doc) {
        Some(slot) if slot.state.is_none() => vec![Hit::new(
            format!("{doc} is missing {location}"),
            vec![doc.to_string()],
        )],
        _ => Vec::new(),
    }
}

fn unfilled_doc(slots: &[DocSlot], doc: &str, set: DocSet) -> Vec<Hit> {
    let Some(state) = find_slot(slots, doc).and_then(|slot| slot.state.as_ref()) else {
        return Vec::new();
    };
    if !docs::is_unfilled(&state.content, set) {
        return Vec::new();
    }
    vec![Hit::new(
        format!("{doc} appears to be an unfilled template — needs real content"),
        vec![doc.to_string()],
    )]
}

fn stale_doc(slots: &[DocSlot], doc: &str, ctx: &AuditContext) -> Vec<Hit> {
    let age = find_slot(slots, doc)
        .and_then(|slot| slot.state.as_ref())
        .and_then(|state| docs::age_days(state, ctx.today));
    match age {
        Some(days) if days > STALE_DOC_DAYS => vec![Hit::new(
            format!("{doc} hasn't been updated in {days} days"),
            vec![doc.to_string()],
        )],
        _ => Vec::new(),
    }
}

// ==================== Epic rules ====================

fn empty_active_epic(ctx: &AuditContext) -> Vec<Hit> {
    let snapshot = &ctx.snapshot;
    snapshot
        .epics
        .iter()
        .filter(|epic| epic.status == EpicStatus::Active)
        .filter(|epic| snapshot.stories_of(&epic.id).next().is_none())
        .map(|epic| {
            Hit::new(
                format!("Epic {} is active but has no linked stories", epic.id),
                vec![epic.id.clone()],
            )
        })
        .collect()
}

fn done_epic_open_stories(ctx: &AuditContext) -> Vec<Hit> {
    let snapshot = &ctx.snapshot;
    snapshot
        .epics
        .iter()
        .filter(|epic| epic.status == EpicStatus::Done)
        .filter_map(|epic| {
            let open: Vec<String> = snapshot
                .stories_of(&epic.id)
                .filter(|s| !s.status.is_closed())
                .map(|s| s.id.clone())
                .collect();
            (!open.is_empty()).then(|| {
                Hit::new(
                    format!(
                        "Epic {} is done but has {} open story/stories",
                        epic.id,
                        open.len()
                    ),
                    open,
                )
            })
        })
        .collect()
}

fn orphaned_epic_reference(ctx: &AuditContext) -> Vec<Hit> {
    let snapshot = &ctx.snapshot;
    let dangling = |story: &&Story| {
        story
            .epic_id
            .as_deref()
            .is_some_and(|id| !snapshot.epics.iter().any(|e| e.id == id))
    };
    snapshot
        .stories
        .iter()
        .map(|s| &s.item)
        .filter(dangling)
        .map(|story| {
            Hit::new(
                format!(
                    "Story {} references non-existent epic {}",
                    story.id,
                    story.epic_id.as_deref().unwrap_or_default()
                ),
                vec![story.id.clone()],
            )
        })
        .collect()
}

fn stale_draft_epic(ctx: &AuditContext) -> Vec<Hit> {
    let snapshot = &ctx.snapshot;
    snapshot
        .epics
        .iter()
        .filter(|epic| epic.status == EpicStatus::Draft)
        .filter(|epic| snapshot.stories_of(&epic.id).next().is_none())
        .filter_map(|epic| {
            let days = days_since(ctx, epic.updated);
            (days > STALE_DOC_DAYS).then(|| {
                Hit::new(
                    format!(
                        "Epic {} has been in draft for {} days with no stories",
                        epic.id, days
                    ),
                    vec![epic.id.clone()],
                )
            })
        })
        .collect()
}

// ==================== Assignment and quarantine rules ====================

fn stale_assignment(ctx: &AuditContext) -> Vec<Hit> {
    ctx.snapshot
        .tasks
        .iter()
        .map(|t| &t.item)
        .filter(|task| task.status == TaskStatus::InProgress)
        .filter_map(|task| {
            let assignee = task.assignee.as_deref().filter(|a| !a.is_empty())?;
            let days = days_since(ctx, task.updated);
            (days > STALE_TASK_DAYS).then(|| {
                Hit::new(
                    format!(
                        "Task {} assigned to {} with no updates for {} days",
                        task.id, assignee, days
                    ),
                    vec![task.id.clone()],
                )
            })
        })
        .collect()
}

fn malformed_files(ctx: &AuditContext) -> Vec<Hit> {
    let malformed = &ctx.snapshot.malformed;
    if malformed.is_empty() {
        return Vec::new();
    }
    vec![Hit::new(
        format!(
            "{} file(s) quarantined in .project/malformed/ — run `pm malformed` to fix them",
            malformed.len()
        ),
        malformed.iter().take(MALFORMED_SAMPLE).cloned().collect(),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditSnapshot, Described, DocState};
    use crate::models::{Epic, Task};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx(snapshot: AuditSnapshot) -> AuditContext {
        AuditContext {
            snapshot,
            today: date(2026, 6, 1),
        }
    }

    fn story(id: &str, status: StoryStatus) -> Described<Story> {
        let mut story = Story::new(id.to_string(), "Story".to_string(), date(2026, 5, 1));
        story.status = status;
        story.acceptance_criteria = vec!["works".to_string()];
        Described::new(story, "A description long enough to pass.")
    }

    fn task(id: &str, story_id: &str, status: TaskStatus, updated: NaiveDate) -> Described<Task> {
        let mut task = Task::new(id.to_string(), story_id.to_string(), "Task".to_string(), updated);
        task.status = status;
        Described::new(task, "A description long enough to pass.")
    }

    #[test]
    fn test_registry_order() {
        let names: Vec<_> = registry().iter().map(|r| r.name).collect();
        assert_eq!(names.len(), 6 + 9 + 4 + 9 + 2);
        assert_eq!(names[0], "done-story-incomplete-tasks");
        assert_eq!(
            &names[6..9],
            ["missing-documentation", "unfilled-documentation", "stale-documentation"]
        );
        assert_eq!(names[15], "empty-active-epic");
        assert_eq!(names.last(), Some(&"malformed-files"));
    }

    #[test]
    fn test_empty_snapshot_is_clean() {
        assert!(evaluate_rules(&ctx(AuditSnapshot::default())).is_empty());
    }

    #[test]
    fn test_stale_boundary_is_exclusive() {
        let snapshot = AuditSnapshot {
            stories: vec![story("US-A-1", StoryStatus::Active)],
            tasks: vec![
                task("US-A-1-1", "US-A-1", TaskStatus::InProgress, date(2026, 5, 18)),
                task("US-A-1-2", "US-A-1", TaskStatus::InProgress, date(2026, 5, 17)),
            ],
            ..Default::default()
        };
        let hits = stale_in_progress(&ctx(snapshot));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].items, vec!["US-A-1-2".to_string()]);
    }

    #[test]
    fn test_unassigned_in_progress_is_not_stale_assignment() {
        let snapshot = AuditSnapshot {
            tasks: vec![task("US-A-1-1", "US-A-1", TaskStatus::InProgress, date(2026, 1, 1))],
            ..Default::default()
        };
        assert!(stale_assignment(&ctx(snapshot)).is_empty());
    }

    #[test]
    fn test_ready_story_counts_as_workable() {
        let mut ready = story("US-A-1", StoryStatus::Ready);
        ready.item.acceptance_criteria.clear();
        let snapshot = AuditSnapshot {
            stories: vec![ready],
            ..Default::default()
        };
        let c = ctx(snapshot);
        assert_eq!(
            undecomposed_story(&c)[0].message,
            "Story US-A-1 is ready but has no tasks"
        );
        assert_eq!(
            missing_acceptance_criteria(&c)[0].message,
            "Story US-A-1 is ready but has no acceptance criteria"
        );
    }

    #[test]
    fn test_draft_epic_with_story_is_not_stale() {
        let epic = Epic::new("EPIC-A-1".to_string(), "Epic".to_string(), date(2026, 1, 1));
        let mut linked = story("US-A-1", StoryStatus::Backlog);
        linked.item.epic_id = Some("EPIC-A-1".to_string());
        let snapshot = AuditSnapshot {
            epics: vec![epic],
            stories: vec![linked],
            ..Default::default()
        };
        assert!(stale_draft_epic(&ctx(snapshot)).is_empty());
    }

    #[test]
    fn test_doc_without_mtime_is_never_stale() {
        let slots = vec![DocSlot {
            name: "PROJECT.md".to_string(),
            state: Some(DocState {
                content: "one\ntwo\nthree\n".to_string(),
                modified: None,
            }),
        }];
        let c = ctx(AuditSnapshot::default());
        assert!(stale_doc(&slots, "PROJECT.md", &c).is_empty());
        assert!(unfilled_doc(&slots, "PROJECT.md", DocSet::Project).is_empty());
    }

    #[test]
    fn test_absent_slot_reports_nothing() {
        assert!(missing_doc(&[], "VISION.md", "from hub .project/").is_empty());
    }
}
