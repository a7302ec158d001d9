//! Work board: tasks grouped into five buckets with ranked available work.
//!
//! Buckets:
//! - `available` - todo tasks passing every readiness gate, ranked
//! - `not_ready` - todo tasks failing at least one gate, with blockers
//! - `in_progress`, `in_review`, `blocked` - claimed work by status
//!
//! Done tasks are not shown. When an assignee filter is given only that
//! assignee's claimed work is listed and todo tasks are left out entirely.

pub mod readiness;

pub use readiness::{ReadinessResult, StoryLookup, check_readiness, compute_hints};

use serde::Serialize;
use std::collections::HashMap;

use crate::indexer;
use crate::models::{ItemId, Points, Priority, Story, Task, TaskStatus};
use crate::storage::{ItemPatch, Store};
use crate::{Error, Result};

/// Sort value standing in for a missing estimate.
const UNESTIMATED_SORT_POINTS: u8 = 99;

/// One task as shown on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardEntry {
    pub id: String,
    pub title: String,
    pub points: Option<Points>,
    pub assignee: Option<String>,
    /// `"{story_id} — {story_title}"`, or the bare story ID when the story is missing
    pub story: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<String>,
    #[serde(skip)]
    pub story_id: String,
    /// Priority of the parent story (`should` when the story is missing)
    #[serde(skip)]
    pub priority: Priority,
}

impl BoardEntry {
    fn new(task: &Task, story: Option<&Story>) -> Self {
        let label = match story {
            Some(s) => format!("{} — {}", s.id, s.title),
            None => task.story_id.clone(),
        };
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            points: task.points,
            assignee: task.assignee.clone(),
            story: label,
            hints: Vec::new(),
            blockers: Vec::new(),
            story_id: task.story_id.clone(),
            priority: story.map(|s| s.priority).unwrap_or_default(),
        }
    }

    fn sort_key(&self) -> (u8, &str, &str, u8) {
        (
            self.priority.rank(),
            &self.story_id,
            &self.id,
            self.points.map(Points::get).unwrap_or(UNESTIMATED_SORT_POINTS),
        )
    }
}

/// Rank available work: parent-story priority, then story ID, then task ID,
/// then estimate. The sort is stable.
pub fn rank_available(entries: &mut [BoardEntry]) {
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Per-bucket totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoardSummary {
    pub available: usize,
    pub not_ready: usize,
    pub in_progress: usize,
    pub in_review: usize,
    pub blocked: usize,
}

/// The five task buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Board {
    pub available: Vec<BoardEntry>,
    pub not_ready: Vec<BoardEntry>,
    pub in_progress: Vec<BoardEntry>,
    pub in_review: Vec<BoardEntry>,
    pub blocked: Vec<BoardEntry>,
}

/// A paginated board together with the unpaginated totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardPage {
    pub board: Board,
    pub summary: BoardSummary,
}

fn window(entries: &[BoardEntry], offset: usize, limit: Option<usize>) -> Vec<BoardEntry> {
    let rest = entries.iter().skip(offset);
    match limit {
        Some(n) => rest.take(n).cloned().collect(),
        None => rest.cloned().collect(),
    }
}

impl Board {
    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            available: self.available.len(),
            not_ready: self.not_ready.len(),
            in_progress: self.in_progress.len(),
            in_review: self.in_review.len(),
            blocked: self.blocked.len(),
        }
    }

    /// Apply the same window to every bucket independently.
    pub fn page(&self, offset: usize, limit: Option<usize>) -> BoardPage {
        BoardPage {
            board: Board {
                available: window(&self.available, offset, limit),
                not_ready: window(&self.not_ready, offset, limit),
                in_progress: window(&self.in_progress, offset, limit),
                in_review: window(&self.in_review, offset, limit),
                blocked: window(&self.blocked, offset, limit),
            },
            summary: self.summary(),
        }
    }
}

/// Group tasks into buckets. Pure over the given tasks and stories.
pub fn assemble_board(tasks: &[(Task, String)], stories: &HashMap<String, Story>, assignee: Option<&str>) -> Board {
    let mut board = Board::default();

    for (task, body) in tasks {
        if let Some(filter) = assignee {
            if task.assignee.as_deref() != Some(filter) {
                continue;
            }
        }

        let mut entry = BoardEntry::new(task, stories.get(&task.story_id));
        match task.status {
            TaskStatus::InProgress => board.in_progress.push(entry),
            TaskStatus::Review => board.in_review.push(entry),
            TaskStatus::Blocked => board.blocked.push(entry),
            TaskStatus::Todo if assignee.is_none() => {
                let result = check_readiness(task, body, stories);
                if result.ready {
                    entry.hints = compute_hints(task, body);
                    board.available.push(entry);
                } else {
                    entry.blockers = result.blockers;
                    board.not_ready.push(entry);
                }
            }
            TaskStatus::Todo | TaskStatus::Done => {}
        }
    }

    rank_available(&mut board.available);
    board
}

/// Build the board from the store.
pub fn build_board(store: &Store, assignee: Option<&str>) -> Result<Board> {
    let tasks = store.tasks_with_bodies()?;
    let stories: HashMap<String, Story> = store
        .list_stories(None)?
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();
    Ok(assemble_board(&tasks, &stories, assignee))
}

/// Parent story summary returned when a task is claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryContext {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a successful claim.
#[derive(Debug, Clone, Serialize)]
pub struct GrabResult {
    pub task: Task,
    pub body: String,
    pub story_context: StoryContext,
}

/// Claim a task for `assignee` if, and only if, it passes every readiness gate.
///
/// On success the task becomes `in-progress` and the index is rewritten.
pub fn grab_task(store: &mut Store, task_id: &str, assignee: &str) -> Result<GrabResult> {
    let id = ItemId::parse(task_id)?;
    let ItemId::Task(ref tid) = id else {
        return Err(Error::InvalidInput(format!("{} is not a task ID", id)));
    };
    let assignee = assignee.trim();
    if assignee.is_empty() {
        return Err(Error::InvalidInput("assignee must not be empty".to_string()));
    }

    let (task, body) = store.get_task(tid)?;
    let result = check_readiness(&task, &body, &*store);
    if !result.ready {
        return Err(Error::NotReady {
            id: task.id,
            blockers: result.blockers,
        });
    }

    store.update(
        &id,
        ItemPatch {
            assignee: Some(assignee.to_string()),
            status: Some(TaskStatus::InProgress.as_str().to_string()),
            ..Default::default()
        },
    )?;
    indexer::write_index(store)?;
    tracing::info!(task = %tid, assignee = %assignee, "task claimed");

    let (task, body) = store.get_task(tid)?;
    let story_context = match store.get_story(&task.story_id) {
        Ok((story, _)) => StoryContext {
            id: story.id,
            title: Some(story.title),
            status: Some(story.status.as_str().to_string()),
            error: None,
        },
        Err(_) => StoryContext {
            id: task.story_id.clone(),
            title: None,
            status: None,
            error: Some("not found".to_string()),
        },
    };

    Ok(GrabResult {
        task,
        body,
        story_context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoryStatus;
    use crate::storage::{NewStory, NewTask};
    use crate::test_utils::{GOOD_TASK_BODY, TestEnv};
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
    }

    fn story(id: &str, priority: Priority) -> Story {
        let mut s = Story::new(id.to_string(), format!("Story {}", id), day());
        s.status = StoryStatus::Active;
        s.priority = priority;
        s
    }

    fn task(id: &str, story_id: &str, points: u8) -> Task {
        let mut t = Task::new(id.to_string(), story_id.to_string(), format!("Task {}", id), day());
        t.points = Points::new(points).ok();
        t
    }

    fn story_map(stories: Vec<Story>) -> HashMap<String, Story> {
        stories.into_iter().map(|s| (s.id.clone(), s)).collect()
    }

    fn with_body(tasks: Vec<Task>) -> Vec<(Task, String)> {
        tasks.into_iter().map(|t| (t, GOOD_TASK_BODY.to_string())).collect()
    }

    fn ids(entries: &[BoardEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    // ==================== Ranking ====================

    #[test]
    fn test_available_ranked_by_story_priority() {
        let stories = story_map(vec![
            story("US-A-1", Priority::Could),
            story("US-A-2", Priority::Must),
        ]);
        let tasks = with_body(vec![task("US-A-1-1", "US-A-1", 1), task("US-A-2-1", "US-A-2", 1)]);
        let board = assemble_board(&tasks, &stories, None);
        assert_eq!(ids(&board.available), vec!["US-A-2-1", "US-A-1-1"]);
    }

    #[test]
    fn test_equal_priority_ranked_by_story_then_task() {
        let stories = story_map(vec![
            story("US-A-1", Priority::Should),
            story("US-A-2", Priority::Should),
        ]);
        let tasks = with_body(vec![
            task("US-A-2-1", "US-A-2", 1),
            task("US-A-1-2", "US-A-1", 1),
            task("US-A-1-1", "US-A-1", 1),
        ]);
        let board = assemble_board(&tasks, &stories, None);
        assert_eq!(ids(&board.available), vec!["US-A-1-1", "US-A-1-2", "US-A-2-1"]);
    }

    #[test]
    fn test_rank_available_tiebreak_on_points() {
        let mut a = BoardEntry::new(&task("US-A-1-1", "US-A-1", 5), None);
        let mut b = a.clone();
        b.points = Points::new(2).ok();
        let mut c = a.clone();
        c.points = None;
        a.title = "five".to_string();
        let mut entries = vec![c, a, b];
        rank_available(&mut entries);
        let points: Vec<Option<u8>> = entries.iter().map(|e| e.points.map(Points::get)).collect();
        assert_eq!(points, vec![Some(2), Some(5), None]);
    }

    #[test]
    fn test_rank_available_is_stable() {
        let first = BoardEntry::new(&task("US-A-1-1", "US-A-1", 3), None);
        let mut second = first.clone();
        second.title = "second".to_string();
        let mut entries = vec![first.clone(), second.clone()];
        rank_available(&mut entries);
        assert_eq!(entries, vec![first, second]);
    }

    // ==================== Bucketing ====================

    #[test]
    fn test_buckets_by_status() {
        let stories = story_map(vec![story("US-A-1", Priority::Should)]);
        let mut in_progress = task("US-A-1-1", "US-A-1", 1);
        in_progress.status = TaskStatus::InProgress;
        in_progress.assignee = Some("alice".to_string());
        let mut review = task("US-A-1-2", "US-A-1", 1);
        review.status = TaskStatus::Review;
        let mut blocked = task("US-A-1-3", "US-A-1", 1);
        blocked.status = TaskStatus::Blocked;
        let mut done = task("US-A-1-4", "US-A-1", 1);
        done.status = TaskStatus::Done;
        let ready = task("US-A-1-5", "US-A-1", 1);
        let mut unready = task("US-A-1-6", "US-A-1", 1);
        unready.points = None;

        let tasks = with_body(vec![in_progress, review, blocked, done, ready, unready]);
        let board = assemble_board(&tasks, &stories, None);

        assert_eq!(ids(&board.in_progress), vec!["US-A-1-1"]);
        assert_eq!(ids(&board.in_review), vec!["US-A-1-2"]);
        assert_eq!(ids(&board.blocked), vec!["US-A-1-3"]);
        assert_eq!(ids(&board.available), vec!["US-A-1-5"]);
        assert_eq!(ids(&board.not_ready), vec!["US-A-1-6"]);
        assert_eq!(board.not_ready[0].blockers, vec!["no point estimate"]);
        assert!(board.available[0].hints.contains(&"has-dod".to_string()));
        assert_eq!(board.available[0].story, "US-A-1 — Story US-A-1");
    }

    #[test]
    fn test_missing_story_uses_bare_id_and_blocks() {
        let tasks = with_body(vec![task("US-Z-9-1", "US-Z-9", 1)]);
        let board = assemble_board(&tasks, &HashMap::new(), None);
        assert!(board.available.is_empty());
        assert_eq!(board.not_ready[0].story, "US-Z-9");
        assert_eq!(board.not_ready[0].blockers, vec!["parent story US-Z-9 not found"]);
    }

    #[test]
    fn test_assignee_filter_excludes_todo_and_others() {
        let stories = story_map(vec![story("US-A-1", Priority::Should)]);
        let mut mine = task("US-A-1-1", "US-A-1", 1);
        mine.status = TaskStatus::InProgress;
        mine.assignee = Some("alice".to_string());
        let mut theirs = task("US-A-1-2", "US-A-1", 1);
        theirs.status = TaskStatus::InProgress;
        theirs.assignee = Some("bob".to_string());
        let mut my_todo = task("US-A-1-3", "US-A-1", 1);
        my_todo.assignee = Some("alice".to_string());
        let open_todo = task("US-A-1-4", "US-A-1", 1);

        let tasks = with_body(vec![mine, theirs, my_todo, open_todo]);
        let board = assemble_board(&tasks, &stories, Some("alice"));
        assert_eq!(ids(&board.in_progress), vec!["US-A-1-1"]);
        assert!(board.available.is_empty());
        assert!(board.not_ready.is_empty());
    }

    // ==================== Pagination ====================

    #[test]
    fn test_page_keeps_totals() {
        let stories = story_map(vec![story("US-A-1", Priority::Should)]);
        let tasks = with_body((1..=5).map(|n| task(&format!("US-A-1-{}", n), "US-A-1", 1)).collect());
        let board = assemble_board(&tasks, &stories, None);

        let page = board.page(1, Some(2));
        assert_eq!(ids(&page.board.available), vec!["US-A-1-2", "US-A-1-3"]);
        assert_eq!(page.summary.available, 5);

        let tail = board.page(4, None);
        assert_eq!(ids(&tail.board.available), vec!["US-A-1-5"]);

        let past_end = board.page(10, Some(3));
        assert!(past_end.board.available.is_empty());
        assert_eq!(past_end.summary.available, 5);
    }

    #[test]
    fn test_entry_serialization_hides_internal_fields() {
        let entry = BoardEntry::new(&task("US-A-1-1", "US-A-1", 3), None);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["points"], 3);
        assert!(json.get("story_id").is_none());
        assert!(json.get("hints").is_none());
    }

    // ==================== Store-backed ====================

    fn seeded_store(env: &TestEnv, story_status: &str) -> (Store, String) {
        let mut store = env.init_store();
        let s = store
            .create_story(NewStory {
                title: "Login".to_string(),
                description: "Users log in".to_string(),
                ..Default::default()
            })
            .unwrap();
        store
            .update(&ItemId::Story(s.id.clone()), ItemPatch::status(story_status))
            .unwrap();
        let t = store
            .create_task(
                &s.id,
                NewTask {
                    title: "Wire form".to_string(),
                    description: GOOD_TASK_BODY.to_string(),
                    points: Points::new(2).ok(),
                },
            )
            .unwrap();
        (store, t.id)
    }

    #[test]
    fn test_build_board_from_store() {
        let env = TestEnv::new();
        let (store, task_id) = seeded_store(&env, "active");
        let board = build_board(&store, None).unwrap();
        assert_eq!(ids(&board.available), vec![task_id.as_str()]);
    }

    #[test]
    fn test_grab_ready_task() {
        let env = TestEnv::new();
        let (mut store, task_id) = seeded_store(&env, "ready");
        let result = grab_task(&mut store, &task_id, "alice").unwrap();
        assert_eq!(result.task.status, TaskStatus::InProgress);
        assert_eq!(result.task.assignee.as_deref(), Some("alice"));
        assert_eq!(result.story_context.status.as_deref(), Some("ready"));

        let board = build_board(&store, Some("alice")).unwrap();
        assert_eq!(ids(&board.in_progress), vec![task_id.as_str()]);
        let index = store.read_index().unwrap();
        assert_eq!(index.task_count, 1);
    }

    #[test]
    fn test_grab_not_ready_task_fails_without_change() {
        let env = TestEnv::new();
        let (mut store, task_id) = seeded_store(&env, "backlog");
        match grab_task(&mut store, &task_id, "alice") {
            Err(Error::NotReady { id, blockers }) => {
                assert_eq!(id, task_id);
                assert_eq!(
                    blockers,
                    vec!["parent story US-TST-1 is 'backlog' — must be 'active' or 'ready'"]
                );
            }
            other => panic!("expected NotReady, got {:?}", other),
        }
        let (task, _) = store.get_task(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.assignee, None);
    }

    #[test]
    fn test_grab_twice_fails() {
        let env = TestEnv::new();
        let (mut store, task_id) = seeded_store(&env, "active");
        grab_task(&mut store, &task_id, "alice").unwrap();
        assert!(matches!(
            grab_task(&mut store, &task_id, "bob"),
            Err(Error::NotReady { .. })
        ));
    }

    #[test]
    fn test_grab_rejects_story_id() {
        let env = TestEnv::new();
        let (mut store, _) = seeded_store(&env, "active");
        assert!(matches!(
            grab_task(&mut store, "US-TST-1", "alice"),
            Err(Error::InvalidInput(_))
        ));
    }
}
