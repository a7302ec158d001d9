//! Epic, story and task commands.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Output, indent, points_label, reindexed};
use crate::board::{GrabResult, grab_task};
use crate::indexer::status_label;
use crate::models::{Epic, Item, ItemId, Points, Story, Task};
use crate::storage::{ItemPatch, NewEpic, NewStory, NewTask, Store};
use crate::{Error, Result};

/// A created or modified entity.
#[derive(Serialize)]
pub struct ItemChange {
    #[serde(skip)]
    pub action: &'static str,
    #[serde(flatten)]
    pub item: Item,
}

impl ItemChange {
    fn new(action: &'static str, item: Item) -> Self {
        Self { action, item }
    }
}

impl Output for ItemChange {
    fn to_human(&self) -> String {
        format!(
            "{} {} {}: {} [{}]",
            self.action,
            self.item.kind().as_str(),
            self.item.id(),
            self.item.title(),
            self.item.status()
        )
    }
}

/// Entities of one kind, in ID order.
#[derive(Serialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub count: usize,
}

impl<T> ListResult<T> {
    fn new(items: Vec<T>) -> Self {
        let count = items.len();
        Self { items, count }
    }
}

fn list_line(id: &str, status: &str, points: Option<Points>, title: &str) -> String {
    format!(
        "{:<14} {:<12} {:>5}  {}",
        id,
        status_label(status),
        points_label(points),
        title
    )
}

impl Output for ListResult<Epic> {
    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return "No epics.".to_string();
        }
        self.items
            .iter()
            .map(|e| format!("{:<14} {:<12} {:<7} {}", e.id, status_label(e.status.as_str()), e.priority.as_str(), e.title))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Output for ListResult<Story> {
    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return "No stories.".to_string();
        }
        self.items
            .iter()
            .map(|s| list_line(&s.id, s.status.as_str(), s.points, &s.title))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Output for ListResult<Task> {
    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return "No tasks.".to_string();
        }
        self.items
            .iter()
            .map(|t| {
                let line = list_line(&t.id, t.status.as_str(), t.points, &t.title);
                match &t.assignee {
                    Some(who) => format!("{} (@{})", line, who),
                    None => line,
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ==================== Epics ====================

pub fn epic_create(store: &mut Store, new: NewEpic) -> Result<ItemChange> {
    let epic = store.create_epic(new)?;
    reindexed(store, ItemChange::new("Created", Item::Epic(epic)))
}

pub fn epic_list(store: &Store, status: Option<&str>) -> Result<ListResult<Epic>> {
    let status = status.map(str::parse).transpose()?;
    Ok(ListResult::new(store.list_epics(status)?))
}

// ==================== Stories ====================

pub fn story_create(store: &mut Store, new: NewStory) -> Result<ItemChange> {
    let story = store.create_story(new)?;
    reindexed(store, ItemChange::new("Created", Item::Story(story)))
}

/// List stories, optionally narrowed to one status and one epic.
pub fn story_list(store: &Store, status: Option<&str>, epic_id: Option<&str>) -> Result<ListResult<Story>> {
    let status = status.map(str::parse).transpose()?;
    let stories = store
        .list_stories(status)?
        .into_iter()
        .filter(|s| epic_id.is_none_or(|epic| s.epic_id.as_deref() == Some(epic)))
        .collect();
    Ok(ListResult::new(stories))
}

// ==================== Tasks ====================

pub fn task_create(store: &mut Store, story_id: &str, new: NewTask) -> Result<ItemChange> {
    let task = store.create_task(story_id, new)?;
    reindexed(store, ItemChange::new("Created", Item::Task(task)))
}

pub fn task_list(store: &Store, story_id: Option<&str>, status: Option<&str>) -> Result<ListResult<Task>> {
    let status = status.map(str::parse).transpose()?;
    Ok(ListResult::new(store.list_tasks(story_id, status)?))
}

/// One entry of a batch task file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchEntry {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    points: Option<Points>,
}

impl From<BatchEntry> for NewTask {
    fn from(entry: BatchEntry) -> Self {
        NewTask {
            title: entry.title,
            description: entry.description,
            points: entry.points,
        }
    }
}

/// Parse a YAML or JSON list of task entries.
fn parse_batch(content: &str) -> Result<Vec<NewTask>> {
    let entries: Vec<BatchEntry> = serde_yaml::from_str(content)?;
    if entries.is_empty() {
        return Err(Error::InvalidInput("batch file contains no tasks".to_string()));
    }
    Ok(entries.into_iter().map(NewTask::from).collect())
}

#[derive(Serialize)]
pub struct BatchResult {
    pub story_id: String,
    pub created: Vec<Task>,
}

impl Output for BatchResult {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Created {} tasks under {}", self.created.len(), self.story_id)];
        for task in &self.created {
            lines.push(format!("  {} {}", task.id, task.title));
        }
        lines.join("\n")
    }
}

/// Create every task listed in `file` under one story. All-or-nothing.
pub fn task_batch(store: &mut Store, story_id: &str, file: &Path) -> Result<BatchResult> {
    let content = std::fs::read_to_string(file)?;
    let tasks = parse_batch(&content)?;
    let created = store.create_tasks(story_id, tasks)?;
    reindexed(
        store,
        BatchResult {
            story_id: story_id.to_string(),
            created,
        },
    )
}

impl Output for GrabResult {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Claimed {}: {} (assigned to {})",
            self.task.id,
            self.task.title,
            self.task.assignee.as_deref().unwrap_or("-")
        )];
        let story = &self.story_context;
        match (&story.title, &story.error) {
            (Some(title), _) => lines.push(format!("Story {}: {}", story.id, title)),
            (None, Some(error)) => lines.push(format!("Story {}: {}", story.id, error)),
            (None, None) => lines.push(format!("Story {}", story.id)),
        }
        if !self.body.trim().is_empty() {
            lines.push(String::new());
            lines.push(indent(&self.body));
        }
        lines.join("\n")
    }
}

/// Claim a ready task. Refuses with every blocker when it is not ready.
pub fn task_grab(store: &mut Store, task_id: &str, assignee: &str) -> Result<GrabResult> {
    grab_task(store, task_id, assignee)
}

// ==================== Any entity ====================

pub fn update(store: &mut Store, id: &str, patch: ItemPatch) -> Result<ItemChange> {
    if patch.is_empty() {
        return Err(Error::InvalidInput("nothing to update".to_string()));
    }
    let item = store.update(&ItemId::parse(id)?, patch)?;
    reindexed(store, ItemChange::new("Updated", item))
}

/// Epics and stories become archived; tasks are marked done.
pub fn archive(store: &mut Store, id: &str) -> Result<ItemChange> {
    let item = store.archive(&ItemId::parse(id)?)?;
    reindexed(store, ItemChange::new("Archived", item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StoryStatus, TaskStatus};
    use crate::test_utils::{GOOD_TASK_BODY, TestEnv};

    fn story(store: &mut Store, title: &str) -> String {
        let change = story_create(
            store,
            NewStory {
                title: title.to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        change.item.id().to_string()
    }

    #[test]
    fn test_create_updates_index() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let change = epic_create(
            &mut store,
            NewEpic {
                title: "Auth".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(change.to_human(), "Created epic EPIC-TST-1: Auth [draft]");
        assert!(change.to_json().contains("\"id\":\"EPIC-TST-1\""));
        assert!(!change.to_json().contains("action"));
        assert_eq!(store.read_index().unwrap().epic_count, 1);
    }

    #[test]
    fn test_story_list_filters() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let epic = store
            .create_epic(NewEpic {
                title: "E".to_string(),
                ..Default::default()
            })
            .unwrap();
        story_create(
            &mut store,
            NewStory {
                title: "In epic".to_string(),
                epic_id: Some(epic.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();
        story(&mut store, "Loose");

        assert_eq!(story_list(&store, None, None).unwrap().count, 2);
        let in_epic = story_list(&store, None, Some(&epic.id)).unwrap();
        assert_eq!(in_epic.count, 1);
        assert_eq!(in_epic.items[0].title, "In epic");
        assert_eq!(story_list(&store, Some("active"), None).unwrap().count, 0);
    }

    #[test]
    fn test_list_rejects_unknown_status() {
        let env = TestEnv::new();
        let store = env.init_store();
        assert!(matches!(
            task_list(&store, None, Some("finished")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_batch_yaml_and_json() {
        let yaml = "- title: First\n  points: 2\n- title: Second\n  description: More words\n";
        let tasks = parse_batch(yaml).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].points.map(Points::get), Some(2));
        assert_eq!(tasks[1].description, "More words");

        let json = r#"[{"title": "Only", "points": 3}]"#;
        assert_eq!(parse_batch(json).unwrap()[0].title, "Only");
    }

    #[test]
    fn test_parse_batch_rejects_bad_points() {
        assert!(parse_batch("- title: X\n  points: 4\n").is_err());
        assert!(parse_batch("[]").is_err());
    }

    #[test]
    fn test_task_batch_from_file() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let story_id = story(&mut store, "Parent");
        let file = env.path().join("tasks.yaml");
        std::fs::write(&file, "- title: One\n- title: Two\n").unwrap();

        let result = task_batch(&mut store, &story_id, &file).unwrap();

        assert_eq!(result.created.len(), 2);
        assert_eq!(result.created[1].id, format!("{}-2", story_id));
        assert_eq!(store.read_index().unwrap().task_count, 2);
    }

    #[test]
    fn test_update_and_archive() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let story_id = story(&mut store, "Draft");

        let change = update(&mut store, &story_id, ItemPatch::status("ready")).unwrap();
        assert_eq!(change.item.status(), StoryStatus::Ready.as_str());

        let archived = archive(&mut store, &story_id).unwrap();
        assert_eq!(archived.item.status(), "archived");
        assert!(archived.to_human().starts_with("Archived story"));
    }

    #[test]
    fn test_update_empty_patch() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let story_id = story(&mut store, "S");
        assert!(matches!(
            update(&mut store, &story_id, ItemPatch::default()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_grab_ready_task() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let story_id = story(&mut store, "Login");
        update(&mut store, &story_id, ItemPatch::status("active")).unwrap();
        let task = task_create(
            &mut store,
            &story_id,
            NewTask {
                title: "Wire form".to_string(),
                description: GOOD_TASK_BODY.to_string(),
                points: Some(Points::new(2).unwrap()),
            },
        )
        .unwrap();

        let grabbed = task_grab(&mut store, task.item.id(), "agent-1").unwrap();

        assert_eq!(grabbed.task.status, TaskStatus::InProgress);
        assert!(grabbed.to_human().contains("assigned to agent-1"));
        assert!(grabbed.to_human().contains("Story US-TST-1: Login"));
    }
}
