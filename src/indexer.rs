//! Derived project index.
//!
//! The index is always rebuilt from the entity files and overwritten
//! wholesale: `index.yaml` for machines plus four markdown tables for
//! people browsing the repository.

use std::collections::HashMap;
use std::fs;

use crate::Result;
use crate::models::{EntityKind, Epic, IndexEntry, ProjectIndex, Story, StoryStatus, Task, TaskStatus};
use crate::storage::Store;

/// Placeholder for empty table cells.
const EMPTY_CELL: &str = "—";

fn status_emoji(status: &str) -> Option<&'static str> {
    match status {
        "backlog" => Some("📋"),
        "draft" => Some("📝"),
        "ready" => Some("🟢"),
        "active" | "in-progress" => Some("🏃"),
        "todo" => Some("⚪"),
        "review" => Some("🔍"),
        "done" => Some("✅"),
        "blocked" => Some("🛑"),
        "archived" => Some("📦"),
        _ => None,
    }
}

/// Status text prefixed with its emoji, when it has one.
pub fn status_label(status: &str) -> String {
    match status_emoji(status) {
        Some(emoji) => format!("{} {}", emoji, status),
        None => status.to_string(),
    }
}

/// Compute the index from already-loaded entities.
pub fn index_from(epics: &[Epic], stories: &[Story], tasks: &[Task]) -> ProjectIndex {
    let mut index = ProjectIndex::default();

    for epic in epics {
        index.entries.push(IndexEntry {
            id: epic.id.clone(),
            title: epic.title.clone(),
            kind: EntityKind::Epic,
            status: epic.status.as_str().to_string(),
            points: None,
            story_id: None,
            epic_id: None,
        });
    }

    for story in stories {
        index.entries.push(IndexEntry {
            id: story.id.clone(),
            title: story.title.clone(),
            kind: EntityKind::Story,
            status: story.status.as_str().to_string(),
            points: story.points,
            story_id: None,
            epic_id: story.epic_id.clone(),
        });
        if let Some(points) = story.points {
            index.total_points += points.as_u32();
            if story.status == StoryStatus::Done {
                index.completed_points += points.as_u32();
            }
        }
    }

    for task in tasks {
        index.entries.push(IndexEntry {
            id: task.id.clone(),
            title: task.title.clone(),
            kind: EntityKind::Task,
            status: task.status.as_str().to_string(),
            points: task.points,
            story_id: Some(task.story_id.clone()),
            epic_id: None,
        });
        if let Some(points) = task.points {
            index.total_points += points.as_u32();
            if task.status == TaskStatus::Done {
                index.completed_points += points.as_u32();
            }
        }
    }

    index.epic_count = epics.len();
    index.story_count = stories.len();
    index.task_count = tasks.len();
    index
}

/// Read every epic, story and task and produce the index.
pub fn build_index(store: &Store) -> Result<ProjectIndex> {
    let epics = store.list_epics(None)?;
    let stories = store.list_stories(None)?;
    let tasks = store.list_tasks(None, None)?;
    Ok(index_from(&epics, &stories, &tasks))
}

/// Rebuild the index and write `index.yaml` plus the markdown indexes.
pub fn write_index(store: &Store) -> Result<ProjectIndex> {
    let epics = store.list_epics(None)?;
    let stories = store.list_stories(None)?;
    let tasks = store.list_tasks(None, None)?;
    let index = index_from(&epics, &stories, &tasks);

    fs::write(store.index_path(), serde_yaml::to_string(&index)?)?;

    let dir = store.project_dir();
    let overview = render_overview(&store.config().name, store.is_hub(), &epics, &stories, &tasks);
    if store.is_hub() {
        fs::write(store.root().join("README.md"), &overview)?;
    }
    fs::write(dir.join("INDEX.md"), overview)?;
    fs::write(dir.join("INDEX-EPICS.md"), render_epics(&epics, &stories))?;
    fs::write(dir.join("INDEX-STORIES.md"), render_stories(&stories, &tasks))?;
    fs::write(dir.join("INDEX-TASKS.md"), render_tasks(&tasks))?;

    tracing::debug!(
        epics = index.epic_count,
        stories = index.story_count,
        tasks = index.task_count,
        "wrote index"
    );
    Ok(index)
}

fn render_overview(name: &str, hub: bool, epics: &[Epic], stories: &[Story], tasks: &[Task]) -> String {
    // A hub's overview doubles as the repository README, one level up.
    let prefix = if hub { ".project/" } else { "" };
    let lines = [
        format!("# {}", name),
        String::new(),
        "| Metric | Count |".to_string(),
        "| ------ | ----- |".to_string(),
        format!("| Epics | {} |", epics.len()),
        format!("| Stories | {} |", stories.len()),
        format!("| Tasks | {} |", tasks.len()),
        String::new(),
        "## Indexes".to_string(),
        String::new(),
        format!("- [Epics]({}INDEX-EPICS.md)", prefix),
        format!("- [Stories]({}INDEX-STORIES.md)", prefix),
        format!("- [Tasks]({}INDEX-TASKS.md)", prefix),
        String::new(),
    ];
    lines.join("\n")
}

fn sorted_by_id<'a, T, F>(items: &'a [T], id: F) -> Vec<&'a T>
where
    F: Fn(&T) -> &str,
{
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| id(a).cmp(id(b)));
    sorted
}

fn render_epics(epics: &[Epic], stories: &[Story]) -> String {
    let mut story_counts: HashMap<&str, usize> = HashMap::new();
    let mut point_sums: HashMap<&str, u32> = HashMap::new();
    for story in stories {
        if let Some(ref epic_id) = story.epic_id {
            *story_counts.entry(epic_id).or_default() += 1;
            if let Some(points) = story.points {
                *point_sums.entry(epic_id).or_default() += points.as_u32();
            }
        }
    }

    let mut lines = vec!["# Epics".to_string(), String::new()];
    if epics.is_empty() {
        lines.push("_No epics yet._".to_string());
    } else {
        lines.push("| ID | Title | Status | Priority | Stories | Points |".to_string());
        lines.push("| -- | ----- | ------ | -------- | ------- | ------ |".to_string());
        for epic in sorted_by_id(epics, |e| e.id.as_str()) {
            let points = match point_sums.get(epic.id.as_str()) {
                Some(&p) if p > 0 => p.to_string(),
                _ => EMPTY_CELL.to_string(),
            };
            lines.push(format!(
                "| [{id}](epics/{id}.md) | {} | {} | {} | {} | {} |",
                epic.title,
                status_label(epic.status.as_str()),
                epic.priority,
                story_counts.get(epic.id.as_str()).copied().unwrap_or(0),
                points,
                id = epic.id,
            ));
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

fn render_stories(stories: &[Story], tasks: &[Task]) -> String {
    let mut task_counts: HashMap<&str, usize> = HashMap::new();
    for task in tasks {
        *task_counts.entry(task.story_id.as_str()).or_default() += 1;
    }

    let mut lines = vec!["# Stories".to_string(), String::new()];
    if stories.is_empty() {
        lines.push("_No stories yet._".to_string());
    } else {
        lines.push("| ID | Title | Status | Priority | Points | Epic | ACs | Tasks |".to_string());
        lines.push("| -- | ----- | ------ | -------- | ------ | ---- | --- | ----- |".to_string());
        for story in sorted_by_id(stories, |s| s.id.as_str()) {
            let points = story
                .points
                .map(|p| p.to_string())
                .unwrap_or_else(|| EMPTY_CELL.to_string());
            let epic = match story.epic_id {
                Some(ref epic_id) => format!("[{id}](epics/{id}.md)", id = epic_id),
                None => EMPTY_CELL.to_string(),
            };
            lines.push(format!(
                "| [{id}](stories/{id}.md) | {} | {} | {} | {} | {} | {} | {} |",
                story.title,
                status_label(story.status.as_str()),
                story.priority,
                points,
                epic,
                story.acceptance_criteria.len(),
                task_counts.get(story.id.as_str()).copied().unwrap_or(0),
                id = story.id,
            ));
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

fn render_tasks(tasks: &[Task]) -> String {
    let mut lines = vec!["# Tasks".to_string(), String::new()];
    if tasks.is_empty() {
        lines.push("_No tasks yet._".to_string());
    } else {
        lines.push("| ID | Title | Status | Points | Assignee | Story |".to_string());
        lines.push("| -- | ----- | ------ | ------ | -------- | ----- |".to_string());
        for task in sorted_by_id(tasks, |t| t.id.as_str()) {
            let points = task
                .points
                .map(|p| p.to_string())
                .unwrap_or_else(|| EMPTY_CELL.to_string());
            lines.push(format!(
                "| [{id}](tasks/{id}.md) | {} | {} | {} | {} | [{story}](stories/{story}.md) |",
                task.title,
                status_label(task.status.as_str()),
                points,
                task.assignee.as_deref().unwrap_or(EMPTY_CELL),
                id = task.id,
                story = task.story_id,
            ));
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, Points};
    use crate::storage::{ItemPatch, NewEpic, NewStory, NewTask};
    use crate::test_utils::TestEnv;

    fn seed(store: &mut Store) {
        let epic = store
            .create_epic(NewEpic {
                title: "Auth".to_string(),
                ..Default::default()
            })
            .unwrap();
        let story = store
            .create_story(NewStory {
                title: "Login".to_string(),
                points: Points::new(5).ok(),
                epic_id: Some(epic.id.clone()),
                acceptance_criteria: vec!["works".to_string()],
                ..Default::default()
            })
            .unwrap();
        store
            .create_story(NewStory {
                title: "Logout".to_string(),
                points: Points::new(3).ok(),
                ..Default::default()
            })
            .unwrap();
        let tasks = store
            .create_tasks(
                &story.id,
                vec![
                    NewTask {
                        title: "Form".to_string(),
                        points: Points::new(2).ok(),
                        ..Default::default()
                    },
                    NewTask {
                        title: "Session".to_string(),
                        points: Points::new(1).ok(),
                        ..Default::default()
                    },
                ],
            )
            .unwrap();
        store
            .update(&ItemId::Task(tasks[0].id.clone()), ItemPatch::status("done"))
            .unwrap();
        store
            .update(&ItemId::Story("US-TST-2".to_string()), ItemPatch::status("done"))
            .unwrap();
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label("in-progress"), "🏃 in-progress");
        assert_eq!(status_label("done"), "✅ done");
        assert_eq!(status_label("mystery"), "mystery");
    }

    #[test]
    fn test_build_index_totals() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        seed(&mut store);

        let index = build_index(&store).unwrap();
        assert_eq!(index.epic_count, 1);
        assert_eq!(index.story_count, 2);
        assert_eq!(index.task_count, 2);
        // 5 + 3 story points, 2 + 1 task points
        assert_eq!(index.total_points, 11);
        // Done story (3) and done task (2)
        assert_eq!(index.completed_points, 5);
        assert_eq!(index.completion_pct(), 45);

        let task_entry = index.entries.iter().find(|e| e.id == "US-TST-1-1").unwrap();
        assert_eq!(task_entry.kind, EntityKind::Task);
        assert_eq!(task_entry.story_id.as_deref(), Some("US-TST-1"));
    }

    #[test]
    fn test_write_index_round_trips() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        seed(&mut store);

        let written = write_index(&store).unwrap();
        let read = store.read_index().unwrap();
        assert_eq!(read, written);
        assert_eq!(read, build_index(&store).unwrap());
    }

    #[test]
    fn test_markdown_indexes() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        seed(&mut store);
        write_index(&store).unwrap();
        let dir = store.project_dir();

        let overview = std::fs::read_to_string(dir.join("INDEX.md")).unwrap();
        assert!(overview.starts_with("# test-project\n"));
        assert!(overview.contains("| Stories | 2 |"));
        assert!(overview.contains("- [Epics](INDEX-EPICS.md)"));
        assert!(!env.path().join("README.md").exists());

        let epics = std::fs::read_to_string(dir.join("INDEX-EPICS.md")).unwrap();
        assert!(epics.contains("| [EPIC-TST-1](epics/EPIC-TST-1.md) | Auth | 📝 draft | should | 1 | 5 |"));

        let stories = std::fs::read_to_string(dir.join("INDEX-STORIES.md")).unwrap();
        assert!(stories.contains(
            "| [US-TST-1](stories/US-TST-1.md) | Login | 📋 backlog | should | 5 | [EPIC-TST-1](epics/EPIC-TST-1.md) | 1 | 2 |"
        ));
        assert!(stories.contains("| [US-TST-2](stories/US-TST-2.md) | Logout | ✅ done | should | 3 | — | 0 | 0 |"));

        let tasks = std::fs::read_to_string(dir.join("INDEX-TASKS.md")).unwrap();
        assert!(tasks.contains("| [US-TST-1-2](tasks/US-TST-1-2.md) | Session | ⚪ todo | 1 | — | [US-TST-1](stories/US-TST-1.md) |"));
    }

    #[test]
    fn test_empty_markdown_indexes() {
        let env = TestEnv::new();
        let store = env.init_store();
        write_index(&store).unwrap();
        let dir = store.project_dir();
        let epics = std::fs::read_to_string(dir.join("INDEX-EPICS.md")).unwrap();
        assert_eq!(epics, "# Epics\n\n_No epics yet._\n");
        let tasks = std::fs::read_to_string(dir.join("INDEX-TASKS.md")).unwrap();
        assert!(tasks.contains("_No tasks yet._"));
    }

    #[test]
    fn test_hub_overview_written_as_readme() {
        let env = TestEnv::new();
        let store = env.init_hub();
        write_index(&store).unwrap();
        let readme = std::fs::read_to_string(env.path().join("README.md")).unwrap();
        assert!(readme.contains("- [Tasks](.project/INDEX-TASKS.md)"));
    }
}
