//! Project-level commands: init, status, burndown, show and reindex.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Output, indent, points_label};
use crate::Result;
use crate::hub::{self, HubRollup};
use crate::indexer::{self, status_label};
use crate::models::{Item, ItemId, ProjectIndex};
use crate::storage::{InitOptions, Store};

// ==================== Init ====================

#[derive(Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub name: String,
    pub prefix: String,
    pub hub: bool,
    pub path: PathBuf,
}

impl Output for InitResult {
    fn to_human(&self) -> String {
        let kind = if self.hub { "hub" } else { "project" };
        format!(
            "Initialized {} '{}' (prefix {}) in {}",
            kind,
            self.name,
            self.prefix,
            self.path.display()
        )
    }
}

/// Create `.project/` under `repo` and write the first index.
pub fn init(repo: &Path, options: InitOptions) -> Result<InitResult> {
    let store = Store::init(repo, options)?;
    indexer::write_index(&store)?;
    Ok(InitResult {
        initialized: true,
        name: store.config().name.clone(),
        prefix: store.config().prefix.clone(),
        hub: store.is_hub(),
        path: store.project_dir().to_path_buf(),
    })
}

// ==================== Status ====================

#[derive(Serialize)]
pub struct StatusResult {
    pub project: String,
    pub epics: usize,
    pub stories: usize,
    pub tasks: usize,
    pub total_points: u32,
    pub completed_points: u32,
    pub completion: String,
    /// Entity counts keyed by status, across all three kinds
    pub by_status: BTreeMap<String, usize>,
}

impl StatusResult {
    fn from_index(project: String, index: &ProjectIndex) -> Self {
        let mut by_status = BTreeMap::new();
        for entry in &index.entries {
            *by_status.entry(entry.status.clone()).or_insert(0) += 1;
        }
        Self {
            project,
            epics: index.epic_count,
            stories: index.story_count,
            tasks: index.task_count,
            total_points: index.total_points,
            completed_points: index.completed_points,
            completion: format!("{}%", index.completion_pct()),
            by_status,
        }
    }
}

impl Output for StatusResult {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Project: {}", self.project),
            format!(
                "  {} epics, {} stories, {} tasks",
                self.epics, self.stories, self.tasks
            ),
            format!(
                "  {}/{} points done ({})",
                self.completed_points, self.total_points, self.completion
            ),
        ];
        if !self.by_status.is_empty() {
            lines.push(String::new());
            lines.push("By status:".to_string());
            for (status, count) in &self.by_status {
                lines.push(format!("  {:<16} {}", status_label(status), count));
            }
        }
        lines.join("\n")
    }
}

pub fn status(store: &Store) -> Result<StatusResult> {
    let index = indexer::build_index(store)?;
    Ok(StatusResult::from_index(store.config().name.clone(), &index))
}

// ==================== Burndown ====================

#[derive(Serialize)]
pub struct ProjectBurndown {
    pub project: String,
    pub total_points: u32,
    pub completed_points: u32,
    pub remaining_points: u32,
    pub completion: String,
}

/// A single project's burndown, or the rollup for a hub with sub-projects.
#[derive(Serialize)]
#[serde(untagged)]
pub enum BurndownResult {
    Project(ProjectBurndown),
    Hub(HubRollup),
}

impl Output for BurndownResult {
    fn to_human(&self) -> String {
        match self {
            BurndownResult::Project(b) => format!(
                "{}: {}/{} points done, {} remaining ({})",
                b.project, b.completed_points, b.total_points, b.remaining_points, b.completion
            ),
            BurndownResult::Hub(rollup) => rollup.to_human(),
        }
    }
}

pub fn burndown(store: &Store) -> Result<BurndownResult> {
    if store.is_hub() && !store.config().projects.is_empty() {
        return hub::rollup(store).map(BurndownResult::Hub);
    }
    let index = indexer::build_index(store)?;
    Ok(BurndownResult::Project(ProjectBurndown {
        project: store.config().name.clone(),
        total_points: index.total_points,
        completed_points: index.completed_points,
        remaining_points: index.total_points.saturating_sub(index.completed_points),
        completion: format!("{}%", index.completion_pct()),
    }))
}

// ==================== Show ====================

#[derive(Serialize)]
pub struct ShowResult {
    #[serde(flatten)]
    pub item: Item,
    pub body: String,
}

impl Output for ShowResult {
    fn to_human(&self) -> String {
        let item = &self.item;
        let mut lines = vec![
            format!("{} {}: {}", item.kind().label(), item.id(), item.title()),
            format!("  Status: {}", status_label(item.status())),
            format!("  Points: {}", points_label(item.points())),
        ];
        match item {
            Item::Epic(e) => {
                lines.push(format!("  Priority: {}", e.priority));
                if let Some(date) = e.target_date {
                    lines.push(format!("  Target: {}", date));
                }
            }
            Item::Story(s) => {
                lines.push(format!("  Priority: {}", s.priority));
                if let Some(epic) = &s.epic_id {
                    lines.push(format!("  Epic: {}", epic));
                }
                if !s.acceptance_criteria.is_empty() {
                    lines.push("  Acceptance criteria:".to_string());
                    for criterion in &s.acceptance_criteria {
                        lines.push(format!("    - {}", criterion));
                    }
                }
            }
            Item::Task(t) => {
                lines.push(format!("  Story: {}", t.story_id));
                if let Some(assignee) = &t.assignee {
                    lines.push(format!("  Assignee: {}", assignee));
                }
            }
        }
        if !self.body.trim().is_empty() {
            lines.push(String::new());
            lines.push(indent(&self.body));
        }
        lines.join("\n")
    }
}

pub fn show(store: &Store, id: &str) -> Result<ShowResult> {
    let (item, body) = store.get(&ItemId::parse(id)?)?;
    Ok(ShowResult { item, body })
}

// ==================== Reindex ====================

#[derive(Serialize)]
pub struct ReindexResult {
    pub entries: usize,
    pub epics: usize,
    pub stories: usize,
    pub tasks: usize,
    pub total_points: u32,
    pub completed_points: u32,
}

impl Output for ReindexResult {
    fn to_human(&self) -> String {
        format!(
            "Rebuilt index: {} entries ({} epics, {} stories, {} tasks), {}/{} points done",
            self.entries, self.epics, self.stories, self.tasks, self.completed_points, self.total_points
        )
    }
}

pub fn reindex(store: &Store) -> Result<ReindexResult> {
    let index = indexer::write_index(store)?;
    Ok(ReindexResult {
        entries: index.entries.len(),
        epics: index.epic_count,
        stories: index.story_count,
        tasks: index.task_count,
        total_points: index.total_points,
        completed_points: index.completed_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::Points;
    use crate::storage::{ItemPatch, NewStory, NewTask};
    use crate::test_utils::TestEnv;

    #[test]
    fn test_init_writes_index() {
        let env = TestEnv::new();
        let result = init(
            env.path(),
            InitOptions {
                name: "demo".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(result.initialized);
        assert_eq!(result.prefix, "PRJ");
        assert!(env.path().join(".project/INDEX.md").is_file());
        assert!(result.to_json().contains("\"initialized\":true"));
    }

    #[test]
    fn test_init_twice_fails() {
        let env = TestEnv::new();
        env.init_store();
        let err = init(
            env.path(),
            InitOptions {
                name: "again".to_string(),
                ..Default::default()
            },
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::AlreadyInitialized));
    }

    #[test]
    fn test_status_counts_by_status() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let story = store
            .create_story(NewStory {
                title: "A".to_string(),
                points: Some(Points::new(8).unwrap()),
                ..Default::default()
            })
            .unwrap();
        let task = store
            .create_task(
                &story.id,
                NewTask {
                    title: "T".to_string(),
                    points: Some(Points::new(2).unwrap()),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .update(&task.id.parse().unwrap(), ItemPatch::status("done"))
            .unwrap();

        let result = status(&store).unwrap();

        assert_eq!(result.stories, 1);
        assert_eq!(result.tasks, 1);
        assert_eq!(result.total_points, 10);
        assert_eq!(result.completed_points, 2);
        assert_eq!(result.completion, "20%");
        assert_eq!(result.by_status.get("backlog"), Some(&1));
        assert_eq!(result.by_status.get("done"), Some(&1));
        assert!(result.to_human().contains("2/10 points done (20%)"));
    }

    #[test]
    fn test_burndown_empty_project() {
        let env = TestEnv::new();
        let store = env.init_store();
        let BurndownResult::Project(b) = burndown(&store).unwrap() else {
            panic!("expected a project burndown");
        };
        assert_eq!(b.remaining_points, 0);
        assert_eq!(b.completion, "0%");
    }

    #[test]
    fn test_show_story() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let story = store
            .create_story(NewStory {
                title: "Login".to_string(),
                description: "Let users sign in.".to_string(),
                acceptance_criteria: vec!["Valid users get a session".to_string()],
                ..Default::default()
            })
            .unwrap();

        let result = show(&store, &story.id).unwrap();

        let json = result.to_json();
        assert!(json.contains("\"id\":\"US-TST-1\""));
        assert!(json.contains("\"body\":\"Let users sign in.\""));
        let human = result.to_human();
        assert!(human.starts_with("Story US-TST-1: Login"));
        assert!(human.contains("    - Valid users get a session"));
    }

    #[test]
    fn test_show_invalid_id() {
        let env = TestEnv::new();
        let store = env.init_store();
        assert!(matches!(show(&store, "not an id"), Err(Error::InvalidId(_))));
    }
}
