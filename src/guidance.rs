//! Estimation and scoping context for whoever sizes or decomposes the work.
//!
//! These operations never change the store. Each returns a serializable
//! document (rendered as YAML by the CLI) carrying the item, its surroundings
//! and a short rubric.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use walkdir::WalkDir;

use crate::models::{Epic, FIBONACCI_POINTS, Item, ItemId, Points, Story, StoryStatus, Task};
use crate::storage::Store;
use crate::{Error, Result};

/// Build files read during a full scan, at most [`BUILD_FILE_LINES`] lines each.
pub const BUILD_FILES: &[&str] = &[
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "package.json",
    "package-lock.json",
    "Cargo.toml",
    "go.mod",
    "go.sum",
    "Makefile",
    "CMakeLists.txt",
    "Gemfile",
    "pom.xml",
    "build.gradle",
    "requirements.txt",
    "Pipfile",
];

pub const BUILD_FILE_LINES: usize = 200;

/// Docs looked up in the repository root, then in `.project/`.
pub const SCAN_DOCS: &[&str] = &["README.md", "PROJECT.md", "INFRASTRUCTURE.md", "SECURITY.md"];

/// Directories left out of the source tree.
const TREE_EXCLUDES: &[&str] = &[
    ".venv",
    ".git",
    "node_modules",
    "__pycache__",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "dist",
    "build",
    ".egg-info",
    ".eggs",
    "target",
    "vendor",
];

/// Levels below the root's children shown in the source tree.
const TREE_DEPTH: usize = 2;

const TASK_RULES: &[&str] = &[
    "Each task should be completable in one session (1-5 points)",
    "Tasks should be independently testable",
    "Include implementation + testing in each task",
    "First task should set up the foundation",
    "Last task should handle integration/cleanup",
];

const STORY_RULES: &[&str] = &[
    "Each story should represent a user-visible outcome",
    "Stories should be independent and deliverable on their own",
    "Group related tasks under the same story",
    "A story should be completable in 1-2 sprints (5-13 points)",
    "Cover the epic's success criteria across the stories",
];

const DISCOVERY_RULES: &[&str] = &[
    "Group related stories under epics",
    "Each story should represent user-visible value",
    "Each task should be completable in one session (1-5 points)",
    "Tasks should be independently testable",
    "Include implementation + testing in each task",
];

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub title: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<&'static str>,
    pub points: &'static str,
}

const TASK_TEMPLATE: Template = Template {
    title: "Verb phrase describing the deliverable",
    description: "Include: what to implement, acceptance criteria, files to touch",
    priority: None,
    points: "Fibonacci: 1, 2, 3, 5 (avoid 8+ for single tasks)",
};

const STORY_TEMPLATE: Template = Template {
    title: "As a [user], I want [goal] so that [benefit]",
    description: "Include: user story, acceptance criteria, notes",
    priority: Some("must / should / could / wont"),
    points: "Fibonacci: 1, 2, 3, 5, 8, 13",
};

// ==================== Estimation ====================

/// Mean points of done stories, or a marker when there are none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HistoricalAverage {
    Points(f64),
    NoData(&'static str),
}

impl HistoricalAverage {
    pub fn from_points(points: &[Points]) -> Self {
        if points.is_empty() {
            return HistoricalAverage::NoData("no data");
        }
        let total: u32 = points.iter().map(|p| p.as_u32()).sum();
        let mean = f64::from(total) / points.len() as f64;
        HistoricalAverage::Points((mean * 10.0).round() / 10.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EstimationGuidance {
    pub fibonacci_scale: Vec<u8>,
    pub calibration: BTreeMap<u8, &'static str>,
    pub historical_average: HistoricalAverage,
}

#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    pub item: Item,
    pub body: String,
    pub current_points: Option<Points>,
    pub estimation_guidance: EstimationGuidance,
}

fn calibration() -> BTreeMap<u8, &'static str> {
    BTreeMap::from([
        (1, "Trivial — ~15 min, single file change"),
        (2, "Small — ~30 min, a few related changes"),
        (3, "Medium — ~1 hour, moderate complexity"),
        (5, "Large — ~half day, multiple files/concerns"),
        (8, "Very large — ~full day, significant complexity"),
        (13, "Epic-sized — 2+ days, consider decomposing"),
    ])
}

/// Item content plus the point scale and the historical story average.
pub fn estimate(store: &Store, id: &ItemId) -> Result<Estimate> {
    let (item, body) = store.get(id)?;
    let done: Vec<Points> = store
        .list_stories(Some(StoryStatus::Done))?
        .into_iter()
        .filter_map(|s| s.points)
        .collect();

    Ok(Estimate {
        current_points: item.points(),
        item,
        body,
        estimation_guidance: EstimationGuidance {
            fibonacci_scale: FIBONACCI_POINTS.to_vec(),
            calibration: calibration(),
            historical_average: HistoricalAverage::from_points(&done),
        },
    })
}

// ==================== Scoping ====================

#[derive(Debug, Clone, Serialize)]
pub struct DecompositionGuidance {
    pub rules: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_template: Option<Template>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_template: Option<Template>,
}

impl DecompositionGuidance {
    fn tasks() -> Self {
        Self {
            rules: TASK_RULES,
            task_template: Some(TASK_TEMPLATE),
            story_template: None,
        }
    }

    fn stories() -> Self {
        Self {
            rules: STORY_RULES,
            task_template: None,
            story_template: Some(STORY_TEMPLATE),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryScope {
    pub story: Story,
    pub story_body: String,
    pub existing_tasks: Vec<Task>,
    pub task_count: usize,
    pub decomposition_guidance: DecompositionGuidance,
}

/// A story with its existing tasks, for breaking it into more.
pub fn scope(store: &Store, story_id: &str) -> Result<StoryScope> {
    let (story, story_body) = store.get_story(story_id)?;
    let existing_tasks = store.list_tasks(Some(story_id), None)?;
    Ok(StoryScope {
        task_count: existing_tasks.len(),
        story,
        story_body,
        existing_tasks,
        decomposition_guidance: DecompositionGuidance::tasks(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct EpicScope {
    pub epic: Epic,
    pub epic_body: String,
    pub linked_stories: Vec<Story>,
    pub story_count: usize,
    pub decomposition_guidance: DecompositionGuidance,
}

/// An epic with its linked stories, for breaking it into more.
pub fn scope_epic(store: &Store, epic_id: &str) -> Result<EpicScope> {
    let (epic, epic_body) = store.get_epic(epic_id)?;
    let linked_stories: Vec<Story> = store
        .list_stories(None)?
        .into_iter()
        .filter(|s| s.epic_id.as_deref() == Some(epic_id))
        .collect();
    Ok(EpicScope {
        story_count: linked_stories.len(),
        epic,
        epic_body,
        linked_stories,
        decomposition_guidance: DecompositionGuidance::stories(),
    })
}

// ==================== Auto-scope ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeMode {
    /// Survey the repository to seed epics and stories
    Full,
    /// Collect open stories that have no tasks yet
    Incremental,
}

impl FromStr for ScopeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(ScopeMode::Full),
            "incremental" => Ok(ScopeMode::Incremental),
            other => Err(Error::InvalidInput(format!(
                "Invalid scope mode '{other}' (expected one of: full, incremental)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryGuidance {
    pub epic_template: Template,
    pub story_template: Template,
    pub task_template: Template,
    pub rules: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct FullScan {
    pub mode: ScopeMode,
    pub project: String,
    pub prefix: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub documentation: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub build_files: BTreeMap<String, String>,
    pub source_tree: String,
    pub guidance: DiscoveryGuidance,
}

#[derive(Debug, Clone, Serialize)]
pub struct UndecomposedStory {
    pub story: Story,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncrementalScan {
    pub mode: ScopeMode,
    pub project: String,
    pub prefix: String,
    pub total_stories: usize,
    pub undecomposed_count: usize,
    pub undecomposed_stories: Vec<UndecomposedStory>,
    pub decomposition_guidance: DecompositionGuidance,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AutoScope {
    Full(FullScan),
    Incremental(IncrementalScan),
}

/// Discover what needs scoping. Without a mode, an empty project gets a
/// full scan and anything else an incremental one.
pub fn auto_scope(store: &Store, mode: Option<ScopeMode>) -> Result<AutoScope> {
    let mode = match mode {
        Some(mode) => mode,
        None if store.list_epics(None)?.is_empty() && store.list_stories(None)?.is_empty() => {
            ScopeMode::Full
        }
        None => ScopeMode::Incremental,
    };
    tracing::debug!(?mode, "auto-scope");

    match mode {
        ScopeMode::Full => full_scan(store).map(AutoScope::Full),
        ScopeMode::Incremental => incremental_scan(store).map(AutoScope::Incremental),
    }
}

fn full_scan(store: &Store) -> Result<FullScan> {
    let root = store.root();

    let mut documentation = BTreeMap::new();
    for name in SCAN_DOCS {
        let found = [root.join(name), store.project_dir().join(name)]
            .into_iter()
            .find(|path| path.is_file());
        if let Some(path) = found {
            documentation.insert(name.to_string(), std::fs::read_to_string(path)?);
        }
    }

    let mut build_files = BTreeMap::new();
    for name in BUILD_FILES {
        let path = root.join(name);
        if path.is_file() {
            let content = std::fs::read_to_string(&path)?;
            let head: Vec<&str> = content.lines().take(BUILD_FILE_LINES).collect();
            build_files.insert(name.to_string(), head.join("\n"));
        }
    }

    Ok(FullScan {
        mode: ScopeMode::Full,
        project: store.config().name.clone(),
        prefix: store.config().prefix.clone(),
        documentation,
        build_files,
        source_tree: source_tree(root).join("\n"),
        guidance: DiscoveryGuidance {
            epic_template: Template {
                title: "Short strategic name for a major initiative",
                description: "Vision, success criteria, and scope",
                priority: Some("must / should / could / wont"),
                points: "Optional; usually left to the stories",
            },
            story_template: STORY_TEMPLATE,
            task_template: TASK_TEMPLATE,
            rules: DISCOVERY_RULES,
        },
    })
}

fn incremental_scan(store: &Store) -> Result<IncrementalScan> {
    let stories = store.stories_with_bodies()?;
    let tasks = store.list_tasks(None, None)?;

    let total_stories = stories.len();
    let undecomposed_stories: Vec<UndecomposedStory> = stories
        .into_iter()
        .filter(|(story, _)| !story.status.is_closed())
        .filter(|(story, _)| !tasks.iter().any(|t| t.story_id == story.id))
        .map(|(story, body)| UndecomposedStory { story, body })
        .collect();

    Ok(IncrementalScan {
        mode: ScopeMode::Incremental,
        project: store.config().name.clone(),
        prefix: store.config().prefix.clone(),
        total_stories,
        undecomposed_count: undecomposed_stories.len(),
        undecomposed_stories,
        decomposition_guidance: DecompositionGuidance::tasks(),
    })
}

fn is_excluded_dir(name: &str) -> bool {
    TREE_EXCLUDES.contains(&name) || name.ends_with(".egg-info")
}

/// Indented listing of `root`: files before directories, names compared
/// case-insensitively, noise directories skipped.
pub fn source_tree(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(TREE_DEPTH + 1)
        .follow_links(false)
        .sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().to_ascii_lowercase().cmp(&b.file_name().to_ascii_lowercase()))
        })
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir() && is_excluded_dir(&entry.file_name().to_string_lossy()))
        })
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let indent = "  ".repeat(entry.depth() - 1);
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_dir() {
                format!("{indent}{name}/")
            } else {
                format!("{indent}{name}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ItemPatch, NewEpic, NewStory, NewTask};
    use crate::test_utils::TestEnv;

    fn pts(n: u8) -> Points {
        Points::new(n).unwrap()
    }

    #[test]
    fn test_historical_average() {
        assert_eq!(HistoricalAverage::from_points(&[]), HistoricalAverage::NoData("no data"));
        assert_eq!(
            HistoricalAverage::from_points(&[pts(1), pts(2), pts(2)]),
            HistoricalAverage::Points(1.7)
        );
    }

    #[test]
    fn test_estimate_uses_done_stories() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let done = store
            .create_story(NewStory {
                title: "Shipped".to_string(),
                points: Some(pts(5)),
                ..Default::default()
            })
            .unwrap();
        store
            .update(&done.id.parse().unwrap(), ItemPatch::status("done"))
            .unwrap();
        let open = store
            .create_story(NewStory {
                title: "Next".to_string(),
                description: "Size me.".to_string(),
                points: Some(pts(3)),
                ..Default::default()
            })
            .unwrap();

        let est = estimate(&store, &open.id.parse().unwrap()).unwrap();

        assert_eq!(est.body, "Size me.");
        assert_eq!(est.current_points, Some(pts(3)));
        assert_eq!(
            est.estimation_guidance.historical_average,
            HistoricalAverage::Points(5.0)
        );
        let yaml = serde_yaml::to_string(&est).unwrap();
        assert!(yaml.contains("fibonacci_scale:"));
        assert!(yaml.contains("13: Epic-sized"));
    }

    #[test]
    fn test_estimate_missing_item() {
        let env = TestEnv::new();
        let store = env.init_store();
        let err = estimate(&store, &"US-TST-9".parse().unwrap()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_scope_lists_existing_tasks() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let story = store
            .create_story(NewStory {
                title: "Login".to_string(),
                ..Default::default()
            })
            .unwrap();
        store
            .create_task(
                &story.id,
                NewTask {
                    title: "Form".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let scoped = scope(&store, &story.id).unwrap();
        assert_eq!(scoped.task_count, 1);
        assert_eq!(scoped.existing_tasks[0].title, "Form");

        let yaml = serde_yaml::to_string(&scoped).unwrap();
        assert!(yaml.contains("task_template:"));
        assert!(!yaml.contains("story_template:"));
    }

    #[test]
    fn test_scope_epic_lists_linked_stories() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let epic = store
            .create_epic(NewEpic {
                title: "Auth".to_string(),
                ..Default::default()
            })
            .unwrap();
        store
            .create_story(NewStory {
                title: "Login".to_string(),
                epic_id: Some(epic.id.clone()),
                ..Default::default()
            })
            .unwrap();
        store
            .create_story(NewStory {
                title: "Unrelated".to_string(),
                ..Default::default()
            })
            .unwrap();

        let scoped = scope_epic(&store, &epic.id).unwrap();
        assert_eq!(scoped.story_count, 1);
        assert_eq!(scoped.linked_stories[0].title, "Login");
    }

    #[test]
    fn test_auto_scope_detects_full_mode() {
        let env = TestEnv::new();
        let store = env.init_store();
        std::fs::write(env.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        std::fs::create_dir_all(env.path().join("src/nested")).unwrap();
        std::fs::write(env.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        std::fs::create_dir_all(env.path().join("target/debug")).unwrap();

        let AutoScope::Full(scan) = auto_scope(&store, None).unwrap() else {
            panic!("expected a full scan");
        };

        assert_eq!(scan.project, "test-project");
        assert!(scan.build_files.contains_key("Cargo.toml"));
        assert!(scan.documentation.contains_key("PROJECT.md"));
        assert!(scan.source_tree.contains("src/\n  main.rs\n  nested/"));
        assert!(!scan.source_tree.contains("target/"));
    }

    #[test]
    fn test_auto_scope_incremental_skips_closed_and_decomposed() {
        let env = TestEnv::new();
        let mut store = env.init_store();
        let bare = store
            .create_story(NewStory {
                title: "Bare".to_string(),
                ..Default::default()
            })
            .unwrap();
        let split = store
            .create_story(NewStory {
                title: "Split".to_string(),
                ..Default::default()
            })
            .unwrap();
        store
            .create_task(
                &split.id,
                NewTask {
                    title: "Part".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        let closed = store
            .create_story(NewStory {
                title: "Closed".to_string(),
                ..Default::default()
            })
            .unwrap();
        store.archive(&closed.id.parse().unwrap()).unwrap();

        let AutoScope::Incremental(scan) = auto_scope(&store, None).unwrap() else {
            panic!("expected an incremental scan");
        };

        assert_eq!(scan.total_stories, 3);
        assert_eq!(scan.undecomposed_count, 1);
        assert_eq!(scan.undecomposed_stories[0].story.id, bare.id);
    }

    #[test]
    fn test_scope_mode_parse() {
        assert_eq!("full".parse::<ScopeMode>().unwrap(), ScopeMode::Full);
        assert!("partial".parse::<ScopeMode>().is_err());
    }

    #[test]
    fn test_source_tree_depth() {
        let env = TestEnv::new();
        std::fs::create_dir_all(env.path().join("a/b/c/d")).unwrap();
        std::fs::write(env.path().join("a/b/c/d/deep.txt"), "").unwrap();
        std::fs::write(env.path().join("a/b/c/shallow.txt"), "").unwrap();
        std::fs::write(env.path().join("README.md"), "").unwrap();

        let tree = source_tree(env.path());
        assert_eq!(tree, vec!["README.md", "a/", "  b/", "    c/"]);
    }
}
