//! Storage layer for projectman data.
//!
//! Each entity is one markdown file with YAML frontmatter, stored under the
//! project data directory:
//!
//! ```text
//! .project/
//!   config.yaml       project config and ID counters
//!   epics/            EPIC-PRJ-1.md ...
//!   stories/          US-PRJ-1.md ...
//!   tasks/            US-PRJ-1-1.md ...
//!   malformed/        quarantined files that failed to parse
//!   index.yaml        derived index (see `indexer`)
//! ```
//!
//! A hub keeps one such directory per registered sub-project under
//! `.project/projects/<name>/`.
//!
//! Writes are whole-file overwrites with no locking; two processes
//! allocating IDs at the same moment can collide.

pub mod frontmatter;
pub mod templates;

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{CONFIG_FILE, PROJECT_DIR, ProjectConfig};
use crate::models::{
    EntityKind, Epic, EpicStatus, Item, ItemId, Points, Priority, ProjectIndex, Story,
    StoryStatus, Task, TaskStatus, id::validate_id,
};
use crate::{Error, Result};

/// Name of the quarantine directory.
pub const MALFORMED_DIR: &str = "malformed";

/// Name of the derived index file.
pub const INDEX_FILE: &str = "index.yaml";

/// Project documents every project is expected to keep current.
pub const PROJECT_DOCS: [&str; 3] = ["PROJECT.md", "INFRASTRUCTURE.md", "SECURITY.md"];

/// Additional documents kept by a hub.
pub const HUB_DOCS: [&str; 3] = ["VISION.md", "ARCHITECTURE.md", "DECISIONS.md"];

/// Today's local calendar date.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// An entity type that can be stored as a frontmatter file.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn record_id(&self) -> &str;
}

impl Record for Epic {
    const KIND: EntityKind = EntityKind::Epic;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Story {
    const KIND: EntityKind = EntityKind::Story;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Options for initializing a new project data directory.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub name: String,
    /// ID prefix; defaults to `PRJ`
    pub prefix: Option<String>,
    pub description: String,
    pub hub: bool,
    /// Upstream repository (hub sub-projects)
    pub repo: String,
}

/// Fields for a new epic.
#[derive(Debug, Clone, Default)]
pub struct NewEpic {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub target_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

/// Fields for a new story.
#[derive(Debug, Clone, Default)]
pub struct NewStory {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub points: Option<Points>,
    pub epic_id: Option<String>,
    pub tags: Vec<String>,
    pub acceptance_criteria: Vec<String>,
}

/// Fields for a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub points: Option<Points>,
}

/// A partial update. `None` leaves a field untouched.
///
/// `status` is kept as text and parsed against the target entity's status
/// set. An empty `assignee` or `epic_id` clears the field.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    pub points: Option<Points>,
    pub assignee: Option<String>,
    pub epic_id: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
    pub acceptance_criteria: Option<Vec<String>>,
    pub body: Option<String>,
}

impl ItemPatch {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.points.is_none()
            && self.assignee.is_none()
            && self.epic_id.is_none()
            && self.target_date.is_none()
            && self.tags.is_none()
            && self.acceptance_criteria.is_none()
            && self.body.is_none()
    }
}

fn reject_field(field: &str, kind: EntityKind) -> Error {
    Error::InvalidInput(format!("field '{}' does not apply to a {}", field, kind))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

/// A file moved into the quarantine directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantinedFile {
    pub file: String,
    pub kind: EntityKind,
    /// First line of the parse error
    pub error: String,
}

/// File-backed store for one project data directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    project_dir: PathBuf,
    config: ProjectConfig,
}

impl Store {
    /// Open the project whose data lives in `<root>/.project/`.
    pub fn open(root: &Path) -> Result<Self> {
        Self::open_project_dir(root, &root.join(PROJECT_DIR))
    }

    /// Open a project whose data lives in an explicit directory
    /// (e.g. a hub sub-project at `<hub>/.project/projects/<name>/`).
    pub fn open_project_dir(root: &Path, project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.is_file() {
            return Err(Error::NotInitialized);
        }
        let config = ProjectConfig::load(&config_path)?;
        Ok(Self {
            root: root.to_path_buf(),
            project_dir: project_dir.to_path_buf(),
            config,
        })
    }

    /// Create `<root>/.project/` with config, doc templates and an empty index.
    pub fn init(root: &Path, options: InitOptions) -> Result<Self> {
        let project_dir = root.join(PROJECT_DIR);
        if project_dir.exists() {
            return Err(Error::AlreadyInitialized);
        }
        Self::init_project_dir(root, &project_dir, options)
    }

    /// Initialize an explicit data directory. Fails if it already holds a config.
    pub fn init_project_dir(root: &Path, project_dir: &Path, options: InitOptions) -> Result<Self> {
        if project_dir.join(CONFIG_FILE).exists() {
            return Err(Error::AlreadyInitialized);
        }

        let mut config = ProjectConfig::new(options.name.trim());
        if let Some(prefix) = options.prefix {
            config.prefix = prefix;
        }
        config.description = options.description;
        config.hub = options.hub;
        config.repo = options.repo;
        config.validate()?;

        for kind in [EntityKind::Epic, EntityKind::Story, EntityKind::Task] {
            fs::create_dir_all(project_dir.join(kind.dir_name()))?;
        }
        if config.hub {
            for dir in ["projects", "roadmap", "dashboards"] {
                fs::create_dir_all(project_dir.join(dir))?;
            }
        }

        config.save(&project_dir.join(CONFIG_FILE))?;

        let today = today();
        let docs = [
            ("PROJECT.md", templates::project_doc(&config.name, &config.description, today)),
            ("INFRASTRUCTURE.md", templates::infrastructure_doc(&config.name, today)),
            ("SECURITY.md", templates::security_doc(&config.name, today)),
        ];
        for (name, content) in docs {
            fs::write(project_dir.join(name), content)?;
        }
        if config.hub {
            let hub_docs = [
                ("VISION.md", templates::vision_doc(&config.name)),
                ("ARCHITECTURE.md", templates::hub_architecture_doc(&config.name)),
                ("DECISIONS.md", templates::decisions_doc(&config.name)),
            ];
            for (name, content) in hub_docs {
                fs::write(project_dir.join(name), content)?;
            }
        }

        let empty = serde_yaml::to_string(&ProjectIndex::default())?;
        fs::write(project_dir.join(INDEX_FILE), empty)?;

        tracing::info!(
            name = %config.name,
            hub = config.hub,
            dir = %project_dir.display(),
            "initialized project"
        );

        Ok(Self {
            root: root.to_path_buf(),
            project_dir: project_dir.to_path_buf(),
            config,
        })
    }

    /// Repository (or hub) root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project data directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn is_hub(&self) -> bool {
        self.config.hub
    }

    /// Apply a change to the config and persist it.
    pub fn update_config<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut ProjectConfig),
    {
        change(&mut self.config);
        self.config.validate()?;
        self.config.save(&self.project_dir.join(CONFIG_FILE))
    }

    fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.project_dir.join(kind.dir_name())
    }

    pub fn malformed_dir(&self) -> PathBuf {
        self.project_dir.join(MALFORMED_DIR)
    }

    fn entity_path(&self, kind: EntityKind, id: &str) -> PathBuf {
        self.kind_dir(kind).join(format!("{}.md", id))
    }

    // === ID allocation ===

    fn next_story_id(&mut self) -> Result<String> {
        let id = format!("US-{}-{}", self.config.prefix, self.config.next_story_id);
        self.update_config(|c| c.next_story_id += 1)?;
        Ok(id)
    }

    fn next_epic_id(&mut self) -> Result<String> {
        let id = format!("EPIC-{}-{}", self.config.prefix, self.config.next_epic_id);
        self.update_config(|c| c.next_epic_id += 1)?;
        Ok(id)
    }

    /// Next task ID under a story: one past the highest existing task number.
    ///
    /// Numbers come from file names in `tasks/` and `malformed/`, so an
    /// unparseable task file is never overwritten.
    fn next_task_id(&self, story_id: &str) -> Result<String> {
        let prefix = format!("{}-", story_id);
        let mut stems: Vec<String> = self
            .entity_files(EntityKind::Task)?
            .iter()
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        stems.extend(
            self.list_malformed()?
                .into_iter()
                .filter_map(|name| name.strip_suffix(".md").map(str::to_string)),
        );
        let highest = stems
            .iter()
            .filter_map(|stem| stem.strip_prefix(&prefix))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!("{}{}", prefix, highest + 1))
    }

    // === Generic file access ===

    fn write_record<T: Record>(&self, record: &T, body: &str) -> Result<()> {
        let dir = self.kind_dir(T::KIND);
        fs::create_dir_all(&dir)?;
        let content = frontmatter::render(record, body)?;
        fs::write(self.entity_path(T::KIND, record.record_id()), content)?;
        Ok(())
    }

    fn parse_record<T: Record>(content: &str) -> Result<(T, String)> {
        let (record, body): (T, String) = frontmatter::parse(content)?;
        validate_id(record.record_id())?;
        Ok((record, body))
    }

    fn read_record<T: Record>(&self, id: &str) -> Result<(T, String)> {
        validate_id(id)?;
        let path = self.entity_path(T::KIND, id);
        if !path.is_file() {
            return Err(Error::NotFound(format!("{} not found: {}", T::KIND.label(), id)));
        }
        let content = fs::read_to_string(&path)?;
        Self::parse_record(&content)
    }

    fn entity_files(&self, kind: EntityKind) -> Result<Vec<PathBuf>> {
        let dir = self.kind_dir(kind);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Every parseable record of a kind with its body, sorted by file name.
    fn load_all<T: Record>(&self) -> Result<Vec<(T, String)>> {
        let mut records = Vec::new();
        for path in self.entity_files(T::KIND)? {
            let parsed = fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|content| Self::parse_record::<T>(&content));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unparseable file");
                }
            }
        }
        Ok(records)
    }

    // === Epics ===

    pub fn create_epic(&mut self, new: NewEpic) -> Result<Epic> {
        let title = validate_title(&new.title)?;
        let id = self.next_epic_id()?;
        let mut epic = Epic::new(id, title, today());
        epic.priority = new.priority.unwrap_or_default();
        epic.target_date = new.target_date;
        epic.tags = new.tags;
        self.write_record(&epic, &new.description)?;
        tracing::debug!(id = %epic.id, "created epic");
        Ok(epic)
    }

    pub fn get_epic(&self, id: &str) -> Result<(Epic, String)> {
        self.read_record(id)
    }

    pub fn list_epics(&self, status: Option<EpicStatus>) -> Result<Vec<Epic>> {
        Ok(self
            .epics_with_bodies()?
            .into_iter()
            .map(|(epic, _)| epic)
            .filter(|e| status.is_none_or(|s| e.status == s))
            .collect())
    }

    pub fn epics_with_bodies(&self) -> Result<Vec<(Epic, String)>> {
        self.load_all()
    }

    // === Stories ===

    pub fn create_story(&mut self, new: NewStory) -> Result<Story> {
        let title = validate_title(&new.title)?;
        if let Some(ref epic_id) = new.epic_id {
            validate_id(epic_id)?;
        }
        let id = self.next_story_id()?;
        let mut story = Story::new(id, title, today());
        story.priority = new.priority.unwrap_or_default();
        story.points = new.points;
        story.epic_id = new.epic_id;
        story.tags = new.tags;
        story.acceptance_criteria = new.acceptance_criteria;
        self.write_record(&story, &new.description)?;
        tracing::debug!(id = %story.id, "created story");
        Ok(story)
    }

    pub fn get_story(&self, id: &str) -> Result<(Story, String)> {
        self.read_record(id)
    }

    pub fn list_stories(&self, status: Option<StoryStatus>) -> Result<Vec<Story>> {
        Ok(self
            .stories_with_bodies()?
            .into_iter()
            .map(|(story, _)| story)
            .filter(|s| status.is_none_or(|st| s.status == st))
            .collect())
    }

    pub fn stories_with_bodies(&self) -> Result<Vec<(Story, String)>> {
        self.load_all()
    }

    // === Tasks ===

    pub fn create_task(&mut self, story_id: &str, new: NewTask) -> Result<Task> {
        let mut created = self.create_tasks(story_id, vec![new])?;
        created
            .pop()
            .ok_or_else(|| Error::Other("task creation produced no task".to_string()))
    }

    /// Create several tasks under one story, numbered consecutively.
    pub fn create_tasks(&mut self, story_id: &str, tasks: Vec<NewTask>) -> Result<Vec<Task>> {
        validate_id(story_id)?;
        if !self.entity_path(EntityKind::Story, story_id).is_file() {
            return Err(Error::NotFound(format!("Story not found: {}", story_id)));
        }
        let titles = tasks
            .iter()
            .map(|t| validate_title(&t.title))
            .collect::<Result<Vec<_>>>()?;

        let today = today();
        let mut created = Vec::with_capacity(tasks.len());
        for (new, title) in tasks.into_iter().zip(titles) {
            let id = self.next_task_id(story_id)?;
            let mut task = Task::new(id, story_id.to_string(), title, today);
            task.points = new.points;
            self.write_record(&task, &new.description)?;
            tracing::debug!(id = %task.id, "created task");
            created.push(task);
        }
        Ok(created)
    }

    pub fn get_task(&self, id: &str) -> Result<(Task, String)> {
        self.read_record(id)
    }

    pub fn list_tasks(&self, story_id: Option<&str>, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        Ok(self
            .tasks_with_bodies()?
            .into_iter()
            .map(|(task, _)| task)
            .filter(|t| story_id.is_none_or(|sid| t.story_id == sid))
            .filter(|t| status.is_none_or(|s| t.status == s))
            .collect())
    }

    pub fn tasks_with_bodies(&self) -> Result<Vec<(Task, String)>> {
        self.load_all()
    }

    // === ID-dispatched operations ===

    /// Look up any entity by its ID.
    pub fn get(&self, id: &ItemId) -> Result<(Item, String)> {
        match id {
            ItemId::Epic(id) => self.get_epic(id).map(|(e, b)| (Item::Epic(e), b)),
            ItemId::Story(id) => self.get_story(id).map(|(s, b)| (Item::Story(s), b)),
            ItemId::Task(id) => self.get_task(id).map(|(t, b)| (Item::Task(t), b)),
        }
    }

    /// Apply a patch, validate it for the entity kind and bump `updated`.
    pub fn update(&mut self, id: &ItemId, patch: ItemPatch) -> Result<Item> {
        let today = today();
        let item = match id {
            ItemId::Epic(id) => {
                let (mut epic, body) = self.get_epic(id)?;
                for (field, set) in [
                    ("points", patch.points.is_some()),
                    ("assignee", patch.assignee.is_some()),
                    ("epic_id", patch.epic_id.is_some()),
                    ("acceptance_criteria", patch.acceptance_criteria.is_some()),
                ] {
                    if set {
                        return Err(reject_field(field, EntityKind::Epic));
                    }
                }
                if let Some(title) = patch.title {
                    epic.title = validate_title(&title)?;
                }
                if let Some(status) = patch.status {
                    epic.status = status.parse()?;
                }
                if let Some(priority) = patch.priority {
                    epic.priority = priority;
                }
                if let Some(date) = patch.target_date {
                    epic.target_date = Some(date);
                }
                if let Some(tags) = patch.tags {
                    epic.tags = tags;
                }
                epic.updated = today;
                self.write_record(&epic, patch.body.as_deref().unwrap_or(&body))?;
                Item::Epic(epic)
            }
            ItemId::Story(id) => {
                let (mut story, body) = self.get_story(id)?;
                for (field, set) in [
                    ("assignee", patch.assignee.is_some()),
                    ("target_date", patch.target_date.is_some()),
                ] {
                    if set {
                        return Err(reject_field(field, EntityKind::Story));
                    }
                }
                if let Some(title) = patch.title {
                    story.title = validate_title(&title)?;
                }
                if let Some(status) = patch.status {
                    story.status = status.parse()?;
                }
                if let Some(priority) = patch.priority {
                    story.priority = priority;
                }
                if let Some(points) = patch.points {
                    story.points = Some(points);
                }
                if let Some(epic_id) = patch.epic_id {
                    story.epic_id = non_empty(epic_id);
                    if let Some(ref epic_id) = story.epic_id {
                        validate_id(epic_id)?;
                    }
                }
                if let Some(tags) = patch.tags {
                    story.tags = tags;
                }
                if let Some(criteria) = patch.acceptance_criteria {
                    story.acceptance_criteria = criteria;
                }
                story.updated = today;
                self.write_record(&story, patch.body.as_deref().unwrap_or(&body))?;
                Item::Story(story)
            }
            ItemId::Task(id) => {
                let (mut task, body) = self.get_task(id)?;
                for (field, set) in [
                    ("priority", patch.priority.is_some()),
                    ("epic_id", patch.epic_id.is_some()),
                    ("target_date", patch.target_date.is_some()),
                    ("tags", patch.tags.is_some()),
                    ("acceptance_criteria", patch.acceptance_criteria.is_some()),
                ] {
                    if set {
                        return Err(reject_field(field, EntityKind::Task));
                    }
                }
                if let Some(title) = patch.title {
                    task.title = validate_title(&title)?;
                }
                if let Some(status) = patch.status {
                    task.status = status.parse()?;
                }
                if let Some(points) = patch.points {
                    task.points = Some(points);
                }
                if let Some(assignee) = patch.assignee {
                    task.assignee = non_empty(assignee);
                }
                task.updated = today;
                self.write_record(&task, patch.body.as_deref().unwrap_or(&body))?;
                Item::Task(task)
            }
        };
        tracing::debug!(id = %item.id(), "updated item");
        Ok(item)
    }

    /// Retire an entity: epics and stories become archived, tasks become done.
    pub fn archive(&mut self, id: &ItemId) -> Result<Item> {
        let status = match id {
            ItemId::Epic(_) => EpicStatus::Archived.as_str(),
            ItemId::Story(_) => StoryStatus::Archived.as_str(),
            ItemId::Task(_) => TaskStatus::Done.as_str(),
        };
        self.update(id, ItemPatch::status(status))
    }

    // === Malformed quarantine ===

    /// Move every entity file that fails to parse into `malformed/`.
    pub fn quarantine_malformed(&self) -> Result<Vec<QuarantinedFile>> {
        let mut quarantined = Vec::new();
        for kind in [EntityKind::Epic, EntityKind::Story, EntityKind::Task] {
            for path in self.entity_files(kind)? {
                // Unreadable content (e.g. invalid UTF-8) counts as malformed.
                let check = fs::read_to_string(&path)
                    .map_err(Error::from)
                    .and_then(|content| match kind {
                        EntityKind::Epic => Self::parse_record::<Epic>(&content).map(|_| ()),
                        EntityKind::Story => Self::parse_record::<Story>(&content).map(|_| ()),
                        EntityKind::Task => Self::parse_record::<Task>(&content).map(|_| ()),
                    });
                let Err(err) = check else { continue };

                let Some(file) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                    continue;
                };
                let dest_dir = self.malformed_dir();
                fs::create_dir_all(&dest_dir)?;
                fs::rename(&path, dest_dir.join(&file))?;

                let error = err.to_string().lines().next().unwrap_or_default().to_string();
                tracing::warn!(file = %file, kind = %kind, error = %error, "quarantined malformed file");
                quarantined.push(QuarantinedFile { file, kind, error });
            }
        }
        Ok(quarantined)
    }

    /// Names of quarantined files, sorted.
    pub fn list_malformed(&self) -> Result<Vec<String>> {
        let dir = self.malformed_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
            .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Raw content of a quarantined file, for fixing by hand.
    pub fn read_malformed(&self, file: &str) -> Result<String> {
        let path = self.malformed_path(file)?;
        let bytes = fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn malformed_path(&self, file: &str) -> Result<PathBuf> {
        let stem = file.strip_suffix(".md").unwrap_or(file);
        validate_id(stem)?;
        let path = self.malformed_dir().join(format!("{}.md", stem));
        if !path.is_file() {
            return Err(Error::NotFound(format!("Malformed file not found: {}", file)));
        }
        Ok(path)
    }

    /// Re-validate a fixed quarantined file and move it back into place.
    ///
    /// The destination directory is chosen from the file name's ID shape.
    /// The quarantine directory is removed once empty.
    pub fn restore_malformed(&self, file: &str) -> Result<Item> {
        let path = self.malformed_path(file)?;
        let stem = file.strip_suffix(".md").unwrap_or(file);
        let id = ItemId::parse(stem)?;
        let still_broken = |e: Error| Error::InvalidInput(format!("{} is still malformed: {}", file, e));
        let content = fs::read_to_string(&path).map_err(|e| still_broken(e.into()))?;
        let item = match &id {
            ItemId::Epic(_) => Item::Epic(Self::parse_record::<Epic>(&content).map_err(still_broken)?.0),
            ItemId::Story(_) => Item::Story(Self::parse_record::<Story>(&content).map_err(still_broken)?.0),
            ItemId::Task(_) => Item::Task(Self::parse_record::<Task>(&content).map_err(still_broken)?.0),
        };
        if item.id() != id.as_str() {
            return Err(Error::InvalidInput(format!(
                "{} declares id '{}' but its file name says '{}'",
                file,
                item.id(),
                id
            )));
        }

        let dest = self.entity_path(id.kind(), id.as_str());
        if dest.exists() {
            return Err(Error::InvalidInput(format!(
                "{} already exists in {}/",
                id,
                id.kind().dir_name()
            )));
        }
        fs::create_dir_all(self.kind_dir(id.kind()))?;
        fs::rename(&path, &dest)?;

        let dir = self.malformed_dir();
        if fs::read_dir(&dir)?.next().is_none() {
            fs::remove_dir(&dir)?;
        }
        tracing::info!(id = %id, "restored malformed file");
        Ok(item)
    }

    // === Index ===

    pub fn index_path(&self) -> PathBuf {
        self.project_dir.join(INDEX_FILE)
    }

    /// Read the last written index, or an empty one if none exists.
    pub fn read_index(&self) -> Result<ProjectIndex> {
        let path = self.index_path();
        if !path.is_file() {
            return Ok(ProjectIndex::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
