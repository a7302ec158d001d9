//! Drift audit: a fixed set of rules evaluated over a snapshot of the project.
//!
//! The snapshot is gathered once from the [`Store`], rules run against it in
//! declaration order (see [`rules::registry`]), and the rendered report is
//! written to `.project/DRIFT.md` on every run.

pub mod docs;
pub mod report;
pub mod rules;

use chrono::NaiveDate;
use serde::Serialize;

use crate::Result;
use crate::models::{Epic, Story, Task};
use crate::storage::{HUB_DOCS, PROJECT_DOCS, Store, today};

pub use docs::{DocSlot, DocState};
pub use report::SeverityCounts;

/// Report file written next to the project data.
pub const DRIFT_FILE: &str = "DRIFT.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Marker used in the markdown report.
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Error => "[ERROR]",
            Severity::Warning => "[WARN]",
            Severity::Info => "[INFO]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// Name of the rule that produced this finding
    pub check: String,
    pub message: String,
    /// IDs or file names the finding is about
    pub items: Vec<String>,
}

/// An entity together with the length of its trimmed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Described<T> {
    pub item: T,
    pub body_chars: usize,
}

impl<T> Described<T> {
    pub fn new(item: T, body: &str) -> Self {
        Self {
            item,
            body_chars: body.trim().chars().count(),
        }
    }
}

/// Everything the rules look at, read from disk once.
#[derive(Debug, Clone, Default)]
pub struct AuditSnapshot {
    pub epics: Vec<Epic>,
    pub stories: Vec<Described<Story>>,
    pub tasks: Vec<Described<Task>>,
    pub project_docs: Vec<DocSlot>,
    /// Empty unless the project is a hub
    pub hub_docs: Vec<DocSlot>,
    /// Sorted file names under `malformed/`
    pub malformed: Vec<String>,
    pub hub: bool,
}

impl AuditSnapshot {
    pub fn gather(store: &Store) -> Result<Self> {
        let dir = store.project_dir();

        let epics = store.list_epics(None)?;
        let stories = store
            .stories_with_bodies()?
            .into_iter()
            .map(|(story, body)| Described::new(story, &body))
            .collect();
        let tasks = store
            .tasks_with_bodies()?
            .into_iter()
            .map(|(task, body)| Described::new(task, &body))
            .collect();

        let project_docs = PROJECT_DOCS
            .iter()
            .map(|name| DocSlot::read(dir, name))
            .collect::<Result<Vec<_>>>()?;

        let hub = store.is_hub();
        let hub_docs = if hub {
            HUB_DOCS
                .iter()
                .map(|name| DocSlot::read(dir, name))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let malformed = store.list_malformed()?;

        Ok(Self {
            epics,
            stories,
            tasks,
            project_docs,
            hub_docs,
            malformed,
            hub,
        })
    }

    /// Tasks belonging to `story_id`.
    pub fn tasks_of<'a>(&'a self, story_id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks
            .iter()
            .map(|t| &t.item)
            .filter(move |t| t.story_id == story_id)
    }

    /// Stories linked to `epic_id`.
    pub fn stories_of<'a>(&'a self, epic_id: &'a str) -> impl Iterator<Item = &'a Story> + 'a {
        self.stories
            .iter()
            .map(|s| &s.item)
            .filter(move |s| s.epic_id.as_deref() == Some(epic_id))
    }
}

/// What each rule sees.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub snapshot: AuditSnapshot,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub findings: Vec<Finding>,
    pub summary: SeverityCounts,
    /// Rendered markdown, identical to `DRIFT.md` minus the trailing newline
    pub text: String,
}

/// Audit the project as of today and rewrite `DRIFT.md`.
pub fn run_audit(store: &Store) -> Result<AuditReport> {
    run_audit_at(store, today())
}

/// Audit the project as of `today` and rewrite `DRIFT.md`.
pub fn run_audit_at(store: &Store, today: NaiveDate) -> Result<AuditReport> {
    let ctx = AuditContext {
        snapshot: AuditSnapshot::gather(store)?,
        today,
    };
    let findings = rules::evaluate_rules(&ctx);
    let text = report::render(&findings);
    let summary = SeverityCounts::tally(&findings);

    std::fs::write(store.project_dir().join(DRIFT_FILE), format!("{text}\n"))?;
    tracing::info!(
        errors = summary.errors,
        warnings = summary.warnings,
        info = summary.info,
        "audit complete"
    );

    Ok(AuditReport {
        findings,
        summary,
        text,
    })
}
