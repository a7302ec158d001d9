//! Board, readiness, audit, search and planning-guidance commands.

use serde::Serialize;

use super::{Output, points_label};
use crate::audit::{self, AuditReport};
use crate::board::{self, BoardEntry, BoardPage, check_readiness, compute_hints};
use crate::guidance::{self, AutoScope, EpicScope, Estimate, ScopeMode, StoryScope};
use crate::hub::{self, ProjectAudit};
use crate::models::ItemId;
use crate::search::{self, SearchResult};
use crate::storage::Store;
use crate::{Error, Result};

// ==================== Board ====================

fn bucket_lines(lines: &mut Vec<String>, heading: &str, total: usize, entries: &[BoardEntry]) {
    if total == 0 {
        return;
    }
    lines.push(format!("{} ({}):", heading, total));
    for entry in entries {
        let mut line = format!(
            "  {:<14} {:>5}  {}  [{}]",
            entry.id,
            points_label(entry.points),
            entry.title,
            entry.story
        );
        if let Some(assignee) = &entry.assignee {
            line.push_str(&format!(" @{}", assignee));
        }
        lines.push(line);
        if !entry.hints.is_empty() {
            lines.push(format!("      hints: {}", entry.hints.join(", ")));
        }
        for blocker in &entry.blockers {
            lines.push(format!("      blocked: {}", blocker));
        }
    }
    if entries.len() < total {
        lines.push(format!("  ... {} more", total - entries.len()));
    }
    lines.push(String::new());
}

impl Output for BoardPage {
    fn to_human(&self) -> String {
        let s = &self.summary;
        if s.available + s.not_ready + s.in_progress + s.in_review + s.blocked == 0 {
            return "Board is empty.".to_string();
        }
        let mut lines = Vec::new();
        let b = &self.board;
        bucket_lines(&mut lines, "Available", s.available, &b.available);
        bucket_lines(&mut lines, "Not ready", s.not_ready, &b.not_ready);
        bucket_lines(&mut lines, "In progress", s.in_progress, &b.in_progress);
        bucket_lines(&mut lines, "In review", s.in_review, &b.in_review);
        bucket_lines(&mut lines, "Blocked", s.blocked, &b.blocked);
        lines.join("\n").trim_end().to_string()
    }
}

/// A blank assignee filter means no filter.
pub fn board(store: &Store, assignee: Option<&str>, offset: usize, limit: Option<usize>) -> Result<BoardPage> {
    let assignee = assignee.map(str::trim).filter(|a| !a.is_empty());
    Ok(board::build_board(store, assignee)?.page(offset, limit))
}

// ==================== Readiness ====================

#[derive(Serialize)]
pub struct ReadinessReport {
    pub task_id: String,
    pub ready: bool,
    pub blockers: Vec<String>,
    pub warnings: Vec<String>,
    pub hints: Vec<String>,
}

impl Output for ReadinessReport {
    fn to_human(&self) -> String {
        let verdict = if self.ready { "ready" } else { "NOT ready" };
        let mut lines = vec![format!("{} is {}", self.task_id, verdict)];
        for blocker in &self.blockers {
            lines.push(format!("  ✗ {}", blocker));
        }
        for warning in &self.warnings {
            lines.push(format!("  ! {}", warning));
        }
        if !self.hints.is_empty() {
            lines.push(format!("  hints: {}", self.hints.join(", ")));
        }
        lines.join("\n")
    }
}

/// Evaluate one task against the readiness gates without claiming it.
pub fn ready(store: &Store, task_id: &str) -> Result<ReadinessReport> {
    let ItemId::Task(id) = ItemId::parse(task_id)? else {
        return Err(Error::InvalidInput(format!("{} is not a task ID", task_id.trim())));
    };
    let (task, body) = store.get_task(&id)?;
    let result = check_readiness(&task, &body, store);
    Ok(ReadinessReport {
        hints: compute_hints(&task, &body),
        task_id: task.id,
        ready: result.ready,
        blockers: result.blockers,
        warnings: result.warnings,
    })
}

// ==================== Audit ====================

/// A single project's report, or one report per hub sub-project.
#[derive(Serialize)]
#[serde(untagged)]
pub enum AuditResult {
    Project(AuditReport),
    Hub { projects: Vec<ProjectAudit> },
}

impl Output for AuditResult {
    fn to_human(&self) -> String {
        match self {
            AuditResult::Project(report) => report.text.clone(),
            AuditResult::Hub { projects } if projects.is_empty() => {
                "No initialized sub-projects to audit.".to_string()
            }
            AuditResult::Hub { projects } => projects
                .iter()
                .map(|p| match (&p.report, &p.error) {
                    (Some(report), _) => format!("## {}\n\n{}", p.name, report.text),
                    (None, error) => format!(
                        "## {}\n\nError: {}",
                        p.name,
                        error.as_deref().unwrap_or("unknown")
                    ),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// Run the drift audit. With `all` on a hub, audit every sub-project instead.
pub fn audit(store: &Store, all: bool) -> Result<AuditResult> {
    if all && store.is_hub() {
        return Ok(AuditResult::Hub {
            projects: hub::audit_all(store)?,
        });
    }
    audit::run_audit(store).map(AuditResult::Project)
}

// ==================== Search ====================

#[derive(Serialize)]
pub struct SearchResults {
    pub query: String,
    pub results: Vec<SearchResult>,
}

impl Output for SearchResults {
    fn to_human(&self) -> String {
        if self.results.is_empty() {
            return format!("No matches for '{}'.", self.query);
        }
        self.results
            .iter()
            .map(|r| format!("{} ({}, {:.1}) {}\n  ...{}...", r.id, r.kind, r.score, r.title, r.snippet))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn search(store: &Store, query: &str, limit: Option<usize>) -> Result<SearchResults> {
    let results = search::keyword_search(store, query, limit.unwrap_or(search::DEFAULT_LIMIT))?;
    Ok(SearchResults {
        query: query.trim().to_string(),
        results,
    })
}

// ==================== Guidance ====================

/// Guidance documents read as YAML in human mode.
fn yaml<T: Serialize>(value: &T) -> String {
    serde_yaml::to_string(value).unwrap_or_else(|e| format!("Error: {}", e))
}

impl Output for Estimate {
    fn to_human(&self) -> String {
        yaml(self)
    }
}

impl Output for AutoScope {
    fn to_human(&self) -> String {
        yaml(self)
    }
}

pub fn estimate(store: &Store, id: &str) -> Result<Estimate> {
    guidance::estimate(store, &ItemId::parse(id)?)
}

/// Decomposition context for a story, or for an epic when given an epic ID.
#[derive(Serialize)]
#[serde(untagged)]
pub enum ScopeResult {
    Story(StoryScope),
    Epic(EpicScope),
}

impl Output for ScopeResult {
    fn to_human(&self) -> String {
        yaml(self)
    }
}

pub fn scope(store: &Store, id: &str) -> Result<ScopeResult> {
    match ItemId::parse(id)? {
        ItemId::Story(id) => guidance::scope(store, &id).map(ScopeResult::Story),
        ItemId::Epic(id) => guidance::scope_epic(store, &id).map(ScopeResult::Epic),
        ItemId::Task(id) => Err(Error::InvalidInput(format!(
            "{} is a task; scope a story or an epic",
            id
        ))),
    }
}

pub fn auto_scope(store: &Store, mode: Option<&str>) -> Result<AutoScope> {
    let mode = mode.map(str::parse::<ScopeMode>).transpose()?;
    guidance::auto_scope(store, mode)
}
