//! Hub commands: sub-project registry, rollup, dashboards and repair.

use serde::Serialize;

use super::Output;
use crate::Result;
use crate::hub::dashboards::{self, Dashboards};
use crate::hub::{self, AddedProject, HubRollup, ProjectEntry, RepairReport};
use crate::storage::Store;

impl Output for AddedProject {
    fn to_human(&self) -> String {
        let mut line = format!("Registered sub-project '{}' (prefix {})", self.name, self.prefix);
        if !self.repo.is_empty() {
            line.push_str(&format!(" from {}", self.repo));
        }
        line
    }
}

pub fn hub_add(hub: &mut Store, name: &str, repo: Option<&str>) -> Result<AddedProject> {
    hub::add_project(hub, name, repo)
}

#[derive(Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectEntry>,
}

impl Output for ProjectList {
    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No sub-projects registered.".to_string();
        }
        self.projects
            .iter()
            .map(|p| {
                let state = match (p.exists, p.initialized) {
                    (_, true) => "initialized",
                    (true, false) => "not initialized",
                    (false, false) => "missing",
                };
                format!("{:<20} {:<16} {}", p.name, state, p.path.display())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn hub_list(hub: &Store) -> Result<ProjectList> {
    Ok(ProjectList {
        projects: hub::list_projects(hub)?,
    })
}

impl Output for HubRollup {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!(
                "Hub: {} projects, {} epics, {} stories, {} tasks",
                self.projects.len(),
                self.total_epics,
                self.total_stories,
                self.total_tasks
            ),
            format!(
                "  {}/{} points done, {} remaining ({})",
                self.completed_points,
                self.total_points,
                self.remaining_points(),
                self.completion
            ),
        ];
        for project in &self.projects {
            match &project.stats {
                Some(s) => lines.push(format!(
                    "  {:<20} {}/{} pts",
                    project.name, s.completed_points, s.total_points
                )),
                None => lines.push(format!("  {:<20} {}", project.name, project.status)),
            }
        }
        lines.join("\n")
    }
}

pub fn hub_rollup(hub: &Store) -> Result<HubRollup> {
    hub::rollup(hub)
}

impl Output for Dashboards {
    fn to_human(&self) -> String {
        format!(
            "Wrote {}\nWrote {}",
            self.status.display(),
            self.burndown.display()
        )
    }
}

pub fn hub_dashboards(hub: &Store) -> Result<Dashboards> {
    dashboards::generate(hub)
}

impl Output for RepairReport {
    fn to_human(&self) -> String {
        format!("{}\nWrote {}", self.to_markdown().trim_end(), self.report.display())
    }
}

pub fn hub_repair(hub: &mut Store) -> Result<RepairReport> {
    hub::repair(hub)
}
