//! Aggregate index statistics across a hub's sub-projects.

use serde::Serialize;

use super::registry::{self, data_dir};
use crate::config::CONFIG_FILE;
use crate::indexer;
use crate::models::{ProjectIndex, completion_pct};
use crate::storage::Store;
use crate::{Error, Result};

/// State of one sub-project as seen by the rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum RollupStatus {
    Active,
    NotInitialized,
    Error(String),
}

impl std::fmt::Display for RollupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollupStatus::Active => write!(f, "active"),
            RollupStatus::NotInitialized => write!(f, "not initialized"),
            RollupStatus::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

impl From<RollupStatus> for String {
    fn from(status: RollupStatus) -> Self {
        status.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub repo: String,
    pub epics: usize,
    pub stories: usize,
    pub tasks: usize,
    pub total_points: u32,
    pub completed_points: u32,
}

impl ProjectStats {
    fn from_index(repo: String, index: &ProjectIndex) -> Self {
        Self {
            repo,
            epics: index.epic_count,
            stories: index.story_count,
            tasks: index.task_count,
            total_points: index.total_points,
            completed_points: index.completed_points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRollup {
    pub name: String,
    pub status: RollupStatus,
    /// Present only for active sub-projects
    #[serde(flatten)]
    pub stats: Option<ProjectStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubRollup {
    pub projects: Vec<ProjectRollup>,
    pub total_epics: usize,
    pub total_stories: usize,
    pub total_tasks: usize,
    pub total_points: u32,
    pub completed_points: u32,
    /// Rounded percentage, e.g. `"42%"`
    pub completion: String,
}

impl HubRollup {
    pub fn remaining_points(&self) -> u32 {
        self.total_points.saturating_sub(self.completed_points)
    }
}

fn project_stats(hub: &Store, name: &str) -> Result<ProjectStats> {
    let store = registry::project_store(hub, name)?;
    let index = indexer::build_index(&store)?;
    Ok(ProjectStats::from_index(store.config().repo.clone(), &index))
}

/// Build every registered sub-project's index and total them.
///
/// A sub-project that is not initialized or fails to load is reported in
/// its entry and left out of the totals.
pub fn rollup(hub: &Store) -> Result<HubRollup> {
    if !hub.is_hub() {
        return Err(Error::NotHub);
    }

    let mut totals = HubRollup::default();
    for name in &hub.config().projects {
        let (status, stats) = if !data_dir(hub, name).join(CONFIG_FILE).is_file() {
            (RollupStatus::NotInitialized, None)
        } else {
            match project_stats(hub, name) {
                Ok(stats) => (RollupStatus::Active, Some(stats)),
                Err(e) => {
                    tracing::warn!(project = %name, error = %e, "sub-project rollup failed");
                    (RollupStatus::Error(e.to_string()), None)
                }
            }
        };

        if let Some(stats) = &stats {
            totals.total_epics += stats.epics;
            totals.total_stories += stats.stories;
            totals.total_tasks += stats.tasks;
            totals.total_points += stats.total_points;
            totals.completed_points += stats.completed_points;
        }
        totals.projects.push(ProjectRollup {
            name: name.clone(),
            status,
            stats,
        });
    }

    totals.completion = format!(
        "{}%",
        completion_pct(totals.completed_points, totals.total_points)
    );
    Ok(totals)
}
