//! Markdown dashboards rendered from the hub rollup.

use serde::Serialize;
use std::path::PathBuf;

use super::rollup::{HubRollup, ProjectStats, RollupStatus, rollup};
use crate::Result;
use crate::models::completion_pct;
use crate::storage::Store;

pub const DASHBOARDS_DIR: &str = "dashboards";
pub const STATUS_FILE: &str = "status.md";
pub const BURNDOWN_FILE: &str = "burndown.md";

/// Width of the burndown progress bar in characters.
const BAR_WIDTH: u32 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboards {
    pub status: PathBuf,
    pub burndown: PathBuf,
}

fn active(data: &HubRollup) -> impl Iterator<Item = (&str, &ProjectStats)> {
    data.projects
        .iter()
        .filter(|p| p.status == RollupStatus::Active)
        .filter_map(|p| p.stats.as_ref().map(|s| (p.name.as_str(), s)))
}

pub fn render_status(data: &HubRollup) -> String {
    let mut lines = vec![
        "# Hub Status Dashboard\n".to_string(),
        format!("**Total Projects:** {}", data.projects.len()),
        format!("**Total Epics:** {}", data.total_epics),
        format!("**Total Stories:** {}", data.total_stories),
        format!("**Total Tasks:** {}", data.total_tasks),
        format!("**Completion:** {}\n", data.completion),
    ];

    let with_epics: Vec<_> = active(data).filter(|(_, s)| s.epics > 0).collect();
    if !with_epics.is_empty() {
        lines.push("## Epic Progress\n".to_string());
        lines.push("| Project | Epics | Stories | Completion |".to_string());
        lines.push("|---------|-------|---------|------------|".to_string());
        for (name, s) in with_epics {
            lines.push(format!(
                "| {} | {} | {} | {}% |",
                name,
                s.epics,
                s.stories,
                completion_pct(s.completed_points, s.total_points)
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Projects\n".to_string());
    lines.push("| Project | Epics | Stories | Tasks | Points | Done | Status |".to_string());
    lines.push("|---------|-------|---------|-------|--------|------|--------|".to_string());
    for project in &data.projects {
        match (&project.status, &project.stats) {
            (RollupStatus::Active, Some(s)) => lines.push(format!(
                "| {} | {} | {} | {} | {} | {} | active |",
                project.name, s.epics, s.stories, s.tasks, s.total_points, s.completed_points
            )),
            (status, _) => lines.push(format!(
                "| {} | — | — | — | — | — | {} |",
                project.name, status
            )),
        }
    }

    lines.join("\n") + "\n"
}

/// `done` of `total` as a fixed-width bar; the filled part rounds down.
pub fn progress_bar(done: u32, total: u32) -> String {
    let filled = (BAR_WIDTH * done / total.max(1)).min(BAR_WIDTH);
    format!(
        "{}{}",
        "█".repeat(filled as usize),
        "░".repeat((BAR_WIDTH - filled) as usize)
    )
}

pub fn render_burndown(data: &HubRollup) -> String {
    let mut lines = vec![
        "# Hub Burndown Dashboard\n".to_string(),
        format!("**Total Points:** {}", data.total_points),
        format!("**Completed:** {}", data.completed_points),
        format!("**Remaining:** {}", data.remaining_points()),
        format!("**Completion:** {}\n", data.completion),
        "## Per-Project Burndown\n".to_string(),
    ];
    for (name, s) in active(data) {
        lines.push(format!(
            "**{}**: [{}] {}/{} pts",
            name,
            progress_bar(s.completed_points, s.total_points),
            s.completed_points,
            s.total_points
        ));
    }
    lines.join("\n") + "\n"
}

/// Write `status.md` and `burndown.md` under `.project/dashboards/`.
pub fn generate(hub: &Store) -> Result<Dashboards> {
    let data = rollup(hub)?;
    let dir = hub.project_dir().join(DASHBOARDS_DIR);
    std::fs::create_dir_all(&dir)?;

    let status = dir.join(STATUS_FILE);
    let burndown = dir.join(BURNDOWN_FILE);
    std::fs::write(&status, render_status(&data))?;
    std::fs::write(&burndown, render_burndown(&data))?;
    tracing::info!(dir = %dir.display(), "wrote hub dashboards");

    Ok(Dashboards { status, burndown })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::rollup::ProjectRollup;
    use crate::test_utils::TestEnv;

    fn sample() -> HubRollup {
        HubRollup {
            projects: vec![
                ProjectRollup {
                    name: "api".to_string(),
                    status: RollupStatus::Active,
                    stats: Some(ProjectStats {
                        repo: String::new(),
                        epics: 2,
                        stories: 4,
                        tasks: 9,
                        total_points: 20,
                        completed_points: 5,
                    }),
                },
                ProjectRollup {
                    name: "ghost".to_string(),
                    status: RollupStatus::NotInitialized,
                    stats: None,
                },
            ],
            total_epics: 2,
            total_stories: 4,
            total_tasks: 9,
            total_points: 20,
            completed_points: 5,
            completion: "25%".to_string(),
        }
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 0), "░".repeat(20));
        assert_eq!(progress_bar(5, 20), format!("{}{}", "█".repeat(5), "░".repeat(15)));
        assert_eq!(progress_bar(1, 3), format!("{}{}", "█".repeat(6), "░".repeat(14)));
        assert_eq!(progress_bar(4, 4), "█".repeat(20));
    }

    #[test]
    fn test_render_status() {
        let text = render_status(&sample());
        assert!(text.starts_with("# Hub Status Dashboard\n\n**Total Projects:** 2\n"));
        assert!(text.contains("## Epic Progress\n\n| Project | Epics | Stories | Completion |"));
        assert!(text.contains("| api | 2 | 4 | 25% |"));
        assert!(text.contains("| api | 2 | 4 | 9 | 20 | 5 | active |"));
        assert!(text.contains("| ghost | — | — | — | — | — | not initialized |"));
        assert!(text.ends_with("|\n"));
    }

    #[test]
    fn test_render_burndown() {
        let text = render_burndown(&sample());
        assert!(text.contains("**Remaining:** 15"));
        assert!(text.contains("**api**: [█████░░░░░░░░░░░░░░░] 5/20 pts"));
        assert!(!text.contains("ghost"));
    }

    #[test]
    fn test_generate_writes_files() {
        let env = TestEnv::new();
        let hub = env.init_hub();

        let written = generate(&hub).unwrap();

        let status = std::fs::read_to_string(&written.status).unwrap();
        assert!(status.contains("**Total Projects:** 0"));
        assert!(!status.contains("## Epic Progress"));
        assert!(written.burndown.ends_with(".project/dashboards/burndown.md"));
    }
}
