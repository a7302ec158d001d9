//! Hub mode: one project that tracks many.
//!
//! A hub is an ordinary project initialized with `--hub`. Besides its own
//! epics, stories and tasks it registers sub-projects whose data lives under
//! `.project/projects/<name>/`, and can roll their indexes up into totals and
//! dashboards.

pub mod dashboards;
pub mod registry;
pub mod rollup;

use serde::Serialize;

use crate::Result;
use crate::audit::{self, AuditReport};
use crate::storage::Store;

pub use registry::{AddedProject, ProjectEntry, RepairReport, add_project, list_projects, project_store, repair};
pub use rollup::{HubRollup, rollup};

/// Audit outcome for one sub-project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectAudit {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AuditReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Audit every initialized sub-project, each writing its own `DRIFT.md`.
pub fn audit_all(hub: &Store) -> Result<Vec<ProjectAudit>> {
    let entries = list_projects(hub)?;
    let mut audits = Vec::new();
    for entry in entries.into_iter().filter(|e| e.initialized) {
        let outcome = project_store(hub, &entry.name).and_then(|store| audit::run_audit(&store));
        audits.push(match outcome {
            Ok(report) => ProjectAudit {
                name: entry.name,
                report: Some(report),
                error: None,
            },
            Err(e) => ProjectAudit {
                name: entry.name,
                report: None,
                error: Some(e.to_string()),
            },
        });
    }
    Ok(audits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_audit_all_covers_initialized_projects() {
        let env = TestEnv::new();
        let mut hub = env.init_hub();
        add_project(&mut hub, "api", None).unwrap();
        hub.update_config(|c| c.projects.push("ghost".to_string()))
            .unwrap();

        let audits = audit_all(&hub).unwrap();

        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].name, "api");
        let report = audits[0].report.as_ref().unwrap();
        assert!(report.findings.iter().any(|f| f.check == "unfilled-documentation"));
        let data_dir = registry::data_dir(&hub, "api");
        assert!(data_dir.join(audit::DRIFT_FILE).is_file());
    }
}
