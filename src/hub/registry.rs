//! Sub-project registration for hub projects.
//!
//! A hub keeps each sub-project's data under `.project/projects/<name>/`;
//! the checkout itself, when present, lives at `<hub>/projects/<name>/`.

use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use super::dashboards::{self, Dashboards};
use crate::indexer;
use crate::storage::{InitOptions, Store, templates};
use crate::{Error, Result};

/// Subdirectory name used both for data dirs and checkouts.
pub const PROJECTS_DIR: &str = "projects";

/// Prefix used when a name has no letters to derive one from.
const FALLBACK_PREFIX: &str = "PRJ";

/// Written to the hub data directory by [`repair`].
pub const REPAIR_FILE: &str = "REPAIR.md";

fn github_https_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://github\.com/([^/]+/[^/]+?)(?:\.git)?/?$").expect("Invalid regex")
    })
}

fn github_ssh_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^git@github\.com:([^/]+/[^/]+?)(?:\.git)?$").expect("Invalid regex"))
}

/// `owner/repo` from a GitHub URL, or an empty string for anything else.
pub fn parse_github_repo(url: &str) -> String {
    [github_https_regex(), github_ssh_regex()]
        .iter()
        .find_map(|re| re.captures(url.trim()))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Up to three leading letters of `name`, uppercased.
///
/// `my-api` gives `MYA`, `webapp` gives `WEB`.
pub fn derive_prefix(name: &str) -> String {
    let prefix: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    if prefix.is_empty() {
        FALLBACK_PREFIX.to_string()
    } else {
        prefix
    }
}

fn validate_project_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid project name '{name}': use letters, digits, '-', '_' or '.'"
        )))
    }
}

fn require_hub(hub: &Store) -> Result<()> {
    if hub.is_hub() { Ok(()) } else { Err(Error::NotHub) }
}

/// Data directory for sub-project `name`.
pub fn data_dir(hub: &Store, name: &str) -> PathBuf {
    hub.project_dir().join(PROJECTS_DIR).join(name)
}

/// Checkout directory for sub-project `name`.
pub fn checkout_dir(hub: &Store, name: &str) -> PathBuf {
    hub.root().join(PROJECTS_DIR).join(name)
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedProject {
    pub name: String,
    pub prefix: String,
    pub repo: String,
    pub data_dir: PathBuf,
}

/// Register `name` in the hub and initialize its data directory.
///
/// `url` is only used to record the GitHub `owner/repo`; nothing is cloned.
pub fn add_project(hub: &mut Store, name: &str, url: Option<&str>) -> Result<AddedProject> {
    require_hub(hub)?;
    let name = name.trim();
    validate_project_name(name)?;
    if hub.config().projects.iter().any(|p| p == name) {
        return Err(Error::InvalidInput(format!("Project '{name}' is already registered")));
    }

    let repo = url.map(parse_github_repo).unwrap_or_default();
    let dir = data_dir(hub, name);
    let prefix = match Store::open_project_dir(&checkout_dir(hub, name), &dir) {
        // Data left behind by an earlier registration is kept as is.
        Ok(existing) => existing.config().prefix.clone(),
        Err(Error::NotInitialized) => init_data_dir(hub, name, &repo)?.config().prefix.clone(),
        Err(e) => return Err(e),
    };

    hub.update_config(|c| c.projects.push(name.to_string()))?;
    tracing::info!(project = %name, prefix = %prefix, "registered sub-project");

    Ok(AddedProject {
        name: name.to_string(),
        prefix,
        repo,
        data_dir: dir,
    })
}

fn init_data_dir(hub: &Store, name: &str, repo: &str) -> Result<Store> {
    Store::init_project_dir(
        &checkout_dir(hub, name),
        &data_dir(hub, name),
        InitOptions {
            name: name.to_string(),
            prefix: Some(derive_prefix(name)),
            repo: repo.to_string(),
            ..Default::default()
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectEntry {
    pub name: String,
    /// Where the checkout is expected
    pub path: PathBuf,
    pub exists: bool,
    /// Whether the data directory holds a config
    pub initialized: bool,
}

/// Registered sub-projects in registration order.
pub fn list_projects(hub: &Store) -> Result<Vec<ProjectEntry>> {
    require_hub(hub)?;
    Ok(hub
        .config()
        .projects
        .iter()
        .map(|name| {
            let path = checkout_dir(hub, name);
            ProjectEntry {
                name: name.clone(),
                exists: path.exists(),
                initialized: data_dir(hub, name).join(crate::config::CONFIG_FILE).is_file(),
                path,
            }
        })
        .collect())
}

/// Open the store of a registered sub-project.
pub fn project_store(hub: &Store, name: &str) -> Result<Store> {
    require_hub(hub)?;
    if !hub.config().projects.iter().any(|p| p == name) {
        return Err(Error::NotFound(format!("Project '{name}' not found in hub")));
    }
    Store::open_project_dir(&checkout_dir(hub, name), &data_dir(hub, name))
}

/// A sub-project file moved to its quarantine directory.
#[derive(Debug, Clone, Serialize)]
pub struct RepairedFile {
    pub project: String,
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebuiltIndex {
    pub name: String,
    pub stories: usize,
    pub tasks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectFailure {
    pub name: String,
    pub error: String,
}

/// Everything [`repair`] changed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    /// Projects registered after the run
    pub registered: usize,
    pub discovered: Vec<String>,
    pub initialized: Vec<String>,
    pub quarantined: Vec<RepairedFile>,
    pub rebuilt: Vec<RebuiltIndex>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<ProjectFailure>,
    pub hub_docs_created: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboards: Option<Dashboards>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_error: Option<String>,
    pub report: PathBuf,
}

impl RepairReport {
    pub fn to_markdown(&self) -> String {
        let mut lines = vec!["# Hub Repair Report\n".to_string()];

        if !self.discovered.is_empty() {
            lines.push(format!("## Discovered {} unregistered project(s)\n", self.discovered.len()));
            for name in &self.discovered {
                lines.push(format!("- **{}**: registered in hub config", name));
            }
            lines.push(String::new());
        }

        if !self.initialized.is_empty() {
            lines.push(format!("## Initialized {} project(s)\n", self.initialized.len()));
            for name in &self.initialized {
                lines.push(format!("- **{}**: created `.project/projects/{}/`", name, name));
            }
            lines.push(String::new());
        }

        if !self.quarantined.is_empty() {
            lines.push(format!("## Quarantined {} malformed file(s)\n", self.quarantined.len()));
            for q in &self.quarantined {
                lines.push(format!(
                    "- `{}` → `.project/projects/{}/malformed/{}`: {}",
                    q.file, q.project, q.file, q.error
                ));
            }
            lines.push(String::new());
        }

        if !self.rebuilt.is_empty() {
            lines.push(format!("## Rebuilt indexes for {} project(s)\n", self.rebuilt.len()));
            for r in &self.rebuilt {
                lines.push(format!("- **{}**: {} stories, {} tasks", r.name, r.stories, r.tasks));
            }
            lines.push(String::new());
        }

        if !self.failed.is_empty() {
            lines.push(format!("## Failed {} project(s)\n", self.failed.len()));
            for f in &self.failed {
                lines.push(format!("- **{}**: {}", f.name, f.error));
            }
            lines.push(String::new());
        }

        if !self.hub_docs_created.is_empty() {
            lines.push(format!("## Created {} missing hub doc(s)\n", self.hub_docs_created.len()));
            for doc in &self.hub_docs_created {
                lines.push(format!("- **{}**", doc));
            }
            lines.push(String::new());
        }

        match (&self.dashboards, &self.dashboard_error) {
            (_, Some(error)) => lines.push(format!("## Dashboard generation failed: {}\n", error)),
            (Some(_), None) => {
                lines.push("## Regenerated hub dashboards\n".to_string());
                lines.push(format!(
                    "- Updated {} and {}\n",
                    dashboards::STATUS_FILE,
                    dashboards::BURNDOWN_FILE
                ));
            }
            (None, None) => {}
        }

        let stories: usize = self.rebuilt.iter().map(|r| r.stories).sum();
        let tasks: usize = self.rebuilt.iter().map(|r| r.tasks).sum();
        lines.push("## Summary\n".to_string());
        lines.push(format!("- **Projects registered:** {}", self.registered));
        lines.push(format!("- **Newly discovered:** {}", self.discovered.len()));
        lines.push(format!("- **Newly initialized:** {}", self.initialized.len()));
        lines.push(format!("- **Files quarantined:** {}", self.quarantined.len()));
        lines.push(format!("- **Indexes rebuilt:** {}", self.rebuilt.len()));
        lines.push(format!("- **Total stories found:** {}", stories));
        lines.push(format!("- **Total tasks found:** {}", tasks));

        lines.join("\n") + "\n"
    }
}

/// Unregistered checkout directories under `<hub>/projects/`, sorted.
///
/// Names that `hub add` would reject (hidden directories among them) are ignored.
fn unregistered_checkouts(hub: &Store) -> Result<Vec<String>> {
    let dir = hub.root().join(PROJECTS_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .filter(|name| !hub.config().projects.contains(name))
        .filter(|name| match validate_project_name(name) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(dir = %name, error = %e, "ignoring checkout directory");
                false
            }
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Quarantine malformed files and rebuild the index of one sub-project.
fn refresh_project(store: &Store, name: &str, report: &mut RepairReport) -> Result<()> {
    let quarantined = store.quarantine_malformed()?;
    report.quarantined.extend(quarantined.into_iter().map(|q| RepairedFile {
        project: name.to_string(),
        file: q.file,
        error: q.error,
    }));
    let index = indexer::write_index(store)?;
    report.rebuilt.push(RebuiltIndex {
        name: name.to_string(),
        stories: index.story_count,
        tasks: index.task_count,
    });
    Ok(())
}

/// Bring the hub back to a consistent state and write `REPAIR.md`.
///
/// Registers checkouts found under `<hub>/projects/`, initializes missing
/// data directories, quarantines malformed files and rebuilds the index of
/// every initialized sub-project, recreates missing hub docs and regenerates
/// the dashboards. A failing sub-project is reported and does not stop the run.
pub fn repair(hub: &mut Store) -> Result<RepairReport> {
    require_hub(hub)?;
    let mut report = RepairReport::default();

    fs::create_dir_all(hub.root().join(PROJECTS_DIR))?;
    let discovered = unregistered_checkouts(hub)?;
    if !discovered.is_empty() {
        hub.update_config(|c| c.projects.extend(discovered.iter().cloned()))?;
        tracing::info!(count = discovered.len(), "registered discovered sub-projects");
    }
    report.discovered = discovered;

    for name in hub.config().projects.clone() {
        let outcome = match Store::open_project_dir(&checkout_dir(hub, &name), &data_dir(hub, &name)) {
            Ok(store) => refresh_project(&store, &name, &mut report),
            Err(Error::NotInitialized) => init_data_dir(hub, &name, "").map(|_| {
                report.initialized.push(name.clone());
            }),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            tracing::warn!(project = %name, error = %e, "sub-project repair failed");
            report.failed.push(ProjectFailure {
                name,
                error: e.to_string(),
            });
        }
    }

    let hub_name = hub.config().name.clone();
    let hub_docs = [
        ("VISION.md", templates::vision_doc(&hub_name)),
        ("ARCHITECTURE.md", templates::hub_architecture_doc(&hub_name)),
        ("DECISIONS.md", templates::decisions_doc(&hub_name)),
    ];
    for (doc, content) in hub_docs {
        let path = hub.project_dir().join(doc);
        if !path.exists() {
            fs::write(&path, content)?;
            report.hub_docs_created.push(doc.to_string());
        }
    }

    match dashboards::generate(hub) {
        Ok(written) => report.dashboards = Some(written),
        Err(e) => report.dashboard_error = Some(e.to_string()),
    }

    report.registered = hub.config().projects.len();
    report.report = hub.project_dir().join(REPAIR_FILE);
    fs::write(&report.report, report.to_markdown())?;
    tracing::info!(
        discovered = report.discovered.len(),
        initialized = report.initialized.len(),
        quarantined = report.quarantined.len(),
        "repaired hub"
    );
    Ok(report)
}
