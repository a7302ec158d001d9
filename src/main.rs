//! Projectman CLI - git-native project management for humans and AI agents.

use chrono::NaiveDate;
use clap::Parser;
use projectman::cli::{
    Cli, Commands, ConfigCommands, EpicCommands, HubCommands, MalformedCommands, StoryCommands,
    TaskCommands,
};
use projectman::commands::{self, Output};
use projectman::config::{
    OutputFormat, PROJECT_DIR, PreferenceOverrides, ResolvedPreferences, find_project_root,
    resolve_preferences,
};
use projectman::logging;
use projectman::models::{Points, Priority};
use projectman::storage::{InitOptions, ItemPatch, NewEpic, NewStory, NewTask, Store};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

/// Everything a command needs besides its own arguments.
struct Context {
    repo_path: PathBuf,
    project: Option<String>,
    prefs: ResolvedPreferences,
    human: bool,
}

impl Context {
    fn store(&self) -> Result<Store, projectman::Error> {
        commands::open_store(&self.repo_path, self.project.as_deref())
    }

    /// Data directory of the current project, when one is initialized.
    fn project_dir(&self) -> Option<PathBuf> {
        self.store().ok().map(|s| s.project_dir().to_path_buf())
    }

    fn output<T: Output>(&self, result: &T) {
        output(result, self.human);
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let flag_human = cli.human_readable;

    let repo_path = resolve_repo_path(cli.repo_path, flag_human);

    let prefs = match load_preferences(&repo_path, flag_human) {
        Ok(prefs) => prefs,
        Err(e) => exit_with_error(&e, flag_human),
    };
    let ctx = Context {
        human: prefs.output_format() == OutputFormat::Human,
        repo_path,
        project: cli.project,
        prefs,
    };

    if let Err(e) = run_command(cli.command, &ctx) {
        exit_with_error(&e, ctx.human);
    }
}

fn exit_with_error(e: &projectman::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}

/// Resolve the repository path from the explicit flag or the current directory.
///
/// Priority: --repo flag > PM_REPO env var > current working directory.
/// Commands walk up from this path to find `.project/`.
fn resolve_repo_path(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                let err = projectman::Error::Other(format!(
                    "Specified repo path does not exist: {}",
                    path.display()
                ));
                exit_with_error(&err, human);
            }
            path
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// The -H flag outranks every preference file.
fn load_preferences(repo_path: &Path, flag_human: bool) -> Result<ResolvedPreferences, projectman::Error> {
    let mut overrides = PreferenceOverrides::new();
    if flag_human {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let project_dir = find_project_root(repo_path).ok().map(|root| root.join(PROJECT_DIR));
    resolve_preferences(project_dir.as_deref(), &overrides)
}

fn parse_points(points: Option<u8>) -> Result<Option<Points>, projectman::Error> {
    points.map(Points::new).transpose()
}

fn parse_priority(priority: Option<String>) -> Result<Option<Priority>, projectman::Error> {
    priority.map(|p| p.parse()).transpose()
}

fn parse_date(date: Option<String>) -> Result<Option<NaiveDate>, projectman::Error> {
    date.map(|d| {
        NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").map_err(|_| {
            projectman::Error::InvalidInput(format!("Invalid date '{}' (expected YYYY-MM-DD)", d))
        })
    })
    .transpose()
}

/// Directory name of the repository, used when `init` gets no name.
fn default_project_name(repo_path: &Path) -> String {
    std::fs::canonicalize(repo_path)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "project".to_string())
}

fn run_command(command: Option<Commands>, ctx: &Context) -> Result<(), projectman::Error> {
    match command {
        Some(Commands::Init {
            name,
            prefix,
            description,
            hub,
        }) => {
            let options = InitOptions {
                name: name.unwrap_or_else(|| default_project_name(&ctx.repo_path)),
                prefix,
                description: description.unwrap_or_default(),
                hub,
                repo: String::new(),
            };
            let result = commands::init(&ctx.repo_path, options)?;
            ctx.output(&result);
        }

        Some(Commands::Status) => {
            let result = commands::status(&ctx.store()?)?;
            ctx.output(&result);
        }

        Some(Commands::Burndown) => {
            let result = commands::burndown(&ctx.store()?)?;
            ctx.output(&result);
        }

        Some(Commands::Show { id }) => {
            let result = commands::show(&ctx.store()?, &id)?;
            ctx.output(&result);
        }

        Some(Commands::Epic { command }) => {
            let mut store = ctx.store()?;
            match command {
                EpicCommands::Create {
                    title,
                    description,
                    priority,
                    target_date,
                    tag,
                } => {
                    let new = NewEpic {
                        title,
                        description: description.unwrap_or_default(),
                        priority: Some(parse_priority(priority)?.unwrap_or(ctx.prefs.default_priority())),
                        target_date: parse_date(target_date)?,
                        tags: tag,
                    };
                    let result = commands::epic_create(&mut store, new)?;
                    ctx.output(&result);
                }

                EpicCommands::List { status } => {
                    let result = commands::epic_list(&store, status.as_deref())?;
                    ctx.output(&result);
                }

                EpicCommands::Update {
                    id,
                    title,
                    status,
                    priority,
                    target_date,
                    tag,
                    description,
                } => {
                    let patch = ItemPatch {
                        title,
                        status,
                        priority: parse_priority(priority)?,
                        target_date: parse_date(target_date)?,
                        tags: tag,
                        body: description,
                        ..Default::default()
                    };
                    let result = commands::update(&mut store, &id, patch)?;
                    ctx.output(&result);
                }

                EpicCommands::Archive { id } => {
                    let result = commands::archive(&mut store, &id)?;
                    ctx.output(&result);
                }
            }
        }

        Some(Commands::Story { command }) => {
            let mut store = ctx.store()?;
            match command {
                StoryCommands::Create {
                    title,
                    description,
                    priority,
                    points,
                    epic,
                    tag,
                    criteria,
                } => {
                    let new = NewStory {
                        title,
                        description: description.unwrap_or_default(),
                        priority: Some(parse_priority(priority)?.unwrap_or(ctx.prefs.default_priority())),
                        points: parse_points(points)?,
                        epic_id: epic,
                        tags: tag,
                        acceptance_criteria: criteria,
                    };
                    let result = commands::story_create(&mut store, new)?;
                    ctx.output(&result);
                }

                StoryCommands::List { status, epic } => {
                    let result = commands::story_list(&store, status.as_deref(), epic.as_deref())?;
                    ctx.output(&result);
                }

                StoryCommands::Update {
                    id,
                    title,
                    status,
                    priority,
                    points,
                    epic,
                    tag,
                    criteria,
                    description,
                } => {
                    let patch = ItemPatch {
                        title,
                        status,
                        priority: parse_priority(priority)?,
                        points: parse_points(points)?,
                        epic_id: epic,
                        tags: tag,
                        acceptance_criteria: criteria,
                        body: description,
                        ..Default::default()
                    };
                    let result = commands::update(&mut store, &id, patch)?;
                    ctx.output(&result);
                }

                StoryCommands::Archive { id } => {
                    let result = commands::archive(&mut store, &id)?;
                    ctx.output(&result);
                }
            }
        }

        Some(Commands::Task { command }) => {
            let mut store = ctx.store()?;
            match command {
                TaskCommands::Create {
                    story_id,
                    title,
                    description,
                    points,
                } => {
                    let new = NewTask {
                        title,
                        description: description.unwrap_or_default(),
                        points: parse_points(points)?,
                    };
                    let result = commands::task_create(&mut store, &story_id, new)?;
                    ctx.output(&result);
                }

                TaskCommands::Batch { story_id, file } => {
                    let result = commands::task_batch(&mut store, &story_id, &file)?;
                    ctx.output(&result);
                }

                TaskCommands::List { story, status } => {
                    let result = commands::task_list(&store, story.as_deref(), status.as_deref())?;
                    ctx.output(&result);
                }

                TaskCommands::Update {
                    id,
                    title,
                    status,
                    points,
                    assignee,
                    description,
                } => {
                    let patch = ItemPatch {
                        title,
                        status,
                        points: parse_points(points)?,
                        assignee,
                        body: description,
                        ..Default::default()
                    };
                    let result = commands::update(&mut store, &id, patch)?;
                    ctx.output(&result);
                }

                TaskCommands::Archive { id } => {
                    let result = commands::archive(&mut store, &id)?;
                    ctx.output(&result);
                }

                TaskCommands::Grab { id, assignee } => {
                    let assignee = assignee.unwrap_or_else(|| ctx.prefs.default_assignee().to_string());
                    let result = commands::task_grab(&mut store, &id, &assignee)?;
                    ctx.output(&result);
                }
            }
        }

        Some(Commands::Board {
            assignee,
            offset,
            limit,
        }) => {
            let result = commands::board(&ctx.store()?, assignee.as_deref(), offset, limit)?;
            ctx.output(&result);
        }

        Some(Commands::Ready { task_id }) => {
            let result = commands::ready(&ctx.store()?, &task_id)?;
            ctx.output(&result);
        }

        Some(Commands::Audit { all }) => {
            let result = commands::audit(&ctx.store()?, all)?;
            ctx.output(&result);
        }

        Some(Commands::Reindex) => {
            let result = commands::reindex(&ctx.store()?)?;
            ctx.output(&result);
        }

        Some(Commands::Search { query, limit }) => {
            let result = commands::search(&ctx.store()?, &query, limit)?;
            ctx.output(&result);
        }

        Some(Commands::Estimate { id }) => {
            let result = commands::estimate(&ctx.store()?, &id)?;
            ctx.output(&result);
        }

        Some(Commands::Scope { id }) => {
            let result = commands::scope(&ctx.store()?, &id)?;
            ctx.output(&result);
        }

        Some(Commands::AutoScope { mode }) => {
            let result = commands::auto_scope(&ctx.store()?, mode.as_deref())?;
            ctx.output(&result);
        }

        Some(Commands::Malformed { command }) => {
            let store = ctx.store()?;
            match command {
                MalformedCommands::List => {
                    let result = commands::malformed_list(&store)?;
                    ctx.output(&result);
                }
                MalformedCommands::Quarantine => {
                    let result = commands::malformed_quarantine(&store)?;
                    ctx.output(&result);
                }
                MalformedCommands::Show { file } => {
                    let result = commands::malformed_show(&store, &file)?;
                    ctx.output(&result);
                }
                MalformedCommands::Restore { file } => {
                    let result = commands::malformed_restore(&store, &file)?;
                    ctx.output(&result);
                }
            }
        }

        Some(Commands::Hub { command }) => {
            // Hub commands always address the hub itself, never a sub-project.
            let root = find_project_root(&ctx.repo_path)?;
            let mut hub = Store::open(&root)?;
            match command {
                HubCommands::Add { name, repo } => {
                    let result = commands::hub_add(&mut hub, &name, repo.as_deref())?;
                    ctx.output(&result);
                }
                HubCommands::List => {
                    let result = commands::hub_list(&hub)?;
                    ctx.output(&result);
                }
                HubCommands::Rollup => {
                    let result = commands::hub_rollup(&hub)?;
                    ctx.output(&result);
                }
                HubCommands::Dashboards => {
                    let result = commands::hub_dashboards(&hub)?;
                    ctx.output(&result);
                }
                HubCommands::Repair => {
                    let result = commands::hub_repair(&mut hub)?;
                    ctx.output(&result);
                }
            }
        }

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => ctx.output(&ctx.prefs),
            ConfigCommands::Set { key, value, global } => {
                let project_dir = ctx.project_dir();
                let result = commands::config_set(project_dir.as_deref(), &key, &value, global)?;
                ctx.output(&result);
            }
        },

        None => {
            // Default: show status summary
            match ctx.store() {
                Ok(store) => ctx.output(&commands::status(&store)?),
                Err(projectman::Error::NotInitialized) => {
                    if ctx.human {
                        println!("Projectman - Not initialized.");
                        println!("Run `pm init` to initialize, then `pm story create \"Title\"` to add work.");
                    } else {
                        println!(r#"{{"initialized": false}}"#);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
