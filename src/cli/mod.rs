//! CLI argument definitions for projectman.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Version string with the commit and build time injected by `build.rs`.
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("PM_GIT_COMMIT"),
    "\nbuilt:  ",
    env!("PM_BUILD_TIMESTAMP"),
);

/// Projectman - git-native project management for humans and AI agents.
///
/// Start with `pm board` to see claimable work, then `pm task grab <id>` to claim it.
#[derive(Parser, Debug)]
#[command(name = "pm")]
#[command(author, version, long_version = LONG_VERSION, about = "Epics, stories and tasks as markdown files in your repository", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if pm was started in <path> instead of the current directory.
    /// The path must exist. Can also be set via PM_REPO environment variable.
    #[arg(short = 'C', long = "repo", global = true, env = "PM_REPO")]
    pub repo_path: Option<PathBuf>,

    /// Operate on a registered hub sub-project instead of the hub itself
    #[arg(short = 'P', long, global = true)]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize `.project/` in the current repository
    Init {
        /// Project name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// ID prefix, e.g. `API` for `US-API-1` (defaults to PRJ)
        #[arg(short, long)]
        prefix: Option<String>,

        /// One-line project description
        #[arg(short, long)]
        description: Option<String>,

        /// Create a hub that tracks sub-projects
        #[arg(long)]
        hub: bool,
    },

    /// Counts, points and completion for the project
    Status,

    /// Points completed versus remaining (hub rollup when run on a hub)
    Burndown,

    /// Show any entity by ID (auto-detects type)
    Show {
        /// Entity ID (e.g., EPIC-PRJ-1, US-PRJ-1, US-PRJ-1-2)
        id: String,
    },

    /// Epic management commands
    Epic {
        #[command(subcommand)]
        command: EpicCommands,
    },

    /// Story management commands
    Story {
        #[command(subcommand)]
        command: StoryCommands,
    },

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Work board: available, not ready, in progress, in review and blocked tasks
    Board {
        /// Only show work claimed by this assignee (hides unclaimed tasks)
        #[arg(short, long)]
        assignee: Option<String>,

        /// Skip this many entries in every bucket
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Show at most this many entries per bucket
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Check one task against the readiness gates without claiming it
    Ready {
        /// Task ID
        task_id: String,
    },

    /// Detect drift between tasks, stories, epics and docs; writes DRIFT.md
    Audit {
        /// On a hub, audit every initialized sub-project
        #[arg(long)]
        all: bool,
    },

    /// Rebuild index.yaml and the INDEX markdown files
    Reindex,

    /// Case-insensitive keyword search over titles and descriptions
    Search {
        /// Text to look for
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Estimation context for an epic, story or task
    Estimate {
        /// Entity ID
        id: String,
    },

    /// Decomposition context for a story (or an epic)
    Scope {
        /// Story or epic ID
        id: String,
    },

    /// Discover what needs scoping (full repository survey or undecomposed stories)
    AutoScope {
        /// Scan mode: full or incremental (auto-detected when omitted)
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Quarantine and repair entity files that fail to parse
    Malformed {
        #[command(subcommand)]
        command: MalformedCommands,
    },

    /// Hub commands (sub-projects, rollup, dashboards, repair)
    Hub {
        #[command(subcommand)]
        command: HubCommands,
    },

    /// Preference management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Epic subcommands
#[derive(Subcommand, Debug)]
pub enum EpicCommands {
    /// Create a new epic
    Create {
        /// Epic title
        title: String,

        /// Epic description (markdown body)
        #[arg(short, long)]
        description: Option<String>,

        /// Priority (must, should, could, wont)
        #[arg(short, long)]
        priority: Option<String>,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<String>,

        /// Tags for the epic
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// List epics
    List {
        /// Filter by status (draft, active, done, archived)
        #[arg(long)]
        status: Option<String>,
    },

    /// Update an epic
    Update {
        /// Epic ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New status (draft, active, done, archived)
        #[arg(long)]
        status: Option<String>,

        /// New priority
        #[arg(long)]
        priority: Option<String>,

        /// New target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<String>,

        /// Replace the tags
        #[arg(long)]
        tag: Option<Vec<String>>,

        /// Replace the description
        #[arg(long)]
        description: Option<String>,
    },

    /// Archive an epic
    Archive {
        /// Epic ID
        id: String,
    },
}

/// Story subcommands
#[derive(Subcommand, Debug)]
pub enum StoryCommands {
    /// Create a new story
    Create {
        /// Story title
        title: String,

        /// Story description (markdown body)
        #[arg(short, long)]
        description: Option<String>,

        /// Priority (must, should, could, wont)
        #[arg(short, long)]
        priority: Option<String>,

        /// Estimate (1, 2, 3, 5, 8, 13)
        #[arg(long)]
        points: Option<u8>,

        /// Parent epic ID
        #[arg(short, long)]
        epic: Option<String>,

        /// Tags for the story
        #[arg(short, long)]
        tag: Vec<String>,

        /// Acceptance criterion (repeatable)
        #[arg(short = 'a', long = "criterion")]
        criteria: Vec<String>,
    },

    /// List stories
    List {
        /// Filter by status (backlog, ready, active, done, archived)
        #[arg(long)]
        status: Option<String>,

        /// Only stories linked to this epic
        #[arg(long)]
        epic: Option<String>,
    },

    /// Update a story
    Update {
        /// Story ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New status (backlog, ready, active, done, archived)
        #[arg(long)]
        status: Option<String>,

        /// New priority
        #[arg(long)]
        priority: Option<String>,

        /// New estimate
        #[arg(long)]
        points: Option<u8>,

        /// Link to an epic (empty string unlinks)
        #[arg(long)]
        epic: Option<String>,

        /// Replace the tags
        #[arg(long)]
        tag: Option<Vec<String>>,

        /// Replace the acceptance criteria
        #[arg(long = "criterion")]
        criteria: Option<Vec<String>>,

        /// Replace the description
        #[arg(long)]
        description: Option<String>,
    },

    /// Archive a story
    Archive {
        /// Story ID
        id: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task under a story
    Create {
        /// Parent story ID
        story_id: String,

        /// Task title
        title: String,

        /// Task description (markdown body)
        #[arg(short, long)]
        description: Option<String>,

        /// Estimate (1, 2, 3, 5, 8, 13)
        #[arg(long)]
        points: Option<u8>,
    },

    /// Create several tasks from a YAML or JSON list (`title`, `description`, `points`)
    Batch {
        /// Parent story ID
        story_id: String,

        /// File holding the task list
        file: PathBuf,
    },

    /// List tasks
    List {
        /// Only tasks of this story
        #[arg(long)]
        story: Option<String>,

        /// Filter by status (todo, in-progress, review, done, blocked)
        #[arg(long)]
        status: Option<String>,
    },

    /// Update a task
    Update {
        /// Task ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New status (todo, in-progress, review, done, blocked)
        #[arg(long)]
        status: Option<String>,

        /// New estimate
        #[arg(long)]
        points: Option<u8>,

        /// New assignee (empty string clears)
        #[arg(long)]
        assignee: Option<String>,

        /// Replace the description
        #[arg(long)]
        description: Option<String>,
    },

    /// Mark a task done
    Archive {
        /// Task ID
        id: String,
    },

    /// Claim a ready task: assigns it and moves it to in-progress
    Grab {
        /// Task ID
        id: String,

        /// Assignee (defaults to the default-assignee preference, then $USER)
        #[arg(short, long)]
        assignee: Option<String>,
    },
}

/// Malformed-file subcommands
#[derive(Subcommand, Debug)]
pub enum MalformedCommands {
    /// List quarantined files
    List,

    /// Move entity files that fail to parse into `.project/malformed/`
    Quarantine,

    /// Print a quarantined file
    Show {
        /// File name (e.g., US-PRJ-1.md)
        file: String,
    },

    /// Re-validate a fixed file and move it back into place
    Restore {
        /// File name (e.g., US-PRJ-1.md)
        file: String,
    },
}

/// Hub subcommands
#[derive(Subcommand, Debug)]
pub enum HubCommands {
    /// Register a sub-project and initialize its data directory
    Add {
        /// Sub-project name
        name: String,

        /// Upstream GitHub URL (recorded as owner/repo)
        #[arg(long)]
        repo: Option<String>,
    },

    /// List registered sub-projects
    List,

    /// Aggregate every sub-project's index
    Rollup,

    /// Write status and burndown dashboards under `.project/dashboards/`
    Dashboards,

    /// Register stray checkouts, fix sub-project data and rebuild indexes and dashboards
    Repair,
}

/// Preference subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved preferences and where each value came from
    Show,

    /// Set a preference (output-format, default-assignee, default-priority)
    Set {
        /// Preference key
        key: String,

        /// New value
        value: String,

        /// Write the system preferences file instead of the project's
        #[arg(long)]
        global: bool,
    },
}
