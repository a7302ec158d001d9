//! Projectman - git-native project management for humans and AI agents.
//!
//! This library provides the core functionality for the `pm` CLI tool:
//! epics, stories and tasks stored as markdown files with YAML frontmatter,
//! a readiness gate for claimable work, a ranked work board, a drift audit,
//! and hub-level aggregation across sub-projects.

pub mod audit;
pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod guidance;
pub mod hub;
pub mod indexer;
pub mod logging;
pub mod models;
pub mod search;
pub mod storage;


/// Library-level error type for projectman operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not initialized: run `pm init` first")]
    NotInitialized,

    #[error("Already initialized: .project/ exists")]
    AlreadyInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task {id} is not ready: {}", blockers.join("; "))]
    NotReady { id: String, blockers: Vec<String> },

    #[error("Not a hub project: run `pm init --hub` to create one")]
    NotHub,

    #[error("{0}")]
    Other(String),
}

impl From<kdl::KdlError> for Error {
    fn from(err: kdl::KdlError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias for projectman operations.
pub type Result<T> = std::result::Result<T, Error>;
