//! Common test utilities for projectman integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't read or
//! write the user's `~/.config/projectman/` preferences.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// Description long enough to pass the readiness gate, with every section
/// the soft checks look for.
pub const READY_BODY: &str = "Wire the login form to the session endpoint and store the token.\n\n\
## Implementation\n\nCall the auth client from the submit handler.\n\n\
## Testing\n\nUnit test the handler with a stub client.\n\n\
## Definition of Done\n\n- [ ] Handler wired\n";

/// A test environment with isolated preferences.
///
/// Each `TestEnv` creates two temporary directories:
/// - `repo_dir`: Acts as the repository root
/// - `config_dir`: Holds system preferences (via `PM_CONFIG_DIR` env var)
///
/// The `pm()` method returns a `Command` that sets `PM_CONFIG_DIR`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub repo_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            repo_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment with a project named `demo` (prefix `DEM`).
    pub fn init() -> Self {
        let env = Self::new();
        env.pm()
            .args(["init", "--name", "demo", "--prefix", "DEM"])
            .assert()
            .success();
        env
    }

    /// Create a new test environment with a hub named `hub`.
    pub fn init_hub() -> Self {
        let env = Self::new();
        env.pm()
            .args(["init", "--name", "hub", "--prefix", "HUB", "--hub"])
            .assert()
            .success();
        env
    }

    /// Get a Command for the pm binary with isolated preferences.
    pub fn pm(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pm"));
        cmd.current_dir(self.repo_dir.path());
        cmd.env("PM_CONFIG_DIR", self.config_dir.path());
        cmd.env("USER", "tester");
        cmd.env_remove("PM_REPO");
        cmd.env_remove("PM_LOG");
        cmd
    }

    /// Run `pm` with `args` and return stdout, asserting success.
    pub fn run(&self, args: &[&str]) -> String {
        let output = self.pm().args(args).assert().success().get_output().stdout.clone();
        String::from_utf8(output).unwrap()
    }

    /// Run `pm` with `args` and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        serde_json::from_str(&self.run(args)).unwrap()
    }

    /// Create an active story with one ready 2-point task; returns (story, task) IDs.
    pub fn ready_task(&self) -> (String, String) {
        let story = self.json(&["story", "create", "Login", "--priority", "must"]);
        let story_id = story["id"].as_str().unwrap().to_string();
        self.pm()
            .args(["story", "update", &story_id, "--status", "active"])
            .assert()
            .success();
        let task = self.json(&[
            "task",
            "create",
            &story_id,
            "Wire form",
            "--points",
            "2",
            "-d",
            READY_BODY,
        ]);
        (story_id, task["id"].as_str().unwrap().to_string())
    }

    /// Get the path to the repo directory.
    pub fn path(&self) -> &std::path::Path {
        self.repo_dir.path()
    }

    /// Get the path to the project data directory.
    pub fn data_path(&self) -> std::path::PathBuf {
        self.repo_dir.path().join(".project")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
