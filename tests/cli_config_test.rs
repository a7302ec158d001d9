//! Integration tests for preference resolution and `pm config`.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_config_show_defaults() {
    let env = TestEnv::init();

    let json = env.json(&["config", "show"]);

    assert_eq!(json["output_format"]["value"], "json");
    assert_eq!(json["output_format"]["source"], "default");
    assert_eq!(json["default_assignee"]["value"], "tester");
    assert_eq!(json["default_assignee"]["source"], "env:USER");
    assert_eq!(json["default_priority"]["value"], "should");
}

#[test]
fn test_config_show_human_flag_source() {
    let env = TestEnv::init();

    env.pm()
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("output-format    = human    (cli)"));
}

#[test]
fn test_config_set_project_preference() {
    let env = TestEnv::init();

    let json = env.json(&["config", "set", "default-assignee", "alice"]);

    assert_eq!(json["key"], "default-assignee");
    assert!(env.data_path().join("preferences.kdl").is_file());

    let shown = env.json(&["config", "show"]);
    assert_eq!(shown["default_assignee"]["value"], "alice");
    assert_eq!(shown["default_assignee"]["source"], "project");
}

#[test]
fn test_config_set_global_preference() {
    let env = TestEnv::init();

    env.run(&["config", "set", "default-priority", "must", "--global"]);

    assert!(env.config_dir.path().join("preferences.kdl").is_file());
    let shown = env.json(&["config", "show"]);
    assert_eq!(shown["default_priority"]["value"], "must");
    assert_eq!(shown["default_priority"]["source"], "system");
}

#[test]
fn test_project_preference_outranks_global() {
    let env = TestEnv::init();
    env.run(&["config", "set", "default-priority", "must", "--global"]);
    env.run(&["config", "set", "default-priority", "wont"]);

    let json = env.json(&["story", "create", "Later"]);

    assert_eq!(json["priority"], "wont");
}

#[test]
fn test_output_format_preference_makes_human_default() {
    let env = TestEnv::init();
    env.run(&["config", "set", "output-format", "human"]);

    env.pm()
        .args(["epic", "create", "Readable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created epic EPIC-DEM-1: Readable"));
}

#[test]
fn test_config_set_unknown_key() {
    let env = TestEnv::init();

    env.pm()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown preference 'colour'"));
}

#[test]
fn test_config_set_project_requires_init() {
    let env = TestEnv::new();

    env.pm()
        .args(["config", "set", "default-assignee", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not initialized"));
}

#[test]
fn test_config_set_invalid_priority() {
    let env = TestEnv::init();

    env.pm()
        .args(["config", "set", "default-priority", "urgent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid priority"));
}
