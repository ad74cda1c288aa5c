//! Integration tests for configuration layering.
//!
//! Tests the full priority chain: hardcoded defaults < XDG config < project config < CLI args

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `drowsy` command isolated from the user's config and model directories.
fn drowsy(home: &TempDir, cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("drowsy").unwrap();
    cmd.current_dir(cwd)
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"));
    cmd
}

fn write_xdg_config(home: &TempDir, content: &str) {
    let dir = home.path().join("config").join("drowsy");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), content).unwrap();
}

/// Runs `drowsy config` with extra arguments and parses the settings table.
fn effective_settings(home: &TempDir, cwd: &Path, args: &[&str]) -> toml::Table {
    let output = drowsy(home, cwd).arg("config").args(args).output().unwrap();
    assert!(output.status.success(), "config command failed: {output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    stdout.parse::<toml::Table>().unwrap()
}

fn get<'a>(table: &'a toml::Table, section: &str, key: &str) -> &'a toml::Value {
    &table[section][key]
}

#[test]
fn test_hardcoded_defaults() {
    let home = tempfile::tempdir().unwrap();
    let settings = effective_settings(&home, home.path(), &[]);

    assert_eq!(get(&settings, "detection", "ear_threshold").as_float(), Some(0.25));
    assert_eq!(get(&settings, "detection", "consec_frames").as_integer(), Some(20));
    assert_eq!(get(&settings, "alarm", "sound").as_str(), Some("alert.wav"));
    assert_eq!(get(&settings, "output", "format").as_str(), Some("jsonl"));
    assert_eq!(get(&settings, "source", "kind").as_str(), Some("camera"));
    assert_eq!(get(&settings, "source", "location").as_integer(), Some(0));
}

#[test]
fn test_no_config_files_reported() {
    let home = tempfile::tempdir().unwrap();
    drowsy(&home, home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("# No config files loaded"));
}

#[test]
fn test_xdg_config_applies() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(
        &home,
        r"
[detection]
consec_frames = 12

[alarm]
mute = true
",
    );

    let settings = effective_settings(&home, home.path(), &[]);
    assert_eq!(get(&settings, "detection", "consec_frames").as_integer(), Some(12));
    assert_eq!(get(&settings, "alarm", "mute").as_bool(), Some(true));
}

#[test]
fn test_project_config_overrides_xdg() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(
        &home,
        r"
[detection]
consec_frames = 12
ear_threshold = 0.125
",
    );

    let project = tempfile::tempdir().unwrap();
    fs::write(
        project.path().join(".drowsy.toml"),
        r"
[detection]
ear_threshold = 0.375

[output]
format = 'json'
",
    )
    .unwrap();

    let settings = effective_settings(&home, project.path(), &[]);
    // Project value wins, XDG value survives where the project is silent
    assert_eq!(get(&settings, "detection", "ear_threshold").as_float(), Some(0.375));
    assert_eq!(get(&settings, "detection", "consec_frames").as_integer(), Some(12));
    assert_eq!(get(&settings, "output", "format").as_str(), Some("json"));

    drowsy(&home, project.path())
        .arg("config")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("config.toml").and(predicate::str::contains(".drowsy.toml")),
        );
}

#[test]
fn test_project_config_found_in_parent_directory() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let nested = project.path().join("src").join("deep");
    fs::create_dir_all(&nested).unwrap();
    fs::write(project.path().join(".drowsy.toml"), "[capture]\ncamera = 3\n").unwrap();

    let settings = effective_settings(&home, &nested, &[]);
    assert_eq!(get(&settings, "source", "location").as_integer(), Some(3));
}

#[test]
fn test_cli_overrides_project_config() {
    let home = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    fs::write(
        project.path().join(".drowsy.toml"),
        r"
[detection]
ear_threshold = 0.375
consec_frames = 5

[display]
enabled = true

[output]
format = 'json'
",
    )
    .unwrap();

    let settings = effective_settings(
        &home,
        project.path(),
        &["--ear-threshold", "0.125", "--format", "jsonl", "--no-display"],
    );
    assert_eq!(get(&settings, "detection", "ear_threshold").as_float(), Some(0.125));
    assert_eq!(get(&settings, "detection", "consec_frames").as_integer(), Some(5));
    assert_eq!(get(&settings, "output", "format").as_str(), Some("jsonl"));
    assert_eq!(get(&settings, "display", "enabled").as_bool(), Some(false));
}

#[test]
fn test_frames_flag_overrides_configured_camera() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(&home, "[capture]\ncamera = 1\n");

    let settings = effective_settings(&home, home.path(), &["--frames", "clip"]);
    assert_eq!(get(&settings, "source", "kind").as_str(), Some("frames"));
    assert_eq!(get(&settings, "source", "location").as_str(), Some("clip"));
}

#[test]
fn test_out_of_range_config_value_warns_and_falls_back() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(&home, "[detection]\nconsec_frames = 0\n");

    let output = drowsy(&home, home.path()).arg("config").output().unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("detection.consec_frames"));

    let settings: toml::Table = String::from_utf8(output.stdout).unwrap().parse().unwrap();
    assert_eq!(get(&settings, "detection", "consec_frames").as_integer(), Some(20));
}

#[test]
fn test_malformed_config_ignored() {
    let home = tempfile::tempdir().unwrap();
    write_xdg_config(&home, "[detection\nthis is not toml");

    let settings = effective_settings(&home, home.path(), &[]);
    assert_eq!(get(&settings, "detection", "consec_frames").as_integer(), Some(20));
}
