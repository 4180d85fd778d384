//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `upkeep` binary and verify exit codes,
//! stdout content, and written artifacts.
//!
//! All tests set `current_dir` to the workspace root so that relative
//! paths to the script fixtures resolve correctly.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `upkeep` binary, rooted at workspace.
fn upkeep() -> Command {
    let mut cmd = cargo_bin_cmd!("upkeep");
    cmd.current_dir(workspace_root());
    cmd
}

fn with_fixtures(cmd: &mut Command) -> &mut Command {
    cmd.args([
        "--templates",
        "fixtures/templates",
        "--subjects",
        "fixtures/subjects",
    ])
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    upkeep()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Upkeep tracking hook generator"));
}

#[test]
fn version_exits_0() {
    upkeep()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("upkeep"));
}

#[test]
fn generate_requires_sources() {
    upkeep().arg("generate").assert().failure();
}

// ──────────────────────────────────────────────
// 2. generate
// ──────────────────────────────────────────────

#[test]
fn generate_writes_every_artifact() {
    let out = TempDir::new().expect("temp dir");
    let mut cmd = upkeep();
    with_fixtures(cmd.arg("generate"))
        .arg("--out")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"))
        .stdout(predicate::str::contains("REPLACE blocks: 2"));

    for name in [
        "epbm_generated_inject.txt",
        "epbm_generated_replace.txt",
        "epbm_generated_ios.txt",
        "epbm_generated_init_effects.txt",
        "epbm_generated_crown_inject.txt",
        "epbm_generated_biases.txt",
        "epbm_ios_l_english.yml",
    ] {
        assert!(out.path().join(name).exists(), "{} missing", name);
    }

    let inject = fs::read(out.path().join("epbm_generated_inject.txt")).unwrap();
    assert!(inject.starts_with(b"\xef\xbb\xbf# Auto-generated"));
    let inject = String::from_utf8(inject).unwrap();
    assert!(inject.contains("INJECT:farm = {"));
    assert!(inject.contains("# market uses maint_basic (trade)"));
    assert!(inject.contains("name = epbm_trade_types target = prev"));
    assert!(!inject.contains("trading_post"));
    assert!(!inject.contains("guild_hall"));

    let replace = fs::read_to_string(out.path().join("epbm_generated_replace.txt")).unwrap();
    assert!(replace.contains("REPLACE:grain_mill = {"));
    assert!(replace.contains("\t\tadd_prosperity = 1 # existing hook }"));
    assert!(replace.contains("REPLACE:shrine = {"));
    assert!(replace.contains("\t\tepbm_shrine_upkeep = {"));
    assert!(replace.contains("\tname = \"Shrine {of} the Hills\""));

    let loc = fs::read(out.path().join("epbm_ios_l_english.yml")).unwrap();
    assert!(loc.starts_with(b"\xef\xbb\xbfl_english:"));
    assert!(!loc[3..].starts_with(b"\xef\xbb\xbf"));

    let crown = fs::read_to_string(out.path().join("epbm_generated_crown_inject.txt")).unwrap();
    assert!(crown.contains("INJECT:castle = {"));
}

#[test]
fn generate_json_lists_files_and_summary() {
    let out = TempDir::new().expect("temp dir");
    let mut cmd = upkeep();
    let output = with_fixtures(cmd.args(["--output", "json", "generate"]))
        .arg("--out")
        .arg(out.path())
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["files"].as_array().map(|f| f.len()), Some(7));
    assert_eq!(value["summary"]["foreign"], 1);
    assert_eq!(value["summary"]["excluded_found"], 1);
}

#[test]
fn generate_is_byte_identical_across_runs() {
    let first = TempDir::new().expect("temp dir");
    let second = TempDir::new().expect("temp dir");
    for dir in [&first, &second] {
        let mut cmd = upkeep();
        with_fixtures(cmd.args(["--quiet", "generate"]))
            .arg("--out")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }
    for entry in fs::read_dir(first.path()).unwrap() {
        let name = entry.unwrap().file_name();
        assert_eq!(
            fs::read(first.path().join(&name)).unwrap(),
            fs::read(second.path().join(&name)).unwrap(),
            "{:?} differs",
            name
        );
    }
}

#[test]
fn generate_with_config_changes_prefix() {
    let dir = TempDir::new().expect("temp dir");
    let config = dir.path().join("policy.toml");
    fs::write(&config, "[naming]\nprefix = \"up\"\n").unwrap();
    let mut cmd = upkeep();
    with_fixtures(cmd.arg("generate"))
        .arg("--config")
        .arg(&config)
        .arg("--out")
        .arg(dir.path())
        .assert()
        .success();
    let inject = fs::read_to_string(dir.path().join("up_generated_inject.txt")).unwrap();
    assert!(inject.contains("up_on_building_built = yes"));
}

#[test]
fn generate_rejects_invalid_config() {
    let dir = TempDir::new().expect("temp dir");
    let config = dir.path().join("policy.toml");
    fs::write(&config, "exclude = 3\n").unwrap();
    let mut cmd = upkeep();
    with_fixtures(cmd.arg("generate"))
        .arg("--config")
        .arg(&config)
        .arg("--out")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid policy"));
}

#[test]
fn generate_reports_missing_source() {
    let out = TempDir::new().expect("temp dir");
    upkeep()
        .args([
            "generate",
            "--templates",
            "fixtures/no_such_dir.txt",
            "--subjects",
            "fixtures/subjects",
        ])
        .arg("--out")
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

// ──────────────────────────────────────────────
// 3. classify
// ──────────────────────────────────────────────

#[test]
fn classify_prints_summary_text() {
    let mut cmd = upkeep();
    with_fixtures(cmd.arg("classify"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Qualified subjects: 5"))
        .stdout(predicate::str::contains("    - shrine (inline)"))
        .stdout(predicate::str::contains("  Trade: 1"));
}

#[test]
fn classify_json_is_parseable() {
    let mut cmd = upkeep();
    let output = with_fixtures(cmd.args(["--output", "json", "classify"]))
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["qualified"], 5);
    assert_eq!(value["additive"], 2);
    assert_eq!(value["patch"], 2);
}

// ──────────────────────────────────────────────
// 4. parse / locate / policy
// ──────────────────────────────────────────────

#[test]
fn parse_dumps_document_json() {
    let output = upkeep()
        .args(["parse", "fixtures/templates/00_upkeep_templates.txt"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["document"]["maint_basic"]["grain"], "2.0");
    assert_eq!(value["anomalies"].as_array().map(|a| a.len()), Some(0));
}

#[test]
fn parse_reports_anomalies() {
    let dir = TempDir::new().expect("temp dir");
    let file = dir.path().join("broken.txt");
    fs::write(&file, "a = { b = 1 } }\nc = 2\n").unwrap();
    let output = upkeep()
        .args(["--output", "json", "parse"])
        .arg(&file)
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["document"]["c"], "2");
    assert_eq!(value["anomalies"][0]["kind"], "unmatched_close_brace");
}

#[test]
fn locate_prints_exact_declaration() {
    upkeep()
        .args(["locate", "fixtures/subjects/farming.txt", "grain_mill"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("grain_mill = {"))
        .stdout(predicate::str::contains("# existing hook }\n\t}\n}"));
}

#[test]
fn locate_missing_name_fails() {
    upkeep()
        .args(["locate", "fixtures/subjects/farming.txt", "windmill"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no top-level declaration of 'windmill'"));
}

#[test]
fn policy_prints_default_toml() {
    upkeep()
        .arg("policy")
        .assert()
        .success()
        .stdout(predicate::str::contains("prefix = \"epbm\""))
        .stdout(predicate::str::contains("references = \"possible_production_methods\""));
}
