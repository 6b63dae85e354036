//! CLI surface tests: flag parsing, exit codes and offline error paths

use assert_cmd::Command;
use predicates::prelude::*;

fn redline() -> Command {
    let mut cmd = Command::cargo_bin("redline").expect("binary builds");
    // Keep the test hermetic with respect to the caller's environment.
    cmd.env_remove("GEMINI_API_KEY")
        .env_remove("GEMINI_MODEL")
        .env_remove("REDLINE_TRACE_LOG")
        .env_remove("REDLINE_MAX_STEPS");
    cmd
}

#[test]
fn test_help_flag() {
    redline()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("tools"));
}

#[test]
fn test_version_flag() {
    redline()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_subcommand_is_usage_error() {
    redline().assert().code(2);
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    redline().arg("negotiate").assert().code(2);
}

#[test]
fn test_tools_lists_registered_specs() {
    redline()
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract_clauses"))
        .stdout(predicate::str::contains("score_risk_heuristics"))
        .stdout(predicate::str::contains("score_risk_rubric"));
}

#[test]
fn test_analyze_missing_file_fails() {
    redline()
        .args(["analyze", "/nonexistent/contract.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("contract file"));
}

#[test]
fn test_analyze_without_api_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let contract = dir.path().join("contract.txt");
    std::fs::write(&contract, "Liability shall be unlimited.").unwrap();

    redline()
        .arg("analyze")
        .arg(&contract)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn test_analyze_rejects_non_object_context() {
    let dir = tempfile::tempdir().unwrap();
    let contract = dir.path().join("contract.txt");
    std::fs::write(&contract, "text").unwrap();

    redline()
        .arg("analyze")
        .arg(&contract)
        .args(["--context", "[1, 2]"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("JSON object"));
}
