//! Integration tests for Strata CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const FAMILY: &str = r#"
parent(a, b).
parent(b, c).
ancestor(X, Y) :- parent(X, Y).
ancestor(X, Y) :- ancestor(X, Z), parent(Z, Y).
ancestor(a, Y)?
"#;

fn program(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", source).unwrap();
    file
}

/// Test the version command
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("strata"));
}

/// Test the help command
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Datalog"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("shell"));
}

/// Test run prints the answers of each query
#[test]
fn test_run_prints_answers() {
    let file = program(FAMILY);
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ancestor(a, Y)?"))
        .stdout(predicate::str::contains("{Y: b}"))
        .stdout(predicate::str::contains("{Y: c}"));
}

/// Test ground queries print Yes. and No.
#[test]
fn test_run_ground_queries() {
    let file = program("a(1). b(1).\na(1)?\nb(2)?\n");
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Yes."))
        .stdout(predicate::str::contains("No."));
}

/// Test JSON output
#[test]
fn test_run_json_format() {
    let file = program("a(1). a(2). b(1).\na(X), not b(X)?\n");
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("--format")
        .arg("json")
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""answers":[{"X":"2"}]"#));
}

/// Test several files share one engine
#[test]
fn test_run_multiple_files() {
    let facts = program("edge(a, b). edge(b, c).\n");
    let rules = program("path(X, Y) :- edge(X, Y).\npath(X, Z) :- path(X, Y), edge(Y, Z).\npath(a, c)?\n");
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("run")
        .arg(facts.path())
        .arg(rules.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Yes."));
}

/// Test run with a missing file
#[test]
fn test_run_missing_file() {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("run")
        .arg("/nonexistent/program.dl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

/// Test run reports the failing line
#[test]
fn test_run_reports_error_line() {
    let file = program("a(1).\nb(X).\n");
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("run")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

/// Test run without files
#[test]
fn test_run_requires_files() {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

/// Test check with a valid program
#[test]
fn test_check_valid_program() {
    let file = program(FAMILY);
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("check")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Program is valid"))
        .stdout(predicate::str::contains("Facts: 2"))
        .stdout(predicate::str::contains("Rules: 2"));
}

/// Test check rejects negative recursion
#[test]
fn test_check_unstratifiable_program() {
    let file = program("p(X) :- q(X), not r(X).\nr(X) :- q(X), not p(X).\n");
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("check")
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Program is invalid"))
        .stdout(predicate::str::contains("negative recursion"));
}

/// Test check rejects unsafe rules
#[test]
fn test_check_unsafe_rule() {
    let file = program("p(X, Y) :- q(X).\n");
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("check")
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Validation error"));
}

/// Test check with a syntax error
#[test]
fn test_check_syntax_error() {
    let file = program("a(1).\nb(2\n");
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("check")
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Parse error"));
}

/// Test the shell reads statements from stdin
#[test]
fn test_shell_session() {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("shell")
        .write_stdin("a(1).\na(2).\nb(1).\na(X),\n  not b(X)?\ndump\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("{X: 2}"))
        .stdout(predicate::str::contains("% Facts:"))
        .stdout(predicate::str::contains("b(1)."));
}

/// Test the shell keeps going after an error
#[test]
fn test_shell_recovers_from_errors() {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("shell")
        .write_stdin("b(X).\nc(1).\nc(1)?\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation error"))
        .stdout(predicate::str::contains("Yes."));
}

/// Test a percent sign inside a quoted string does not swallow the terminator
#[test]
fn test_shell_percent_in_string() {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("shell")
        .write_stdin("says(\"50%\").\nsays(X)?\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("50%"))
        .stdout(predicate::str::contains("Incomplete statement").not());
}

/// Test the shell loads files and supports delete
#[test]
fn test_shell_load_and_delete() {
    let file = program(FAMILY);
    let input = format!(
        "load {}\nparent(b, X)~\nancestor(a, c)?\nvalidate\nhelp\n",
        file.path().display()
    );
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("shell")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded"))
        .stdout(predicate::str::contains("No."))
        .stdout(predicate::str::contains("OK"))
        .stdout(predicate::str::contains("load <file>"));
}

/// Test loading an engine configuration
#[test]
fn test_config_strict_mode() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, r#"comparison_mode = "strict""#).unwrap();
    let file = program("v(apple).\nv(X), X > 1?\n");

    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("--config")
        .arg(config.path())
        .arg("run")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Evaluation error"));

    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No."));
}

/// Test an invalid configuration file
#[test]
fn test_invalid_config() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "unknown_option = true").unwrap();
    let file = program("a(1).\n");

    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("--config")
        .arg(config.path())
        .arg("run")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
