use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("salus").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: salus <COMMAND>"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("Options:"))
        .stdout(predicate::str::contains("--help"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_serve_help() {
    let mut cmd = Command::cargo_bin("salus").unwrap();
    cmd.arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: salus serve"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("Port for the web server."));
}

#[test]
fn test_cli_serve_requires_api_key() {
    let mut cmd = Command::cargo_bin("salus").unwrap();
    // Strip the key so startup fails regardless of the host environment. The
    // current directory is a temp dir so no .env file can supply it either.
    let temp = tempfile::tempdir().unwrap();
    cmd.current_dir(temp.path())
        .env_remove("OPENAI_API_KEY")
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}
