use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn demo() -> Command {
    Command::cargo_bin("exec-demo").unwrap()
}

#[test]
fn cli_version() {
    demo()
        .args(["-V"])
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_requires_subcommand() {
    demo().assert().failure();
}

#[test]
fn cli_basic() {
    demo()
        .args(["basic", "--workers", "2"])
        .assert()
        .success()
        .stdout(contains("Hello"))
        .stdout(contains("World"));
}

#[test]
fn cli_basic_with_no_workers_runs_nothing() {
    demo()
        .args(["basic", "--workers", "0"])
        .assert()
        .success()
        .stdout(contains("Hello"))
        .stdout(contains("World").not());
}

#[test]
fn cli_wait() {
    demo()
        .args(["wait", "--workers", "4"])
        .assert()
        .success()
        .stdout(contains("Job 0 done"))
        .stdout(contains("Job 1 done"))
        .stdout(contains("All jobs done"));
}

#[test]
fn cli_result() {
    demo()
        .args(["result", "--workers", "1", "--seed", "7"])
        .assert()
        .success()
        .stdout(contains("result = "));
}

#[test]
fn cli_concurrent() {
    demo()
        .args(["concurrent", "--workers", "4", "--jobs", "16"])
        .assert()
        .success()
        .stdout(contains("result = ").count(16));
}

#[test]
fn cli_non_blocking() {
    demo()
        .args(["non-blocking", "--workers", "2", "--jobs", "6"])
        .assert()
        .success()
        .stdout(contains("Some task has finished").count(6));
}

#[test]
fn cli_lifecycle() {
    demo()
        .args(["lifecycle", "--workers", "2", "--capacity", "3"])
        .assert()
        .success()
        .stdout(contains("Queued 3 jobs while stopped"))
        .stdout(contains("Executed 3 jobs after start"));
}

#[test]
fn cli_lifecycle_rejects_zero_workers() {
    demo()
        .args(["lifecycle", "--workers", "0"])
        .assert()
        .failure();
}

#[test]
fn cli_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("executor.json");
    std::fs::write(&path, r#"{ "workers": 2, "backend": "rayon" }"#).unwrap();

    demo()
        .args(["wait", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("All jobs done"));
}

#[test]
fn cli_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("executor.json");
    std::fs::write(&path, r#"{ "queue_capacity": 0 }"#).unwrap();

    demo()
        .args(["basic", "--config"])
        .arg(&path)
        .assert()
        .failure();
}
