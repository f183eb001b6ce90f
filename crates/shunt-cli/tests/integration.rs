use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn shunt(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shunt").unwrap();
    cmd.current_dir(dir.path()).env("SHUNT_ROOT", dir.path());
    cmd
}

fn init_project(dir: &TempDir) {
    shunt(dir).arg("init").assert().success();
}

// ---------------------------------------------------------------------------
// shunt init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_layout() {
    let dir = TempDir::new().unwrap();
    shunt(&dir).arg("init").assert().success();

    assert!(dir.path().join(".shunt").is_dir());
    assert!(dir.path().join(".shunt/config.yaml").exists());
    assert!(dir.path().join(".shunt/artifacts").is_dir());

    let table = std::fs::read_to_string(dir.path().join("releases.csv")).unwrap();
    assert!(table.starts_with("project,row_overall_status,next_row_permission,notes"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    shunt(&dir).arg("init").assert().success();
    shunt(&dir).arg("init").assert().success();
}

#[test]
fn init_scaffolds_task_columns_from_existing_config() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".shunt")).unwrap();
    std::fs::write(
        dir.path().join(".shunt/config.yaml"),
        "table: pipeline.csv\ntasks:\n  - name: build\n  - name: deploy\n",
    )
    .unwrap();

    shunt(&dir).arg("init").assert().success();

    let table = std::fs::read_to_string(dir.path().join("pipeline.csv")).unwrap();
    assert_eq!(
        table.trim_end(),
        "project,row_overall_status,next_row_permission,notes,build,deploy"
    );
}

// ---------------------------------------------------------------------------
// shunt status
// ---------------------------------------------------------------------------

#[test]
fn status_before_init_fails() {
    let dir = TempDir::new().unwrap();
    shunt(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn status_reports_stopped_daemon_and_rows() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".shunt")).unwrap();
    std::fs::write(
        dir.path().join(".shunt/config.yaml"),
        "tasks:\n  - name: build\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("releases.csv"),
        "project,row_overall_status,next_row_permission,notes,build\nalpha,READY,GO,,\n",
    )
    .unwrap();

    let output = shunt(&dir).args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["daemon_running"], false);
    assert_eq!(report["rows"][0]["project"], "alpha");
    assert_eq!(report["rows"][0]["status"], "READY");
    assert_eq!(report["rows"][0]["tasks"][0]["name"], "build");
    assert_eq!(report["rows"][0]["tasks"][0]["status"], "");
}

#[test]
fn status_human_output_lists_projects() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join("releases.csv"),
        "project,row_overall_status,next_row_permission,notes\nalpha,DONE,PAUSE,\n",
    )
    .unwrap();

    shunt(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("daemon: stopped"))
        .stdout(predicate::str::contains("alpha"));
}

// ---------------------------------------------------------------------------
// shunt down / logs
// ---------------------------------------------------------------------------

#[test]
fn down_without_daemon_is_a_clean_noop() {
    let dir = TempDir::new().unwrap();
    shunt(&dir)
        .arg("down")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}

#[test]
fn down_removes_a_stale_pid_file() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".shunt")).unwrap();
    // Far beyond any real PID range, so the liveness probe fails.
    std::fs::write(dir.path().join(".shunt/shunt.pid"), "4000000000\n").unwrap();

    shunt(&dir).arg("down").assert().success();
    assert!(!dir.path().join(".shunt/shunt.pid").exists());
}

#[test]
fn logs_without_a_log_file() {
    let dir = TempDir::new().unwrap();
    shunt(&dir)
        .arg("logs")
        .assert()
        .success()
        .stdout(predicate::str::contains("no log file yet"));
}

#[test]
fn logs_tails_the_log_file() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".shunt")).unwrap();
    let lines: Vec<String> = (1..=100).map(|i| format!("line {i}")).collect();
    std::fs::write(dir.path().join(".shunt/shunt.log"), lines.join("\n")).unwrap();

    shunt(&dir)
        .args(["logs", "-n", "3"])
        .assert()
        .success()
        .stdout(predicate::eq("line 98\nline 99\nline 100\n"));
}

// ---------------------------------------------------------------------------
// shunt run
// ---------------------------------------------------------------------------

#[test]
fn run_advances_a_granted_row_to_done() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".shunt")).unwrap();
    // The executor reports by rewriting its own column in the table.
    let command = concat!(
        "printf '%s\\n' ",
        "'project,row_overall_status,next_row_permission,notes,build,build_completed_at' ",
        "'alpha,RUNNING,GO,,DONE,' > \"$SHUNT_TABLE\"",
    );
    std::fs::write(
        dir.path().join(".shunt/config.yaml"),
        format!("tasks:\n  - name: build\n    command: |-\n      {command}\n"),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("releases.csv"),
        "project,row_overall_status,next_row_permission,notes,build,build_completed_at\nalpha,READY,GO,,,\n",
    )
    .unwrap();

    shunt(&dir).arg("run").assert().success();

    let table = std::fs::read_to_string(dir.path().join("releases.csv")).unwrap();
    let row = table.lines().nth(1).unwrap();
    let fields: Vec<&str> = row.split(',').collect();
    assert_eq!(fields[1], "DONE", "row settles DONE: {table}");
    assert_eq!(fields[2], "PAUSE", "permission resets to PAUSE: {table}");
    assert_eq!(fields[4], "DONE");
    assert!(!fields[5].is_empty(), "completion timestamp stamped: {table}");
}

#[test]
fn run_refuses_to_race_a_live_instance() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    // A live PID (this test process) holds the lock.
    std::fs::write(
        dir.path().join(".shunt/shunt.pid"),
        format!("{}\n", std::process::id()),
    )
    .unwrap();

    shunt(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("daemon is running"));
}

#[test]
fn run_with_no_granted_row_is_a_noop() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join("releases.csv"),
        "project,row_overall_status,next_row_permission,notes\nalpha,READY,PAUSE,\n",
    )
    .unwrap();

    shunt(&dir).arg("run").assert().success();

    let table = std::fs::read_to_string(dir.path().join("releases.csv")).unwrap();
    assert!(table.contains("alpha,READY,PAUSE,"), "table untouched: {table}");
}
