//! End-to-end tests of the `hrac` binary against a snapshot in a temp dir.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn hrac(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hrac").unwrap();
    cmd.arg("--no-color")
        .arg("--project")
        .arg(project)
        .env_remove("RUST_LOG");
    cmd
}

/// A project with an HR_OFFICER role limited to its own department.
fn hr_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();

    hrac(dir)
        .args([
            "role",
            "add",
            "--id",
            "1",
            "--name",
            "HR_OFFICER",
            "--type",
            "HR_OFFICER",
            "--capability",
            "can_manage_leaves",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved role HR_OFFICER"));

    hrac(dir)
        .args([
            "rule",
            "add",
            "--id",
            "1",
            "--role",
            "1",
            "--entity",
            "leaverequest",
            "--field",
            "employee.current_department",
            "--condition",
            "EQUALS",
            "--value",
            "{user.employee_profile.current_department_id}",
            "--action",
            "CHANGE",
        ])
        .assert()
        .success();

    hrac(dir)
        .args(["grant", "--user", "5", "--role", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("assignment"));

    fs::write(
        dir.join("officer.json"),
        r#"{"id": 5, "username": "officer", "employee_profile": {"current_department_id": 5}}"#,
    )
    .unwrap();
    fs::write(
        dir.join("leave.json"),
        r#"[
            {"id": 1, "employee": {"id": 10, "current_department": 5}},
            {"id": 2, "employee": {"id": 11, "current_department": 7}}
        ]"#,
    )
    .unwrap();

    temp
}

// ============================================================================
// Basics
// ============================================================================

#[test]
fn version_command_succeeds() {
    Command::cargo_bin("hrac")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hrac"));
}

#[test]
fn help_flag_shows_usage() {
    Command::cargo_bin("hrac")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("access control"));
}

#[test]
fn roles_on_empty_project() {
    let temp = TempDir::new().unwrap();
    hrac(temp.path())
        .arg("roles")
        .assert()
        .success()
        .stdout(predicate::str::contains("No roles."));
}

#[test]
fn check_requires_id() {
    let temp = TempDir::new().unwrap();
    hrac(temp.path())
        .args(["check", "--user", "u.json", "--records", "r.json", "--entity", "task"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

// ============================================================================
// Policy round trip
// ============================================================================

#[test]
fn roles_lists_saved_role() {
    let project = hr_project();
    hrac(project.path())
        .arg("roles")
        .assert()
        .success()
        .stdout(predicate::str::contains("HR_OFFICER"))
        .stdout(predicate::str::contains("can_manage_leaves"));

    assert!(project.path().join(".hrac/store.json").exists());
}

#[test]
fn permissions_shows_capabilities() {
    let project = hr_project();
    hrac(project.path())
        .args(["permissions", "--user", "5", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"can_manage_leaves\": true"));

    hrac(project.path())
        .args(["permissions", "--user", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("holds no permissions"));
}

#[test]
fn check_allows_own_department_only() {
    let project = hr_project();
    let dir = project.path();
    let target = [
        "--user",
        "officer.json",
        "--records",
        "leave.json",
        "--entity",
        "leaverequest",
        "--action",
        "CHANGE",
    ];

    hrac(dir)
        .current_dir(dir)
        .arg("check")
        .args(target)
        .args(["--id", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ALLOWED"))
        .stdout(predicate::str::contains("attribute rule 1 matched"));

    hrac(dir)
        .current_dir(dir)
        .arg("check")
        .args(target)
        .args(["--id", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DENIED"));

    hrac(dir)
        .current_dir(dir)
        .arg("check")
        .args(target)
        .args(["--id", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No leaverequest with id 9"));
}

#[test]
fn filter_prints_kept_records_and_sql() {
    let project = hr_project();
    let dir = project.path();

    hrac(dir)
        .current_dir(dir)
        .args([
            "filter",
            "--user",
            "officer.json",
            "--records",
            "leave.json",
            "--entity",
            "leaverequest",
            "--action",
            "CHANGE",
            "--table",
            "hr_leaverequest",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 2 leaverequest records pass CHANGE"))
        .stdout(predicate::str::contains(
            "SELECT * FROM hr_leaverequest WHERE employee.current_department = $1",
        ));
}

#[test]
fn revoke_removes_access() {
    let project = hr_project();
    let dir = project.path();

    hrac(dir)
        .args(["grant", "--user", "5", "--role", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("assignment: 1"));

    hrac(dir)
        .args(["revoke", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("left group"));

    hrac(dir)
        .args(["permissions", "--user", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("holds no permissions"));
}

#[test]
fn unknown_capability_is_rejected() {
    let temp = TempDir::new().unwrap();
    hrac(temp.path())
        .args([
            "role",
            "add",
            "--id",
            "1",
            "--name",
            "PILOT",
            "--type",
            "EMPLOYEE",
            "--capability",
            "can_fly",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown capability: can_fly"));
}

#[test]
fn project_config_overrides_snapshot_location() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("hrac.toml"),
        "[store]\nsnapshot = \"policy/store.json\"\n",
    )
    .unwrap();

    hrac(temp.path())
        .args(["role", "add", "--id", "3", "--name", "HOD", "--type", "hod"])
        .assert()
        .success();

    assert!(temp.path().join("policy/store.json").exists());
}

#[test]
fn config_file_replaces_project_configuration() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    fs::write(dir.join("hrac.toml"), "[store]\nsnapshot = \"ignored/store.json\"\n").unwrap();
    fs::create_dir(dir.join("conf")).unwrap();
    fs::write(
        dir.join("conf/ci.toml"),
        "[store]\nsnapshot = \"state/store.json\"\n",
    )
    .unwrap();

    hrac(dir)
        .arg("--config")
        .arg(dir.join("conf/ci.toml"))
        .args(["role", "add", "--id", "3", "--name", "HOD", "--type", "hod"])
        .assert()
        .success();

    assert!(dir.join("conf/state/store.json").exists());
    assert!(!dir.join("ignored/store.json").exists());
}

#[test]
fn missing_config_file_is_reported() {
    let temp = TempDir::new().unwrap();
    hrac(temp.path())
        .arg("--config")
        .arg(temp.path().join("absent.toml"))
        .arg("roles")
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}
