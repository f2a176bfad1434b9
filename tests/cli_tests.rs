use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;

mod common;
use common::TestEnv;

#[test]
fn init_creates_the_database_without_touching_config_in_test_mode() {
    let env = TestEnv::new();
    env.rcl()
        .args(["--test", "init"])
        .assert()
        .success()
        .stdout(contains("Database initialized"));

    assert!(fs::metadata(&env.db).is_ok());
    assert!(!env.path(".rcluck/rcluck.conf").exists());
}

#[test]
fn members_are_listed_by_name_and_can_be_deactivated() {
    let env = TestEnv::with_members(&[("z@x.org", "Zed Shaw"), ("a@x.org", "Ada Lovelace")]);

    let list = env.json(&["member", "list", "--json"]);
    assert_eq!(list[0]["email"], "a@x.org");
    assert_eq!(list[0]["first_name"], "Ada");
    assert_eq!(list[1]["email"], "z@x.org");

    env.rcl()
        .args(["member", "deactivate", "z@x.org"])
        .assert()
        .success();
    assert_eq!(env.json(&["member", "list", "--json"]).as_array().unwrap().len(), 1);

    // Inactive members still exist for clock actions.
    let response = env.json(&["lab", "z@x.org", "in"]);
    assert_eq!(response["success"], true);

    env.rcl()
        .args(["member", "deactivate", "ghost@x.org"])
        .assert()
        .failure()
        .stderr(contains("member unknown"));
}

#[test]
fn outbox_delivers_only_lab_logins_once() {
    let env = TestEnv::with_members(&[("a@x.org", "Ada Lovelace")]);
    let feed = env.path("feed.jsonl");
    let feed_s = feed.to_string_lossy().to_string();

    let first = env.log_id(&["lab", "a@x.org", "in"]);
    env.log_id(&["lab", "a@x.org", "out"]);
    let second = env.log_id(&["lab", "a@x.org", "in"]);
    env.log_id(&["lab", "a@x.org", "void"]);

    env.rcl()
        .args(["outbox", "--deliver", "--file", &feed_s])
        .assert()
        .success()
        .stdout(contains("delivered 2"));

    let text = fs::read_to_string(&feed).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["email"], "a@x.org");
    assert_eq!(lines[0]["logging_in"], true);
    assert_eq!(lines[0]["log_id"], first);
    assert_eq!(lines[1]["log_id"], second);

    env.rcl()
        .args(["outbox", "--deliver", "--file", &feed_s])
        .assert()
        .success()
        .stdout(contains("delivered 0"));
    assert_eq!(fs::read_to_string(&feed).unwrap().lines().count(), 2);

    env.rcl()
        .args(["outbox", "--list"])
        .assert()
        .success()
        .stdout(contains("delivered").and(contains("a@x.org")));
}

#[test]
fn outbox_can_deliver_to_stdout() {
    let env = TestEnv::with_members(&[("a@x.org", "Ada Lovelace")]);
    let id = env.log_id(&["lab", "a@x.org", "in"]);

    env.rcl()
        .args(["outbox", "--deliver", "--stdout"])
        .assert()
        .success()
        .stdout(contains(format!(
            r#"{{"email":"a@x.org","logging_in":true,"log_id":{id}}}"#
        )));
}

#[test]
fn export_csv_and_json() {
    let env = TestEnv::with_members(&[("a@x.org", "Ada Lovelace")]);
    env.log_id(&["lab", "a@x.org", "in"]);
    env.log_id(&["lab", "a@x.org", "out"]);
    env.log_id(&["external", "submit", "a@x.org", "--hours", "2", "--message", "poster"]);

    let csv = env.path("logs.csv");
    env.rcl()
        .args(["export", "--format", "csv", "--file", &csv.to_string_lossy()])
        .assert()
        .success()
        .stdout(contains("CSV export completed"));

    let text = fs::read_to_string(&csv).unwrap();
    assert!(text.starts_with("id,email,type,state,time_in,time_out,hours,message,external_ref"));
    assert_eq!(text.lines().count(), 3);

    let json = env.path("pending.json");
    env.rcl()
        .args([
            "export",
            "--format",
            "json",
            "--file",
            &json.to_string_lossy(),
            "--state",
            "pending",
        ])
        .assert()
        .success();

    let rows: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["type"], "external");
    assert_eq!(rows[0]["message"], "poster");

    // Existing file without --force and no answer on stdin: refused.
    env.rcl()
        .args(["export", "--format", "csv", "--file", &csv.to_string_lossy()])
        .write_stdin("n\n")
        .assert()
        .failure()
        .stderr(contains("not overwritten"));
}

#[test]
fn backup_writes_a_zip() {
    let env = TestEnv::with_members(&[("a@x.org", "Ada Lovelace")]);
    let dest = env.path("backup/rcluck.sqlite");

    env.rcl()
        .args(["backup", "--file", &dest.to_string_lossy(), "--compress"])
        .assert()
        .success()
        .stdout(contains("Compressed"));

    assert!(env.path("backup/rcluck.zip").exists());
    env.rcl()
        .args(["log", "--print"])
        .assert()
        .success()
        .stdout(contains("backup"));
}

#[test]
fn db_maintenance_commands() {
    let env = TestEnv::with_members(&[("a@x.org", "Ada Lovelace")]);
    env.log_id(&["lab", "a@x.org", "in"]);

    env.rcl()
        .args(["db", "--migrate", "--check", "--vacuum"])
        .assert()
        .success()
        .stdout(contains("Integrity check passed").and(contains("Vacuum completed")));

    env.rcl()
        .args(["db", "--info"])
        .assert()
        .success()
        .stdout(contains("Hour logs").and(contains("pending")));
}

#[test]
fn config_print_shows_defaults() {
    let env = TestEnv::new();
    env.rcl()
        .args(["config", "--print"])
        .assert()
        .success()
        .stdout(contains("notify_max_attempts: 5").and(contains("notify_backoff_secs: 30")));
}

#[test]
fn pending_table_is_rendered() {
    let env = TestEnv::with_members(&[("a@x.org", "Ada Lovelace")]);
    env.log_id(&["external", "submit", "a@x.org", "--hours", "1.5", "--message", "flyers"]);

    env.rcl()
        .args(["pending", "--external"])
        .assert()
        .success()
        .stdout(contains("01h 30m").and(contains("flyers")));

    env.rcl()
        .args(["pending"])
        .assert()
        .success()
        .stdout(contains("No pending lab sessions"));
}
