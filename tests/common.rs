#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated HOME + database for one test.
pub struct TestEnv {
    dir: TempDir,
    pub db: String,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("rcluck.sqlite").to_string_lossy().to_string();
        Self { dir, db }
    }

    /// Initialized database with the given members registered.
    pub fn with_members(members: &[(&str, &str)]) -> Self {
        let env = Self::new();
        env.init();
        for (email, name) in members {
            env.add_member(email, name);
        }
        env
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// `rcluck --db <db>` running with HOME inside the temp dir.
    pub fn rcl(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("rcluck");
        cmd.env("HOME", self.dir.path())
            .env("APPDATA", self.dir.path())
            .env_remove("RCLUCK_LOG")
            .args(["--db", &self.db]);
        cmd
    }

    pub fn init(&self) {
        self.rcl().args(["--test", "init"]).assert().success();
    }

    pub fn add_member(&self, email: &str, name: &str) {
        self.rcl()
            .args(["member", "add", email, "--name", name])
            .assert()
            .success();
    }

    /// Run a command and parse its stdout as JSON, whatever the exit code.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.rcl().args(args).output().expect("run rcluck");
        serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
            panic!(
                "stdout of {:?} is not JSON ({e}): {}",
                args,
                String::from_utf8_lossy(&output.stdout)
            )
        })
    }

    /// Log id of a successful clock action.
    pub fn log_id(&self, args: &[&str]) -> i64 {
        let response = self.json(args);
        assert_eq!(response["success"], true, "{args:?} failed: {response}");
        response["log_id"].as_i64().expect("log_id")
    }
}
