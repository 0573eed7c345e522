#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const PASSWORD: &str = "secret1";

/// A throwaway data directory driven through the `tb` binary.
pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<()> {
        std::fs::write(self.dir.path().join(".taskboard.toml"), contents)
    }

    /// `tb` pinned to this data directory with a clean environment.
    pub fn tb(&self) -> Command {
        let mut cmd = Command::cargo_bin("tb").expect("binary");
        cmd.env_remove("TASKBOARD_BACKEND")
            .env_remove("TASKBOARD_URL")
            .env_remove("TASKBOARD_API_KEY")
            .env_remove("TASKBOARD_PASSWORD")
            .env_remove("RUST_LOG")
            .arg("--data-dir")
            .arg(self.dir.path());
        cmd
    }

    /// Run `tb --json <args>`, require success, return `data`.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .tb()
            .arg("--json")
            .args(args)
            .output()
            .expect("run tb");
        assert!(
            output.status.success(),
            "tb {args:?} failed: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("json envelope");
        assert_eq!(envelope["status"], "success");
        envelope["data"].clone()
    }

    /// Run `tb --json <args>`, require failure, return `(exit code, error)`.
    pub fn json_err(&self, args: &[&str]) -> (i32, Value) {
        let output = self
            .tb()
            .arg("--json")
            .args(args)
            .output()
            .expect("run tb");
        assert!(!output.status.success(), "tb {args:?} unexpectedly succeeded");
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("json envelope");
        assert_eq!(envelope["status"], "error");
        (output.status.code().unwrap_or(-1), envelope["error"].clone())
    }

    pub fn signup(&self, email: &str, name: &str) -> Value {
        self.json(&["signup", email, "--name", name, "--password", PASSWORD])
    }

    pub fn add_task(&self, text: &str) -> i64 {
        self.json(&["task", "add", text])["id"]
            .as_i64()
            .expect("task id")
    }
}
