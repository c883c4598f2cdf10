//! Shared test infrastructure for integration tests.
//!
//! `FakeOrg` stands in for the Salesforce CLI: a shell script (run through
//! `sh`) that answers the Apex runner and `org display` commands from canned
//! JSON files and keeps a copy of every snippet it was asked to run.

use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const SNIPPET_SEPARATOR: &str = "-----8<-----";

const FAKE_SF: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
if [ "$1" = "org" ]; then
  cat "$dir/org.json"
  exit 0
fi
cat "$2" >> "$dir/calls.log"
echo "-----8<-----" >> "$dir/calls.log"
if grep -q "update userLoginList" "$2"; then
  cat "$dir/mutate.json"
else
  cat "$dir/preview.json"
fi
"#;

/// Scratch directory holding the fake `sf` script and its canned responses.
pub struct FakeOrg {
    dir: TempDir,
}

impl FakeOrg {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create fake org dir");
        let script = dir.path().join("sf");
        fs::write(&script, FAKE_SF).expect("write fake sf");
        fs::write(
            dir.path().join("org.json"),
            json!({"status": 0, "result": {"id": "00DFAKE000000001"}}).to_string(),
        )
        .expect("write org.json");
        let org = Self { dir };
        org.preview_users(&[]);
        org.mutate_users(&[]);
        org
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn preview_users(&self, users: &[(&str, &str)]) {
        self.write_response("preview.json", &apex_success(&debug_log(users)));
    }

    pub fn mutate_users(&self, users: &[(&str, &str)]) {
        self.write_response("mutate.json", &apex_success(&debug_log(users)));
    }

    /// Replace the preview response with a raw envelope.
    pub fn preview_envelope(&self, envelope: serde_json::Value) {
        self.write_response("preview.json", &envelope);
    }

    fn write_response(&self, name: &str, value: &serde_json::Value) {
        fs::write(self.path().join(name), value.to_string()).expect("write response");
    }

    /// Snippets the fake CLI received, in order.
    pub fn snippets(&self) -> Vec<String> {
        let log = fs::read_to_string(self.path().join("calls.log")).unwrap_or_default();
        log.split(SNIPPET_SEPARATOR)
            .map(str::trim)
            .filter(|snippet| !snippet.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.snippets()
            .iter()
            .filter(|snippet| snippet.contains("update userLoginList"))
            .count()
    }

    fn runner_config(&self) -> String {
        let script = self.path().join("sf").display().to_string();
        json!({
            "command": ["sh", script, "apex", "{file}", "{target_org}"],
            "org_command": ["sh", script, "org", "{target_org}"],
        })
        .to_string()
    }

    /// Run the binary with `args`, feeding `stdin` to the confirmation prompt.
    pub fn run(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = Command::new(binary())
            .args(args)
            .env("ORG_USER_SF_CONFIG", self.runner_config())
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn org-user");
        if let Some(mut pipe) = child.stdin.take() {
            // The binary may exit before prompting.
            let _ = pipe.write_all(stdin.as_bytes());
        }
        child.wait_with_output().expect("wait for org-user")
    }
}

pub fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_org-user"))
}

fn apex_success(logs: &str) -> serde_json::Value {
    json!({
        "status": 0,
        "result": {"compiled": true, "success": true, "logs": logs}
    })
}

fn debug_log(users: &[(&str, &str)]) -> String {
    let users: Vec<_> = users
        .iter()
        .map(|(name, profile)| json!({"Name": name, "Profile": {"Name": profile}}))
        .collect();
    format!(
        "Execute Anonymous: system.debug('OUTPUTVALUE='+JSON.serialize(userList)+'END_OUTPUTVALUE');\n\
         USER_DEBUG|[9]|DEBUG|OUTPUTVALUE={}END_OUTPUTVALUE\n",
        serde_json::Value::Array(users)
    )
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
