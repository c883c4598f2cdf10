//! Anonymous Apex execution through the `sf` CLI.
//!
//! The org only hands back a free-text debug log, so this module stops at
//! transport: it writes the snippet to a temp file, runs the configured
//! command under the caller's identity, classifies the JSON envelope the CLI
//! prints, and returns the log untouched. Reading results out of the log is
//! `extract`'s job.
//!
//! # Envelope
//!
//! `sf apex run --json` prints one of:
//!
//! ```text
//! {"status":0,"result":{"compiled":true,"success":true,"logs":"..."}}
//! {"status":1,"result":{"compiled":false,"compileProblem":"...","line":3,"column":7}}
//! {"status":1,"name":"NoOrgFound","message":"No authorization information found"}
//! ```
//!
//! A missing `result` means the org was never reached (`RemoteUnavailable`);
//! a `result` reporting a compile or runtime fault is `RemoteExecutionFailed`.
use crate::config::RunnerConfig;
use crate::error::OrgUserError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT_POLL: Duration = Duration::from_millis(50);

/// Authenticated org the workflow acts on, threaded through every remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    target_org: String,
}

impl ClientIdentity {
    pub fn new(target_org: impl Into<String>) -> Self {
        Self {
            target_org: target_org.into(),
        }
    }

    /// Username or alias passed to `--target-org`.
    pub fn target_org(&self) -> &str {
        &self.target_org
    }
}

/// One snippet to execute remotely.
#[derive(Debug, Clone)]
pub struct RemoteExecutionRequest<'a> {
    pub snippet: String,
    /// Diagnostic tag, also used as the snippet file name.
    pub label: &'a str,
    pub identity: &'a ClientIdentity,
    pub debug: bool,
}

/// Raw debug log produced by a successful remote execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteExecutionResult {
    pub raw_log: String,
}

/// Seam between the workflow and the remote org.
pub trait ApexExecutor {
    /// Run a snippet and return its log, or fail with `RemoteUnavailable` /
    /// `RemoteExecutionFailed`.
    fn execute(&self, request: &RemoteExecutionRequest<'_>) -> Result<RemoteExecutionResult>;

    /// Resolve the org id for an identity.
    fn org_id(&self, identity: &ClientIdentity) -> Result<String>;
}

/// Executor backed by the Salesforce CLI.
#[derive(Debug, Clone)]
pub struct SfCliExecutor {
    config: RunnerConfig,
}

impl SfCliExecutor {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }
}

impl ApexExecutor for SfCliExecutor {
    fn execute(&self, request: &RemoteExecutionRequest<'_>) -> Result<RemoteExecutionResult> {
        if request.debug {
            tracing::info!(label = request.label, snippet = %request.snippet, "apex snippet");
        }

        let scratch = tempfile::tempdir().context("create apex scratch dir")?;
        let file = scratch.path().join(request.label);
        fs::write(&file, request.snippet.as_bytes())
            .with_context(|| format!("write apex snippet {}", file.display()))?;

        let argv = substitute(&self.config.command, Some(&file), request.identity);
        let start = Instant::now();
        let output = run_command(&argv, self.config.timeout)?;
        let elapsed_ms = start.elapsed().as_millis();

        tracing::info!(
            elapsed_ms,
            label = request.label,
            snippet_bytes = request.snippet.len(),
            response_bytes = output.stdout.len(),
            "apex execute complete"
        );

        let raw_log = classify_apex_output(
            &output.stdout,
            output.status.success(),
            &String::from_utf8_lossy(&output.stderr),
        )?;
        if request.debug {
            tracing::info!(label = request.label, log = %raw_log, "apex log");
        }
        Ok(RemoteExecutionResult { raw_log })
    }

    fn org_id(&self, identity: &ClientIdentity) -> Result<String> {
        let argv = substitute(&self.config.org_command, None, identity);
        let output = run_command(&argv, self.config.timeout)?;
        let org_id = classify_org_output(
            &output.stdout,
            output.status.success(),
            &String::from_utf8_lossy(&output.stderr),
        )?;
        tracing::debug!(target_org = identity.target_org(), %org_id, "resolved org id");
        Ok(org_id)
    }
}

#[derive(Debug, Deserialize)]
struct CliEnvelope<T> {
    #[serde(default)]
    status: i64,
    result: Option<T>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> CliEnvelope<T> {
    fn failure_message(&self) -> String {
        match (self.name.as_deref(), self.message.as_deref()) {
            (Some(name), Some(message)) => format!("{name}: {message}"),
            (None, Some(message)) => message.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => format!("sf exited with status {}", self.status),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApexRunResult {
    #[serde(default)]
    compiled: Option<bool>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    compile_problem: Option<String>,
    #[serde(default)]
    exception_message: Option<String>,
    #[serde(default)]
    exception_stack_trace: Option<String>,
    #[serde(default)]
    line: Option<i64>,
    #[serde(default)]
    column: Option<i64>,
    #[serde(default)]
    logs: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrgDisplayResult {
    id: String,
}

fn parse_envelope<T: DeserializeOwned>(
    stdout: &[u8],
    success: bool,
    stderr: &str,
) -> Result<CliEnvelope<T>, OrgUserError> {
    serde_json::from_slice(stdout).map_err(|err| {
        let detail = if success {
            format!("unreadable sf output: {err}")
        } else {
            format!("sf failed: {}", stderr.trim())
        };
        OrgUserError::RemoteUnavailable(detail)
    })
}

/// Turn the output of the Apex runner into the raw log or a named failure.
fn classify_apex_output(
    stdout: &[u8],
    success: bool,
    stderr: &str,
) -> Result<String, OrgUserError> {
    let envelope: CliEnvelope<ApexRunResult> = parse_envelope(stdout, success, stderr)?;
    let Some(result) = envelope.result.as_ref() else {
        return Err(OrgUserError::RemoteUnavailable(envelope.failure_message()));
    };

    if result.compiled == Some(false) {
        return Err(OrgUserError::RemoteExecutionFailed(format!(
            "compile error at line {}, column {}: {}",
            result.line.unwrap_or(-1),
            result.column.unwrap_or(-1),
            result
                .compile_problem
                .as_deref()
                .unwrap_or("unknown problem")
        )));
    }
    if result.success == Some(false) {
        let mut detail = result
            .exception_message
            .clone()
            .unwrap_or_else(|| "unknown exception".to_string());
        if let Some(trace) = result.exception_stack_trace.as_deref() {
            if !trace.is_empty() {
                detail.push_str(&format!(" ({trace})"));
            }
        }
        return Err(OrgUserError::RemoteExecutionFailed(detail));
    }

    Ok(result.logs.clone().unwrap_or_default())
}

fn classify_org_output(stdout: &[u8], success: bool, stderr: &str) -> Result<String, OrgUserError> {
    let envelope: CliEnvelope<OrgDisplayResult> = parse_envelope(stdout, success, stderr)?;
    match envelope.result {
        Some(result) => Ok(result.id),
        None => Err(OrgUserError::RemoteUnavailable(envelope.failure_message())),
    }
}

fn substitute(template: &[String], file: Option<&Path>, identity: &ClientIdentity) -> Vec<String> {
    let file = file
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    template
        .iter()
        .map(|arg| {
            arg.replace("{file}", &file)
                .replace("{target_org}", identity.target_org())
        })
        .collect()
}

/// Spawn `argv`, optionally killing it once `timeout` elapses.
fn run_command(argv: &[String], timeout: Option<Duration>) -> Result<Output, OrgUserError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| OrgUserError::RemoteUnavailable("sf command is empty".to_string()))?;
    let program = which::which(program).map_err(|err| {
        OrgUserError::RemoteUnavailable(format!("cannot find {program}: {err}"))
    })?;

    let mut child = Command::new(&program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            OrgUserError::RemoteUnavailable(format!("spawn {}: {err}", program.display()))
        })?;

    let Some(limit) = timeout else {
        return child
            .wait_with_output()
            .map_err(|err| OrgUserError::RemoteUnavailable(format!("wait for sf: {err}")));
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || drain(stdout));
    let stderr_reader = thread::spawn(move || drain(stderr));

    let deadline = Instant::now() + limit;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(OrgUserError::RemoteUnavailable(format!(
                    "sf did not finish within {}s",
                    limit.as_secs_f64()
                )));
            }
            Ok(None) => thread::sleep(TIMEOUT_POLL),
            Err(err) => {
                return Err(OrgUserError::RemoteUnavailable(format!("wait for sf: {err}")));
            }
        }
    };

    Ok(Output {
        status,
        stdout: stdout_reader.join().unwrap_or_default(),
        stderr: stderr_reader.join().unwrap_or_default(),
    })
}

fn drain(pipe: Option<impl Read>) -> Vec<u8> {
    let mut bytes = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut bytes);
    }
    bytes
}
