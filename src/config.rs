//! Runner configuration for the `sf` CLI.
//!
//! Resolved in priority order:
//! 1. `ORG_USER_SF_CONFIG` environment variable (JSON, same shape as the file)
//! 2. `<config_dir>/org-user-freeze/config.json`
//! 3. built-in defaults targeting `sf apex run` and `sf org display`
//!
//! Commands are either an argv array or a single shell-quoted string. Their
//! arguments may contain the placeholders `{file}` (path of the Apex
//! snippet) and `{target_org}` (username or alias of the client identity).
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const COMMAND_ENV: &str = "ORG_USER_SF_CONFIG";
const CONFIG_DIR_NAME: &str = "org-user-freeze";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandSpec {
    Argv(Vec<String>),
    Line(String),
}

impl CommandSpec {
    fn into_argv(self, label: &str) -> Result<Vec<String>> {
        let argv = match self {
            CommandSpec::Argv(argv) => argv,
            CommandSpec::Line(line) => {
                shell_words::split(&line).with_context(|| format!("parse {label}: {line}"))?
            }
        };
        if argv.is_empty() {
            return Err(anyhow!("{label} must not be empty"));
        }
        Ok(argv)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunnerConfigFile {
    #[serde(default)]
    command: Option<CommandSpec>,
    #[serde(default)]
    org_command: Option<CommandSpec>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// Resolved runner settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// argv executing an anonymous Apex file and printing a JSON envelope.
    pub command: Vec<String>,
    /// argv describing the target org as JSON (used for the org id).
    pub org_command: Vec<String>,
    /// `None` waits for the remote call indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: argv(&[
                "sf",
                "apex",
                "run",
                "--file",
                "{file}",
                "--target-org",
                "{target_org}",
                "--json",
            ]),
            org_command: argv(&[
                "sf",
                "org",
                "display",
                "--target-org",
                "{target_org}",
                "--json",
            ]),
            timeout: None,
        }
    }
}

impl RunnerConfig {
    /// Apply a CLI-provided timeout on top of the loaded config.
    pub fn with_timeout_secs(mut self, timeout_secs: Option<u64>) -> Self {
        if let Some(secs) = timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        self
    }

    fn merge(mut self, file: RunnerConfigFile) -> Result<Self> {
        if let Some(command) = file.command {
            self.command = command.into_argv("command")?;
        }
        if let Some(org_command) = file.org_command {
            self.org_command = org_command.into_argv("org_command")?;
        }
        if let Some(secs) = file.timeout_secs {
            if secs == 0 {
                return Err(anyhow!("timeout_secs must be at least 1"));
            }
            self.timeout = Some(Duration::from_secs(secs));
        }
        Ok(self)
    }
}

/// Load the runner config from the environment, the config file, or defaults.
pub fn load_runner_config() -> Result<RunnerConfig> {
    if let Ok(raw) = env::var(COMMAND_ENV) {
        let file = parse_config(&raw).with_context(|| format!("parse {COMMAND_ENV}"))?;
        return RunnerConfig::default().merge(file);
    }
    match default_config_path() {
        Some(path) if path.is_file() => load_config_file(&path),
        _ => Ok(RunnerConfig::default()),
    }
}

/// Load a config file and merge it over the defaults.
pub fn load_config_file(path: &Path) -> Result<RunnerConfig> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let file = parse_config(&raw).with_context(|| format!("parse config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded runner config");
    RunnerConfig::default().merge(file)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn parse_config(raw: &str) -> Result<RunnerConfigFile> {
    serde_json::from_str(raw).context("parse runner config JSON")
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}
