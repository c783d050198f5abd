use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{GhStatusError, Result};

pub const DEFAULT_POLL_INTERVAL_SECS: i64 = 300;
pub const DEFAULT_MAX_CONCURRENT: i64 = 32;
pub const DEFAULT_FETCH_TIMEOUT_SECS: i64 = 60;

/// An external command whose arguments may contain a `{user}` or `{repo}`
/// placeholder, substituted before every run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl TryFrom<Vec<String>> for CommandTemplate {
    type Error = GhStatusError;

    fn try_from(mut argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(GhStatusError::Config("command must not be empty".into()));
        }
        let program = argv.remove(0);
        Ok(Self {
            program,
            args: argv,
        })
    }
}

impl CommandTemplate {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with every `{key}` replaced by `value`.
    pub fn args_for(&self, key: &str, value: &str) -> Vec<String> {
        let placeholder = format!("{{{}}}", key);
        self.args
            .iter()
            .map(|arg| arg.replace(&placeholder, value))
            .collect()
    }

    /// Build a tokio command for one target.
    pub fn command(&self, key: &str, value: &str) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.args_for(key, value));
        cmd
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub discover: CommandTemplate,
    pub status: CommandTemplate,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            discover: CommandTemplate::new(
                "gh",
                [
                    "repo",
                    "list",
                    "{user}",
                    "--visibility",
                    "all",
                    "--limit",
                    "500",
                    "--json",
                    "nameWithOwner",
                ],
            ),
            status: CommandTemplate::new(
                "gh",
                [
                    "run",
                    "list",
                    "-L",
                    "1",
                    "-R",
                    "{repo}",
                    "--json",
                    "status,conclusion",
                    "--jq",
                    r#".[0] | "\(.status) \(.conclusion)""#,
                ],
            ),
        }
    }
}

/// Settings as read from the config file. Numbers stay signed so that
/// out-of-range values can be reported instead of failing the parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub poll_interval_secs: i64,
    pub max_concurrent: i64,
    pub fetch_timeout_secs: i64,
    pub commands: CommandsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            commands: CommandsConfig::default(),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("ghstatus").join("config.toml"))
}

impl Config {
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Config::default();
        };

        let Ok(content) = std::fs::read_to_string(&path) else {
            return Config::default();
        };

        match Self::parse(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring {}: {}", path.display(), e);
                Config::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| GhStatusError::Config(e.to_string()))
    }
}

/// Fully validated settings the dashboard runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub poll_interval: Duration,
    pub max_concurrent: usize,
    pub fetch_timeout: Duration,
    pub commands: CommandsConfig,
    /// Human readable notes about values that were replaced by defaults.
    pub warnings: Vec<String>,
}

impl Settings {
    /// Merge command line overrides over the config file and replace every
    /// value below 1 with its default.
    pub fn resolve(
        config: Config,
        poll_override: Option<i64>,
        concurrency_override: Option<i64>,
    ) -> Self {
        let mut warnings = Vec::new();
        let poll = sanitize_positive(
            "poll interval",
            poll_override.unwrap_or(config.poll_interval_secs),
            DEFAULT_POLL_INTERVAL_SECS,
            &mut warnings,
        );
        let max_concurrent = sanitize_positive(
            "max concurrent fetches",
            concurrency_override.unwrap_or(config.max_concurrent),
            DEFAULT_MAX_CONCURRENT,
            &mut warnings,
        );
        let fetch_timeout = sanitize_positive(
            "fetch timeout",
            config.fetch_timeout_secs,
            DEFAULT_FETCH_TIMEOUT_SECS,
            &mut warnings,
        );

        Self {
            poll_interval: Duration::from_secs(poll),
            max_concurrent: max_concurrent as usize,
            fetch_timeout: Duration::from_secs(fetch_timeout),
            commands: config.commands,
            warnings,
        }
    }
}

fn sanitize_positive(label: &str, value: i64, default: i64, warnings: &mut Vec<String>) -> u64 {
    if value < 1 {
        warnings.push(format!(
            "Invalid {} ({}). Value must be at least 1. Using default {}.",
            label, value, default
        ));
        default as u64
    } else {
        value as u64
    }
}
