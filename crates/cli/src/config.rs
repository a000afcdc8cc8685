//! Configuration resolution.
//!
//! Every setting is resolved by the same rule, spelled out key by key in
//! [`Settings::resolve`]: an explicit command-line flag (or its environment
//! variable) wins, then the config file, then the built-in default.
//!
//! The config file is `--config <FILE>` when given, otherwise the first of
//! `/etc/nomaster/config.toml` and `$HOME/.nomaster/config.toml` that exists.
//! Running without any config file is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use pipeline::{
    BranchName, CommentPool, NomasterError, UnexpectedEventPolicy, DEFAULT_PROTECTED_BRANCH,
    DEFAULT_TEMPLATES, DEFAULT_THEMES,
};
use serde::Deserialize;

use crate::observability::LogFormat;

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PATH: &str = "/";
pub const DEFAULT_HEALTHCHECK: &str = "/ping";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// A small GitHub webhook server to shut down pull requests against master.
#[derive(Debug, Default, Parser)]
#[command(name = "nomaster", version, about, long_about = None)]
pub struct CliArgs {
    /// Path to a TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server port
    #[arg(short = 'p', long, env = "NOMASTER_PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Interface to bind
    #[arg(long, env = "NOMASTER_HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// GitHub OAuth token
    #[arg(short = 't', long, env = "NOMASTER_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Webhook signing secret
    #[arg(short = 's', long, env = "NOMASTER_SECRET", hide_env_values = true, value_name = "SECRET")]
    pub secret: Option<String>,

    /// Path to log file
    #[arg(short = 'l', long, value_name = "FILE")]
    pub logfile: Option<PathBuf>,

    /// Webhook application endpoint
    #[arg(short = 'e', long, value_name = "ENDPOINT")]
    pub path: Option<String>,

    /// Healthcheck endpoint
    #[arg(short = 'c', long, value_name = "ENDPOINT")]
    pub healthcheck: Option<String>,

    /// Enable debug mode
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Fixed comment posted on every closed pull request
    #[arg(long, value_name = "TEXT")]
    pub comment: Option<String>,

    /// Branch that pull requests must not target
    #[arg(long, value_name = "BRANCH")]
    pub protected_branch: Option<String>,

    /// GitHub API root
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Timeout for each GitHub API request
    #[arg(long, value_name = "SECONDS")]
    pub request_timeout_secs: Option<u64>,

    /// What to do with deliveries that are not pull_request events: stop or skip
    #[arg(long, value_name = "POLICY")]
    pub on_unexpected_event: Option<UnexpectedEventPolicy>,

    /// Log line format
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    /// OTLP (gRPC) endpoint receiving trace spans
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", value_name = "URL")]
    pub otlp_endpoint: Option<String>,
}

/// Contents of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub token: Option<String>,
    pub secret: Option<String>,
    pub logfile: Option<PathBuf>,
    pub path: Option<String>,
    pub healthcheck: Option<String>,
    pub debug: Option<bool>,
    pub comment: Option<String>,
    pub protected_branch: Option<String>,
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub on_unexpected_event: Option<UnexpectedEventPolicy>,
    pub log_format: Option<LogFormat>,
    pub otlp_endpoint: Option<String>,
    /// Replaces the built-in comment templates.
    pub comment_templates: Option<Vec<String>>,
    /// Replaces the built-in theme words.
    pub comment_themes: Option<Vec<String>>,
}

/// A parsed config file and where it came from.
#[derive(Debug)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: FileConfig,
}

/// Fully resolved, validated settings. Read-only after startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_file: Option<PathBuf>,
    pub port: u16,
    pub host: String,
    pub token: String,
    pub secret: Option<String>,
    pub logfile: Option<PathBuf>,
    pub path: String,
    pub healthcheck: String,
    pub debug: bool,
    pub comment: Option<String>,
    pub protected_branch: BranchName,
    pub api_url: String,
    pub request_timeout: Duration,
    pub on_unexpected_event: UnexpectedEventPolicy,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
    pub comment_pool: CommentPool,
}

/// Config file locations searched when `--config` is not given.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/nomaster/config.toml")];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".nomaster").join("config.toml"));
    }
    paths
}

/// Loads the config file.
///
/// An explicit path must exist. Otherwise `candidates` are tried in order and
/// `None` is returned when none exists. A file that exists but does not parse
/// is always an error.
pub fn load_config_file(
    explicit: Option<&Path>,
    candidates: &[PathBuf],
) -> anyhow::Result<Option<LoadedConfig>> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => match candidates.iter().find(|path| path.is_file()) {
            Some(path) => path.clone(),
            None => return Ok(None),
        },
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: FileConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(Some(LoadedConfig { path, config }))
}

fn invalid(message: impl Into<String>) -> NomasterError {
    NomasterError::ConfigurationError {
        message: message.into(),
    }
}

impl Settings {
    /// Merges flags, the config file, and defaults, then validates the result.
    pub fn resolve(cli: &CliArgs, loaded: Option<LoadedConfig>) -> Result<Self, NomasterError> {
        let (config_file, file) = match loaded {
            Some(loaded) => (Some(loaded.path), loaded.config),
            None => (None, FileConfig::default()),
        };

        // key                 flag / env                        file                       default
        let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);
        let host = cli.host.clone().or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let token = cli.token.clone().or(file.token).unwrap_or_default();
        let secret = cli.secret.clone().or(file.secret);
        let logfile = cli.logfile.clone().or(file.logfile);
        let path = cli.path.clone().or(file.path).unwrap_or_else(|| DEFAULT_PATH.to_string());
        let healthcheck = cli
            .healthcheck
            .clone()
            .or(file.healthcheck)
            .unwrap_or_else(|| DEFAULT_HEALTHCHECK.to_string());
        let debug = cli.debug || file.debug.unwrap_or(false);
        // Blank overrides fall back to the pool.
        let comment = cli
            .comment
            .clone()
            .or(file.comment)
            .filter(|comment| !comment.trim().is_empty());
        let protected_branch = cli
            .protected_branch
            .clone()
            .or(file.protected_branch)
            .unwrap_or_else(|| DEFAULT_PROTECTED_BRANCH.to_string());
        let api_url = cli
            .api_url
            .clone()
            .or(file.api_url)
            .unwrap_or_else(|| github::DEFAULT_API_URL.to_string());
        let request_timeout_secs = cli
            .request_timeout_secs
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let on_unexpected_event = cli
            .on_unexpected_event
            .or(file.on_unexpected_event)
            .unwrap_or_default();
        let log_format = cli.log_format.or(file.log_format).unwrap_or_default();
        let otlp_endpoint = cli.otlp_endpoint.clone().or(file.otlp_endpoint);

        if token.trim().is_empty() {
            return Err(invalid(
                "a GitHub token is required (--token, NOMASTER_TOKEN, or `token` in the config file)",
            ));
        }
        for (key, route) in [("path", &path), ("healthcheck", &healthcheck)] {
            if !route.starts_with('/') {
                return Err(invalid(format!("{key} must start with '/', got '{route}'")));
            }
        }
        if path == healthcheck {
            return Err(invalid(format!(
                "path and healthcheck must differ, both are '{path}'"
            )));
        }
        let protected_branch = BranchName::new(protected_branch.trim())
            .ok_or_else(|| invalid("protected_branch must not be empty"))?;
        if request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be greater than zero"));
        }

        let comment_pool = CommentPool::new(
            file.comment_templates
                .unwrap_or_else(|| DEFAULT_TEMPLATES.iter().map(|t| t.to_string()).collect()),
            file.comment_themes
                .unwrap_or_else(|| DEFAULT_THEMES.iter().map(|t| t.to_string()).collect()),
        )?;

        Ok(Self {
            config_file,
            port,
            host,
            token,
            secret: secret.filter(|secret| !secret.is_empty()),
            logfile,
            path,
            healthcheck,
            debug,
            comment,
            protected_branch,
            api_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            on_unexpected_event,
            log_format,
            otlp_endpoint: otlp_endpoint.filter(|endpoint| !endpoint.is_empty()),
            comment_pool,
        })
    }
}
