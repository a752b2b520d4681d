use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000/";
pub const DEFAULT_WORKER_SCRIPT: &str = "/sw.js";
pub const DEFAULT_WORKER_SCOPE: &str = "/";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_COUNTDOWN_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_ACTIVATION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_ACTIVATION_POLL: Duration = Duration::from_millis(100);
pub const DEFAULT_REGISTRATION_ATTEMPTS: u32 = 3;
pub const DEFAULT_REGISTRATION_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {field} '{value}': {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: Url,
    /// URL-safe base64 VAPID public key of the timer server.
    pub vapid_public_key: Option<String>,
    pub worker: WorkerConfig,
    pub poll_interval: Duration,
    pub countdown_tick: Duration,
    pub request_timeout: Duration,
    pub state_dir: PathBuf,
    pub relay_endpoint: Option<Url>,
    pub notifications_allowed: bool,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub script: String,
    pub scope: String,
    pub activation_timeout: Duration,
    pub activation_poll: Duration,
    pub registration_attempts: u32,
    pub registration_backoff: Duration,
    pub settle_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            script: DEFAULT_WORKER_SCRIPT.to_string(),
            scope: DEFAULT_WORKER_SCOPE.to_string(),
            activation_timeout: DEFAULT_ACTIVATION_TIMEOUT,
            activation_poll: DEFAULT_ACTIVATION_POLL,
            registration_attempts: DEFAULT_REGISTRATION_ATTEMPTS,
            registration_backoff: DEFAULT_REGISTRATION_BACKOFF,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Optional TOML config file. Every field may be overridden from the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server_url: Option<String>,
    pub vapid_public_key: Option<String>,
    pub relay_endpoint: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub notifications_allowed: Option<bool>,
    pub poll_interval: Option<String>,
    pub request_timeout: Option<String>,
    pub worker: Option<FileWorkerConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileWorkerConfig {
    pub script: Option<String>,
    pub scope: Option<String>,
    pub activation_timeout: Option<String>,
    pub registration_attempts: Option<u32>,
    pub registration_backoff: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Parses the server base URL, forcing a trailing slash so relative endpoint
/// paths resolve beneath it.
pub fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = parse_url("server url", raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let value = raw.trim();
    let url = Url::parse(value).map_err(|err| ConfigError::Invalid {
        field,
        value: value.to_string(),
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::Invalid {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

/// Parses `<number>[ms|s|m|h]`; a bare number is seconds.
pub fn parse_duration(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let value = raw.trim();
    let invalid = |reason: &str| ConfigError::Invalid {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    if value.is_empty() {
        return Err(invalid("cannot be empty"));
    }

    let split = value
        .find(|ch: char| ch.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount: u64 = amount
        .trim()
        .parse()
        .map_err(|_| invalid("expected <number>[ms|s|m|h]"))?;
    if amount == 0 {
        return Err(invalid("must be greater than 0"));
    }

    match unit.to_ascii_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(amount)),
        "" | "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(amount.saturating_mul(3600))),
        _ => Err(invalid("expected <number>[ms|s|m|h]")),
    }
}

#[cfg(test)]
impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: Url::parse(DEFAULT_SERVER_URL).expect("default server url"),
            vapid_public_key: Some(crate::testing::SERVER_KEY.to_string()),
            worker: WorkerConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            countdown_tick: DEFAULT_COUNTDOWN_TICK,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            state_dir: std::env::temp_dir(),
            relay_endpoint: None,
            notifications_allowed: true,
        }
    }
}
