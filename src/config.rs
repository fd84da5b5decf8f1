//! Configuration for the relay.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags / environment variables (FEEDRELAY_*)
//! 2. Legacy environment variables (TOKEN, CHANELID, BRIDGEURL)
//! 3. Config file (feedrelay.yaml, or --config)
//! 4. Defaults
//!
//! A `.env` file in the working directory is loaded into the environment
//! before any of this runs. Relative paths in the config file are resolved
//! against the config file's directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::core::IdentityKind;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "feedrelay.yaml";

/// Default state file, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = "sent_posts.txt";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that make the configuration unusable (all fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub relay: RelaySection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedSection {
    pub url: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelaySection {
    pub poll_interval_seconds: Option<u64>,
    /// State file (relative to the config file)
    pub state_path: Option<String>,
    pub identity: Option<IdentityKind>,
    pub max_delivery_attempts: Option<u32>,
}

/// Settings supplied on the command line or through FEEDRELAY_* variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub feed_url: Option<String>,
    pub poll_interval_seconds: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
    pub state_path: Option<PathBuf>,
    pub identity: Option<IdentityKind>,
    pub max_delivery_attempts: Option<u32>,
}

impl ConfigOverrides {
    /// Fill unset credentials from the legacy variable names
    pub fn with_legacy_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut Option<String>, name: &str| {
            if slot.is_none() {
                *slot = lookup(name).filter(|v| !v.trim().is_empty());
            }
        };

        fill(&mut self.bot_token, "TOKEN");
        fill(&mut self.channel_id, "CHANELID");
        fill(&mut self.feed_url, "BRIDGEURL");
        self
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bot_token: String,
    pub channel_id: String,
    pub feed_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub state_path: PathBuf,
    pub identity: IdentityKind,
    pub max_delivery_attempts: Option<u32>,
    /// Path to config file (if one was used)
    pub config_file: Option<PathBuf>,
}

impl RelayConfig {
    /// Token with everything but the bot id hidden, for display
    pub fn redacted_token(&self) -> String {
        match self.bot_token.split_once(':') {
            Some((bot_id, _)) => format!("{}:***", bot_id),
            None => "***".to_string(),
        }
    }
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(field))
}

fn positive_secs(value: u64, field: &'static str) -> Result<Duration, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(value))
}

/// Merge overrides over an optional config file and validate the result
pub fn resolve(
    overrides: ConfigOverrides,
    file: Option<(PathBuf, ConfigFile)>,
) -> Result<RelayConfig, ConfigError> {
    let (config_file, file) = match file {
        Some((path, file)) => (Some(path), file),
        None => (None, ConfigFile::default()),
    };

    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new(""));

    let bot_token = non_empty(
        overrides.bot_token.or(file.telegram.bot_token),
        "telegram bot token",
    )?;
    let channel_id = non_empty(
        overrides.channel_id.or(file.telegram.channel_id),
        "telegram channel id",
    )?;
    let feed_url = non_empty(overrides.feed_url.or(file.feed.url), "feed url")?;

    if !(feed_url.starts_with("http://") || feed_url.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            field: "feed url",
            reason: format!("'{}' is not an http(s) URL", feed_url),
        });
    }

    let poll_interval = positive_secs(
        overrides
            .poll_interval_seconds
            .or(file.relay.poll_interval_seconds)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        "poll interval",
    )?;

    let request_timeout = positive_secs(
        overrides
            .request_timeout_seconds
            .or(file.feed.request_timeout_seconds)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        "request timeout",
    )?;

    let state_path = overrides
        .state_path
        .or_else(|| {
            file.relay
                .state_path
                .as_deref()
                .map(|p| resolve_path(base_dir, p))
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));

    let max_delivery_attempts = overrides
        .max_delivery_attempts
        .or(file.relay.max_delivery_attempts);

    if max_delivery_attempts == Some(0) {
        return Err(ConfigError::Invalid {
            field: "max delivery attempts",
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(RelayConfig {
        bot_token,
        channel_id,
        feed_url,
        poll_interval,
        request_timeout,
        state_path,
        identity: overrides
            .identity
            .or(file.relay.identity)
            .unwrap_or_default(),
        max_delivery_attempts,
        config_file,
    })
}

/// Load configuration from all sources.
///
/// An explicit `config_path` must exist; the default file is optional.
pub fn load(
    overrides: ConfigOverrides,
    config_path: Option<&Path>,
) -> Result<RelayConfig, ConfigError> {
    let file = match config_path {
        Some(path) => Some((path.to_path_buf(), load_config_file(path)?)),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default.exists() {
                let parsed = load_config_file(&default)?;
                Some((default, parsed))
            } else {
                None
            }
        }
    };

    let overrides = overrides.with_legacy_env(|name| std::env::var(name).ok());
    resolve(overrides, file)
}
