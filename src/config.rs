//! Configuration loading and management
//!
//! Handles parsing of `.taskboard.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the config file inside the data directory
pub const CONFIG_FILENAME: &str = ".taskboard.toml";

const ENV_REMOTE_URL: &str = "TASKBOARD_URL";
const ENV_REMOTE_API_KEY: &str = "TASKBOARD_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which persistence backend to use
    #[serde(default)]
    pub backend: BackendKind,

    /// Hosted backend connection
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Board presentation
    #[serde(default)]
    pub board: BoardConfig,

    /// Session behaviour
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            remote: RemoteConfig::default(),
            board: BoardConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl BackendKind {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            other => Err(Error::InvalidArgument(format!(
                "unknown backend '{other}' (expected local|remote)"
            ))),
        }
    }
}

/// Hosted backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the service, e.g. `https://xyz.example.co`
    #[serde(default)]
    pub url: Option<String>,

    /// Public (anon) API key sent with every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_incomplete_title")]
    pub incomplete_title: String,

    #[serde(default = "default_complete_title")]
    pub complete_title: String,
}

fn default_incomplete_title() -> String {
    "Todo".to_string()
}

fn default_complete_title() -> String {
    "Done".to_string()
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            incomplete_title: default_incomplete_title(),
            complete_title: default_complete_title(),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Email of the local user to activate when none is persisted
    #[serde(default)]
    pub default_user: Option<String>,

    /// Allow switching between local users without a password
    #[serde(default = "default_true")]
    pub allow_switch: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_user: None,
            allow_switch: true,
        }
    }
}

impl Config {
    /// Load configuration from a `.taskboard.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the data directory, or return defaults
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = data_dir.join(CONFIG_FILENAME);
        let config = if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        config.with_env_overrides()
    }

    /// Apply `TASKBOARD_URL` / `TASKBOARD_API_KEY` on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_non_empty(ENV_REMOTE_URL) {
            self.remote.url = Some(url);
        }
        if let Some(key) = env_non_empty(ENV_REMOTE_API_KEY) {
            self.remote.api_key = Some(key);
        }
        self
    }

    /// Check that the selected backend has what it needs.
    pub fn validate(&self) -> Result<()> {
        if self.remote.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "remote.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.board.incomplete_title.trim().is_empty()
            || self.board.complete_title.trim().is_empty()
        {
            return Err(Error::InvalidConfig(
                "board column titles cannot be empty".to_string(),
            ));
        }
        if let Some(user) = &self.session.default_user {
            if user.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "session.default_user cannot be empty".to_string(),
                ));
            }
        }
        if self.backend == BackendKind::Remote {
            self.remote.endpoint()?;
        }
        Ok(())
    }
}

impl RemoteConfig {
    /// Base URL and API key, both required for the hosted backend.
    pub fn endpoint(&self) -> Result<(String, String)> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::InvalidConfig("remote.url is required".to_string()))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "remote.url must be an http(s) URL: {url}"
            )));
        }
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::InvalidConfig("remote.api_key is required".to_string()))?;
        Ok((url.trim_end_matches('/').to_string(), key.to_string()))
    }
}

/// Resolve the data directory: explicit path, then the platform data dir,
/// then `./.taskboard`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    directories::ProjectDirs::from("dev", "taskboard", "taskboard")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".taskboard"))
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_backend_requires_url_and_key() {
        let mut config = Config {
            backend: BackendKind::Remote,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.remote.url = Some("https://db.example.co/".to_string());
        config.remote.api_key = Some("anon".to_string());
        config.validate().unwrap();
        let (url, key) = config.remote.endpoint().unwrap();
        assert_eq!(url, "https://db.example.co");
        assert_eq!(key, "anon");
    }

    #[test]
    fn rejects_non_http_url() {
        let remote = RemoteConfig {
            url: Some("ftp://db".to_string()),
            api_key: Some("k".to_string()),
            timeout_secs: 5,
        };
        assert!(remote.endpoint().is_err());
    }

    #[test]
    fn explicit_data_dir_wins() {
        let path = PathBuf::from("/tmp/tb-data");
        assert_eq!(resolve_data_dir(Some(&path)), path);
    }
}
