//! Client configuration: backend base URL and request timeout.
//!
//! Resolution order: config file -> environment -> defaults.
//! The file lives at `<config_dir>/storekeeper/config.toml`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default backend base URL.
const DEFAULT_BASE_URL: &str = "https://api.storefront-platform.example";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Resolved client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from the config file, then apply env overrides
    /// (`STOREKEEPER_API_URL`, `STOREKEEPER_TIMEOUT_SECS`).
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config at {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("invalid config at {}", path.display()))?
            }
            _ => Self::default(),
        };

        if let Ok(url) = std::env::var("STOREKEEPER_API_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(secs) = std::env::var("STOREKEEPER_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.timeout_secs = secs;
            }
        }

        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Build a config with an explicit base URL (used by tests against a
    /// mock server).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            ..Self::default()
        }
    }

    /// Full URL for an API path, e.g. `api_url("/stores/my-stores")`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Path of the config file, if a config directory can be resolved.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "storekeeper")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Data directory for persisted credentials.
    pub fn data_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "storekeeper")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_joins_base_and_path() {
        let config = Config::with_base_url("https://api.example.com/");
        assert_eq!(
            config.api_url("/platform-auth/login"),
            "https://api.example.com/platform-auth/login"
        );
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config: Config = toml::from_str("base_url = \"https://x.example\"").unwrap();
        assert_eq!(config.base_url, "https://x.example");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn timeout_is_seconds() {
        let config = Config {
            timeout_secs: 3,
            ..Default::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }
}
