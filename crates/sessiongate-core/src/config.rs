//! Client configuration management.
//!
//! This module handles loading the client configuration, which
//! names the backend base URL, the authentication endpoint, the credential
//! header, and where the session is persisted.
//!
//! Configuration is stored at `~/.config/sessiongate/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "sessiongate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_LOGIN_PATH: &str = "/auth/login";
const DEFAULT_TOKEN_HEADER: &str = "jwt-token";
const DEFAULT_STORAGE_KEY: &str = "AuthContext";
const DEFAULT_LOGIN_ROUTE: &str = "/auth/login";

/// Deadline applied to every GET unless the caller supplies its own.
const DEFAULT_GET_TIMEOUT_MS: u64 = 5000;

/// Where the session context is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub login_path: String,
    /// Response header carrying the bearer token on login
    pub token_header: String,
    /// Durable key the session context is stored under
    pub storage_key: String,
    /// Entry point the application is sent to when the backend rejects the session
    pub login_route: String,
    pub get_timeout_ms: u64,
    pub storage: StorageBackend,
    /// Overrides the data directory used by the file store
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            get_timeout_ms: DEFAULT_GET_TIMEOUT_MS,
            storage: StorageBackend::default(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Config pointing at `base_url` with every other field defaulted.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `SESSIONGATE_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SESSIONGATE_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(storage) = std::env::var("SESSIONGATE_STORAGE") {
            match storage.parse() {
                Ok(backend) => self.storage = backend,
                Err(e) => warn!(error = %e, "Ignoring SESSIONGATE_STORAGE"),
            }
        }
        if let Ok(ms) = std::env::var("SESSIONGATE_GET_TIMEOUT_MS") {
            match ms.parse() {
                Ok(ms) => self.get_timeout_ms = ms,
                Err(e) => warn!(error = %e, value = %ms, "Ignoring SESSIONGATE_GET_TIMEOUT_MS"),
            }
        }
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.get_timeout_ms)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

/// Join `path` onto `base` with exactly one slash between them.
/// Absolute URLs are passed through untouched.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_backend_contract() {
        let config = Config::default();
        assert_eq!(config.login_path, "/auth/login");
        assert_eq!(config.token_header, "jwt-token");
        assert_eq!(config.storage_key, "AuthContext");
        assert_eq!(config.get_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_join_url_slashes() {
        assert_eq!(join_url("http://host/api/", "/auth/login"), "http://host/api/auth/login");
        assert_eq!(join_url("http://host/api", "users"), "http://host/api/users");
        assert_eq!(join_url("http://host/api/", "https://other/x"), "https://other/x");
    }

    #[test]
    fn test_partial_config_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"base_url":"http://x","storage":"keyring"}"#).unwrap();
        assert_eq!(config.base_url, "http://x");
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.token_header, "jwt-token");
    }

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("File".parse::<StorageBackend>(), Ok(StorageBackend::File));
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
