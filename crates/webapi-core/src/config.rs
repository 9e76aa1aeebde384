//! Application configuration management.
//!
//! This module handles loading and saving the configuration, which includes
//! the token store backend, HTTP client options and the last session target.
//!
//! Configuration is stored at `~/.config/webapi/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{BearerApplier, CredentialApplier, QueryParamApplier, Target};
use crate::store::DEFAULT_ENV_PREFIX;

/// Application name used for config directory paths
pub const APP_NAME: &str = "webapi";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session directory, relative to the working directory
const DEFAULT_SESSION_DIR: &str = ".webapi/sessions";

/// 30s allows for slow API responses while failing fast enough for a CLI.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Auto,
    File,
    Env,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub last_host: Option<String>,
    pub last_port: Option<u16>,
    pub last_username: Option<String>,
    pub store_backend: StoreBackend,
    pub session_dir: Option<PathBuf>,
    pub env_prefix: Option<String>,
    pub scheme: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub accept_invalid_certs: bool,
    pub refresh_on_expiry: bool,
    /// Send the token as this query parameter instead of a bearer header
    pub token_param: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where file-backed sessions live. A leading `~` is expanded.
    pub fn session_dir(&self) -> PathBuf {
        match self.session_dir {
            Some(ref dir) => expand_home(dir),
            None => PathBuf::from(DEFAULT_SESSION_DIR),
        }
    }

    pub fn env_prefix(&self) -> String {
        self.env_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_ENV_PREFIX.to_string())
    }

    /// Target of the most recent session, if one was recorded
    pub fn last_target(&self) -> Option<Target> {
        let host = self.last_host.as_ref()?;
        Some(Target::new(
            host.clone(),
            self.last_port.unwrap_or(crate::auth::DEFAULT_PORT),
        ))
    }

    pub fn remember_session(&mut self, target: &Target, username: &str) {
        self.last_host = Some(target.host.clone());
        self.last_port = Some(target.port);
        self.last_username = Some(username.to_string());
    }

    /// How the token is attached to outgoing requests
    pub fn credential_applier(&self) -> Box<dyn CredentialApplier> {
        match self.token_param {
            Some(ref name) => Box::new(QueryParamApplier::new(name.clone())),
            None => Box::new(BearerApplier),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            scheme: self.scheme.clone().unwrap_or(defaults.scheme),
            connect_timeout: self
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

/// Options passed straight through to the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub scheme: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            accept_invalid_certs: false,
        }
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load_from(&dir.path().join("config.json")).expect("load");
        assert_eq!(config.store_backend, StoreBackend::Auto);
        assert_eq!(config.session_dir(), PathBuf::from(".webapi/sessions"));
        assert_eq!(config.env_prefix(), "WEBAPI_");
        assert!(config.last_target().is_none());
        assert_eq!(config.client_options(), ClientOptions::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.remember_session(&Target::new("h", 8443), "u");
        config.store_backend = StoreBackend::File;
        config.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.last_target(), Some(Target::new("h", 8443)));
        assert_eq!(loaded.last_username.as_deref(), Some("u"));
        assert_eq!(loaded.store_backend, StoreBackend::File);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"store_backend": "env", "request_timeout_secs": 5, "scheme": "http"}"#,
        )
        .expect("write");

        let config = Config::load_from(&path).expect("load");
        assert_eq!(config.store_backend, StoreBackend::Env);
        let options = config.client_options();
        assert_eq!(options.request_timeout, Duration::from_secs(5));
        assert_eq!(options.connect_timeout, Duration::from_secs(10));
        assert_eq!(options.scheme, "http");
    }

    #[test]
    fn test_credential_applier_selection() {
        let mut url = reqwest::Url::parse("https://h/a").expect("url");
        let mut headers = reqwest::header::HeaderMap::new();
        let token = crate::auth::Token::new("T1");

        Config::default()
            .credential_applier()
            .apply(&token, &mut url, &mut headers)
            .expect("apply");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer T1");

        let config = Config {
            token_param: Some("access_token".to_string()),
            ..Config::default()
        };
        config
            .credential_applier()
            .apply(&token, &mut url, &mut headers)
            .expect("apply");
        assert_eq!(url.query(), Some("access_token=T1"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/.webapi")), home.join(".webapi"));
        }
    }
}
