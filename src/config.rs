//! Connection and runtime configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::client::AuthMethod;
use crate::state::ExecutionOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {}: {reason}", path.display())]
    InvalidYaml { path: PathBuf, reason: String },

    #[error("Invalid JSON in {}: {reason}", path.display())]
    InvalidJson { path: PathBuf, reason: String },

    #[error("Invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

/// How to reach and authenticate against one management endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL, e.g. `https://cluster1.example.com`.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub auth: AuthMethod,
    #[serde(default = "default_validate_certs")]
    pub validate_certs: bool,
    /// Additional PEM CA certificate to trust.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_validate_certs() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("converge/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            auth: AuthMethod::None,
            validate_certs: default_validate_certs(),
            ca_cert: None,
            timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Defaults for every run; task arguments override them.
    #[serde(default)]
    pub options: ExecutionOptions,
}

impl Config {
    /// `$XDG_CONFIG_HOME/converge/config.yaml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("converge").join("config.yaml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let config: Config = if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidJson {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidYaml {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `path`, or the default path when it exists, or defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Applies `CONVERGE_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("CONVERGE_ENDPOINT") {
            self.connection.endpoint = endpoint;
        }
        if let Some(token) = lookup("CONVERGE_TOKEN") {
            self.connection.auth = AuthMethod::Bearer { token };
        } else if let Some(username) = lookup("CONVERGE_USERNAME") {
            let password = lookup("CONVERGE_PASSWORD").unwrap_or_default();
            self.connection.auth = AuthMethod::Basic { username, password };
        }
        if let Some(validate) = lookup("CONVERGE_VALIDATE_CERTS") {
            self.connection.validate_certs = !matches!(
                validate.to_ascii_lowercase().as_str(),
                "0" | "false" | "no"
            );
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.endpoint.is_empty() {
            return Err(ConfigError::Invalid {
                field: "connection.endpoint".to_string(),
                reason: "an endpoint URL is required".to_string(),
            });
        }
        url::Url::parse(&self.connection.endpoint).map_err(|e| ConfigError::Invalid {
            field: "connection.endpoint".to_string(),
            reason: e.to_string(),
        })?;
        if self.options.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "options.poll_interval_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
