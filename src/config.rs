use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Ledger storage backend
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub use_json: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String,
    /// Per-step transfer tracing (LEDGER_TRACE target)
    #[serde(default)]
    pub enable_tracing: bool,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreKind,
    /// PostgreSQL connection URL, required when `store` is `postgres`
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_duration_secs")]
    pub access_token_duration_secs: u64,
    /// Deadline for one transfer, from request to commit
    #[serde(default = "default_transfer_timeout_ms")]
    pub transfer_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_file() -> String {
    "bank_ledger.log".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_access_token_duration_secs() -> u64 {
    15 * 60
}

fn default_transfer_timeout_ms() -> u64 {
    5_000
}

impl AppConfig {
    /// Load `config/{env}.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(format!("config/{}.yaml", env))
    }

    /// Read a YAML file, apply environment overrides and validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Override fields from `DATABASE_URL`, `JWT_SECRET` and `HTTP_PORT`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(port) = lookup("HTTP_PORT") {
            match port.parse() {
                Ok(p) => self.gateway.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid HTTP_PORT"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "jwt_secret must be at least 32 characters".to_string(),
            ));
        }
        if self.access_token_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "access_token_duration_secs must be positive".to_string(),
            ));
        }
        if self.transfer_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "transfer_timeout_ms must be positive".to_string(),
            ));
        }
        if self.store == StoreKind::Postgres {
            match &self.database_url {
                Some(url) if !url.is_empty() => {}
                _ => {
                    return Err(ConfigError::Invalid(
                        "database_url is required for the postgres store".to_string(),
                    ));
                }
            }
            if self.db_max_connections == 0 {
                return Err(ConfigError::Invalid(
                    "db_max_connections must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    pub fn access_token_duration(&self) -> Duration {
        Duration::from_secs(self.access_token_duration_secs)
    }
}
