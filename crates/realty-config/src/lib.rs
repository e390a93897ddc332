//! Realty Configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `REALTY_*` environment variables.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REALTY_CONFIG` | `config/realty.toml` | Path to the TOML file (optional) |
//! | `REALTY_API_PORT` | `8000` | HTTP API port |
//! | `REALTY_HEALTH_PORT` | `9090` | Health/readiness port |
//! | `REALTY_STORAGE` | `mongo` | `mongo` or `memory` |
//! | `REALTY_MONGO_URL` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `REALTY_MONGO_DB` | `realty` | MongoDB database name |
//! | `REALTY_REDIS_URL` | `redis://127.0.0.1:6379/1` | Cache backend URL |
//! | `REALTY_JWT_SECRET` | - | HMAC secret for session tokens (required) |
//! | `REALTY_FRONTEND_URL` | `http://localhost:3000` | Base URL used in email links |
//! | `REALTY_MAIL_RELAY_URL` | - | HTTP mail relay; console mailer when unset |
//! | `REALTY_LOG_FORMAT` | `pretty` | `pretty` or `json` |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use realty_common::LogFormat;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config/realty.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_port: u16,
    pub health_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: 8000,
            health_port: 9090,
        }
    }
}

/// Which persistence backend the server wires up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// MongoDB for records, Redis for the cache layer
    #[default]
    Mongo,
    /// Process-local maps; development only
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub mongo_url: String,
    pub mongo_db: String,
    pub redis_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Mongo,
            mongo_url: "mongodb://localhost:27017".to_string(),
            mongo_db: "realty".to_string(),
            redis_url: "redis://127.0.0.1:6379/1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub issuer: String,
    pub access_token_lifetime_secs: u64,
    pub refresh_token_lifetime_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "realty".to_string(),
            access_token_lifetime_secs: 60 * 60,
            refresh_token_lifetime_secs: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    pub cache_ttl_secs: u64,
    pub development_hosts: Vec<String>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            development_hosts: vec![
                "localhost".to_string(),
                "127.0.0.1".to_string(),
                "testserver".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub frontend_url: String,
    pub from_email: String,
    pub relay_url: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            from_email: "noreply@example.com".to_string(),
            relay_url: None,
        }
    }
}

/// Per-provider endpoint overrides, keyed by provider name (`google`, ...)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    pub endpoints: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthSettings,
    pub tenancy: TenancyConfig,
    pub mail: MailConfig,
    pub social: SocialConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parse a TOML document; missing sections fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load defaults, the TOML file (if any) and environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var("REALTY_CONFIG").ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

        let mut config = if path.exists() {
            info!(path = %path.display(), "Loading configuration file");
            Self::from_file(&path)?
        } else if explicit.is_some() {
            return Err(ConfigError::Invalid(format!(
                "REALTY_CONFIG points to a missing file: {}",
                path.display()
            )));
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `REALTY_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("REALTY_API_PORT") {
            self.server.api_port = parse_env("REALTY_API_PORT", &v)?;
        }
        if let Some(v) = lookup("REALTY_HEALTH_PORT") {
            self.server.health_port = parse_env("REALTY_HEALTH_PORT", &v)?;
        }
        if let Some(v) = lookup("REALTY_STORAGE") {
            self.storage.backend = match v.to_ascii_lowercase().as_str() {
                "mongo" => StorageBackend::Mongo,
                "memory" => StorageBackend::Memory,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: "REALTY_STORAGE".to_string(),
                        value: v,
                    })
                }
            };
        }
        if let Some(v) = lookup("REALTY_MONGO_URL") {
            self.storage.mongo_url = v;
        }
        if let Some(v) = lookup("REALTY_MONGO_DB") {
            self.storage.mongo_db = v;
        }
        if let Some(v) = lookup("REALTY_REDIS_URL") {
            self.storage.redis_url = v;
        }
        if let Some(v) = lookup("REALTY_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = lookup("REALTY_FRONTEND_URL") {
            self.mail.frontend_url = v;
        }
        if let Some(v) = lookup("REALTY_MAIL_RELAY_URL") {
            self.mail.relay_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("REALTY_LOG_FORMAT") {
            self.logging.format = v.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "REALTY_LOG_FORMAT".to_string(),
                value: v.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret must be set (REALTY_JWT_SECRET)".to_string(),
            ));
        }
        if self.tenancy.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "tenancy.cache_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.auth.access_token_lifetime_secs >= self.auth.refresh_token_lifetime_secs {
            return Err(ConfigError::Invalid(
                "access tokens must expire before refresh tokens".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}
