//! Configuration loading and management

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use transit_api::google::{DEFAULT_TIMEOUT, DEFAULT_TOKENINFO_URL};
use transit_auth::TokenCacheConfig;

/// Signing secret shipped in the defaults; startup warns when it is kept
pub const DEFAULT_TOKEN_SECRET: &str = "change-me-in-production";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub token_cache: TokenCacheSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
    #[serde(default = "default_token_expiry_hours")]
    pub token_expiry_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            token_expiry_hours: default_token_expiry_hours(),
        }
    }
}

/// Validated-token cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCacheSettings {
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for TokenCacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl TokenCacheSettings {
    pub fn to_cache_config(&self) -> TokenCacheConfig {
        TokenCacheConfig {
            max_entries: self.max_entries,
            ttl: Duration::from_secs(self.ttl_secs),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Google sign-in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_tokeninfo_url")]
    pub tokeninfo_url: String,
    #[serde(default = "default_google_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            tokeninfo_url: default_tokeninfo_url(),
            timeout_secs: default_google_timeout_secs(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_token_secret() -> String {
    DEFAULT_TOKEN_SECRET.to_string()
}

fn default_token_expiry_hours() -> i64 {
    12
}

fn default_max_entries() -> u64 {
    1000
}

fn default_ttl_secs() -> u64 {
    30
}

fn default_db_path() -> String {
    "./data/transit.db".to_string()
}

fn default_tokeninfo_url() -> String {
    DEFAULT_TOKENINFO_URL.to_string()
}

fn default_google_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Reject settings the service cannot run with
    ///
    /// Runs after command-line and environment overrides are applied.
    pub fn validate(&self) -> Result<()> {
        if self.token_cache.max_entries == 0 {
            bail!("token_cache.max_entries must be greater than zero");
        }
        if self.token_cache.ttl_secs == 0 {
            bail!("token_cache.ttl_secs must be greater than zero");
        }
        if self.auth.token_expiry_hours <= 0 {
            bail!("auth.token_expiry_hours must be greater than zero");
        }
        if self.auth.token_secret.is_empty() {
            bail!("auth.token_secret cannot be empty");
        }
        if self.google.timeout_secs == 0 {
            bail!("google.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.auth.token_secret == DEFAULT_TOKEN_SECRET
    }
}
