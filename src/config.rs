//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::RestStoreConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_message_page_size")]
    pub message_page_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_message_page_size() -> usize {
    50
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            message_page_size: default_message_page_size(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which store implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Hosted PostgREST-style backend
    Rest,
    /// In-process tables, lost on restart
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rest" => Ok(StoreBackend::Rest),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

/// Remote table store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    #[serde(default = "default_store_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Rest
}

fn default_store_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_request_timeout() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_store_url(),
            api_key: None,
            request_timeout_ms: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl StoreConfig {
    pub fn rest_config(&self) -> RestStoreConfig {
        RestStoreConfig {
            base_url: self.url.clone(),
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
            request_timeout_ms: self.request_timeout_ms,
            max_retries: self.max_retries,
        }
    }
}

/// Unread-announcement polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Stop polling for a user after this long without a request
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Most users polled at once
    #[serde(default = "default_max_tracked_users")]
    pub max_tracked_users: usize,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_max_tracked_users() -> usize {
    1000
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            idle_timeout_secs: default_idle_timeout(),
            max_tracked_users: default_max_tracked_users(),
        }
    }
}

impl NotificationsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development
    Pretty,
    /// One JSON object per line, for production
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("hackboard").join("config.toml")),
            Some(PathBuf::from("/etc/hackboard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(host) = var("HACKBOARD_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("HACKBOARD_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Store overrides
        if let Some(backend) = var("HACKBOARD_STORE_BACKEND") {
            match backend.parse() {
                Ok(b) => self.store.backend = b,
                Err(e) => tracing::warn!("Ignoring HACKBOARD_STORE_BACKEND: {}", e),
            }
        }
        if let Some(url) = var("HACKBOARD_STORE_URL") {
            self.store.url = url;
        }
        if let Some(key) = var("HACKBOARD_STORE_API_KEY") {
            self.store.api_key = Some(key);
        }

        // Notification overrides
        if let Some(secs) = var("HACKBOARD_POLL_INTERVAL_SECS") {
            if let Ok(s) = secs.parse() {
                self.notifications.poll_interval_secs = s;
            }
        }
        if let Some(secs) = var("HACKBOARD_IDLE_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse() {
                self.notifications.idle_timeout_secs = s;
            }
        }
        if let Some(max) = var("HACKBOARD_MAX_TRACKED_USERS") {
            if let Ok(m) = max.parse() {
                self.notifications.max_tracked_users = m;
            }
        }

        // Logging overrides
        if let Some(level) = var("HACKBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("HACKBOARD_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.logging.format = f,
                Err(e) => tracing::warn!("Ignoring HACKBOARD_LOG_FORMAT: {}", e),
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Hackboard Configuration
#
# Environment variables override these settings:
# - HACKBOARD_API_HOST
# - HACKBOARD_API_PORT
# - HACKBOARD_STORE_BACKEND
# - HACKBOARD_STORE_URL
# - HACKBOARD_STORE_API_KEY
# - HACKBOARD_POLL_INTERVAL_SECS
# - HACKBOARD_IDLE_TIMEOUT_SECS
# - HACKBOARD_MAX_TRACKED_USERS
# - HACKBOARD_LOG_LEVEL
# - HACKBOARD_LOG_FORMAT

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins (empty = any)
cors_origins = []

# Chat messages returned per page
message_page_size = 50

[store]
# "rest" for the hosted backend, "memory" for local development
backend = "rest"

# Project URL of the hosted backend
url = "http://localhost:54321"

# API key sent as `apikey` and bearer token
api_key = ""

# Request timeout in milliseconds
request_timeout_ms = 5000

# Attempts for retried writes
max_retries = 3

[notifications]
# Seconds between unread-announcement recomputes
poll_interval_secs = 10

# Stop polling for a user after this many seconds without a request
idle_timeout_secs = 300

# Most users polled at once; the least recently seen is dropped first
max_tracked_users = 1000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
