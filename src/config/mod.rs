//! Configuration system for vultr-mcp
//!
//! Loads configuration from TOML files and environment variables.

mod types;

pub use types::*;

use crate::retry::RetryPolicy;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

/// Environment variable holding the Vultr API key
pub const API_KEY_ENV: &str = "VULTR_API_KEY";

/// Default Vultr API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.vultr.com/v2";

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("VULTR_API_KEY must be provided either as parameter or environment variable")]
    MissingApiKey,
}

/// Main vultr-mcp configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Vultr API access
    pub api: ApiConfig,
    /// Response cache
    pub cache: CacheConfig,
    /// Retry behaviour for transient failures
    pub retry: RetryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// MCP server configuration
    pub mcp: McpConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Load configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Self::from_raw(raw)
    }

    /// Convert from raw TOML config to validated config
    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            api: raw.api.unwrap_or_default().try_into()?,
            cache: raw.cache.unwrap_or_default().try_into()?,
            retry: raw.retry.unwrap_or_default().try_into()?,
            logging: raw.logging.unwrap_or_default().try_into()?,
            mcp: raw.mcp.unwrap_or_default().into(),
        })
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
            mcp: McpConfig::default(),
        }
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vultr-mcp")
            .join("config.toml")
    }

    /// Apply an API key override (CLI flag or environment).
    ///
    /// An explicit key always wins over the one read from the file.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api.api_key = Some(SecretString::from(key));
        }
        self
    }

    /// The API key, or an error when none was configured
    pub fn api_key(&self) -> Result<&SecretString, ConfigError> {
        self.api.api_key.as_ref().ok_or(ConfigError::MissingApiKey)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Vultr API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bearer token for the Vultr API
    pub api_key: Option<SecretString>,
    /// API base URL (without trailing slash)
    pub base_url: String,
    /// Total request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Page size used when following list cursors
    pub per_page: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            per_page: 100,
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether GET responses are cached
    pub enabled: bool,
    /// Total number of entries across all cache classes
    pub max_size: u64,
    /// TTL for endpoints that are neither domains nor records
    pub default_ttl: Duration,
    /// TTL for domain endpoints
    pub domain_ttl: Duration,
    /// TTL for record endpoints
    pub record_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 1000,
            default_ttl: Duration::from_secs(300),
            domain_ttl: Duration::from_secs(3600),
            record_ttl: Duration::from_secs(300),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::api_call();
        Self {
            max_attempts: policy.max_attempts,
            min_wait: policy.min_wait,
            max_wait: policy.max_wait,
            multiplier: policy.multiplier,
            jitter: policy.jitter,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts,
            min_wait: config.min_wait,
            max_wait: config.max_wait,
            multiplier: config.multiplier,
            jitter: config.jitter,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Format: "json" or "pretty"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format
    Pretty,
    /// JSON format
    Json,
}

/// MCP server configuration
#[derive(Debug, Clone)]
pub struct McpConfig {
    /// Server name reported during initialization
    pub name: String,
    /// Module prefixes to mount (`None` mounts everything)
    pub modules: Option<Vec<String>>,
    /// Glob patterns restricting exposed tool names
    pub tools: Vec<String>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            name: "mcp-vultr".to_string(),
            modules: None,
            tools: Vec::new(),
        }
    }
}

impl McpConfig {
    /// Whether a module prefix should be mounted
    pub fn module_enabled(&self, prefix: &str) -> bool {
        match &self.modules {
            Some(modules) => modules.iter().any(|m| m == prefix),
            None => true,
        }
    }
}

/// Commented default configuration written by `vultr-mcp init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# vultr-mcp Configuration

[api]
# api_key = "..."            # prefer the VULTR_API_KEY environment variable
base_url = "https://api.vultr.com/v2"
timeout_secs = 30
connect_timeout_secs = 10
per_page = 100

[cache]
enabled = true
max_size = 1000
default_ttl_secs = 300
domain_ttl_secs = 3600
record_ttl_secs = 300

[retry]
max_attempts = 3
min_wait_ms = 1000
max_wait_ms = 30000
multiplier = 2.0
jitter = true

[logging]
level = "info"
format = "pretty"

[mcp]
name = "mcp-vultr"
# modules = ["dns", "instances", "ssh_keys"]
# tools = ["dns_*", "instances_list"]
"#;
