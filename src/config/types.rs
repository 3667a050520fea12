//! Raw configuration types for TOML parsing

use super::*;
use serde::Deserialize;

/// Raw configuration as parsed from TOML
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub api: Option<RawApiConfig>,
    pub cache: Option<RawCacheConfig>,
    pub retry: Option<RawRetryConfig>,
    pub logging: Option<RawLoggingConfig>,
    pub mcp: Option<RawMcpConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawApiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub per_page: Option<u32>,
}

impl TryFrom<RawApiConfig> for ApiConfig {
    type Error = ConfigError;

    fn try_from(raw: RawApiConfig) -> Result<Self, Self::Error> {
        let defaults = ApiConfig::default();

        let base_url = match raw.base_url {
            Some(url) => {
                let parsed = url::Url::parse(&url)
                    .map_err(|e| ConfigError::Invalid(format!("Invalid api.base_url: {}", e)))?;
                match parsed.scheme() {
                    "http" | "https" => {}
                    scheme => {
                        return Err(ConfigError::Invalid(format!(
                            "api.base_url scheme '{}' not allowed",
                            scheme
                        )))
                    }
                }
                url.trim_end_matches('/').to_string()
            }
            None => defaults.base_url,
        };

        let per_page = raw.per_page.unwrap_or(defaults.per_page);
        if per_page == 0 || per_page > 500 {
            return Err(ConfigError::Invalid(format!(
                "api.per_page must be between 1 and 500, got {}",
                per_page
            )));
        }

        Ok(Self {
            api_key: raw
                .api_key
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
            base_url,
            timeout: raw
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            connect_timeout: raw
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            per_page,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawCacheConfig {
    pub enabled: Option<bool>,
    pub max_size: Option<u64>,
    pub default_ttl_secs: Option<u64>,
    pub domain_ttl_secs: Option<u64>,
    pub record_ttl_secs: Option<u64>,
}

impl TryFrom<RawCacheConfig> for CacheConfig {
    type Error = ConfigError;

    fn try_from(raw: RawCacheConfig) -> Result<Self, Self::Error> {
        let defaults = CacheConfig::default();
        let max_size = raw.max_size.unwrap_or(defaults.max_size);
        if max_size < 4 {
            return Err(ConfigError::Invalid(
                "cache.max_size must be at least 4".to_string(),
            ));
        }

        Ok(Self {
            enabled: raw.enabled.unwrap_or(defaults.enabled),
            max_size,
            default_ttl: raw
                .default_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_ttl),
            domain_ttl: raw
                .domain_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.domain_ttl),
            record_ttl: raw
                .record_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.record_ttl),
        })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawRetryConfig {
    pub max_attempts: Option<u32>,
    pub min_wait_ms: Option<u64>,
    pub max_wait_ms: Option<u64>,
    pub multiplier: Option<f64>,
    pub jitter: Option<bool>,
}

impl TryFrom<RawRetryConfig> for RetryConfig {
    type Error = ConfigError;

    fn try_from(raw: RawRetryConfig) -> Result<Self, Self::Error> {
        let defaults = RetryConfig::default();
        let config = Self {
            max_attempts: raw.max_attempts.unwrap_or(defaults.max_attempts),
            min_wait: raw
                .min_wait_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.min_wait),
            max_wait: raw
                .max_wait_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_wait),
            multiplier: raw.multiplier.unwrap_or(defaults.multiplier),
            jitter: raw.jitter.unwrap_or(defaults.jitter),
        };

        if config.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if config.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.multiplier must be >= 1.0".to_string(),
            ));
        }
        if config.min_wait > config.max_wait {
            return Err(ConfigError::Invalid(
                "retry.min_wait_ms must not exceed retry.max_wait_ms".to_string(),
            ));
        }

        Ok(config)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawLoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl TryFrom<RawLoggingConfig> for LoggingConfig {
    type Error = ConfigError;

    fn try_from(raw: RawLoggingConfig) -> Result<Self, Self::Error> {
        let format = match raw.format.as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown log format: {}",
                    other
                )))
            }
        };

        Ok(Self {
            level: raw.level.unwrap_or_else(|| "info".to_string()),
            format,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawMcpConfig {
    pub name: Option<String>,
    pub modules: Option<Vec<String>>,
    #[serde(default)]
    pub tools: Vec<String>,
}

impl From<RawMcpConfig> for McpConfig {
    fn from(raw: RawMcpConfig) -> Self {
        Self {
            name: raw.name.unwrap_or_else(|| "mcp-vultr".to_string()),
            modules: raw.modules,
            tools: raw.tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[api]
api_key = "abc123"
base_url = "https://api.example.test/v2/"
timeout_secs = 5

[cache]
max_size = 200
domain_ttl_secs = 60

[retry]
max_attempts = 5
min_wait_ms = 10
max_wait_ms = 100

[logging]
level = "debug"
format = "json"

[mcp]
modules = ["dns", "instances"]
tools = ["dns_*"]
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.api.api_key.as_ref().unwrap().expose_secret(), "abc123");
        assert_eq!(config.api.base_url, "https://api.example.test/v2");
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert_eq!(config.cache.max_size, 200);
        assert_eq!(config.cache.domain_ttl, Duration::from_secs(60));
        assert_eq!(config.cache.record_ttl, Duration::from_secs(300));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.mcp.module_enabled("dns"));
        assert!(!config.mcp.module_enabled("kubernetes"));
        assert_eq!(config.mcp.tools, vec!["dns_*".to_string()]);
    }

    #[test]
    fn test_minimal_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert!(config.api.api_key.is_none());
        assert!(config.cache.enabled);
        assert_eq!(config.mcp.name, "mcp-vultr");
        assert!(config.mcp.module_enabled("anything"));
    }

    #[test]
    fn test_template_parses() {
        let config = Config::parse(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.cache.domain_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::parse("[logging]\nformat = \"xml\"").is_err());
        assert!(Config::parse("[retry]\nmax_attempts = 0").is_err());
        assert!(Config::parse("[api]\nbase_url = \"ftp://x\"").is_err());
        assert!(Config::parse("[api]\nper_page = 0").is_err());
        assert!(Config::parse("[cache]\nmax_size = 2").is_err());
    }

    #[test]
    fn test_api_key_override() {
        let config = Config::parse("[api]\napi_key = \"from-file\"")
            .unwrap()
            .with_api_key(Some("from-env".to_string()));
        assert_eq!(config.api_key().unwrap().expose_secret(), "from-env");

        let config = Config::default().with_api_key(Some("   ".to_string()));
        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
    }
}
