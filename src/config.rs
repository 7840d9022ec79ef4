use crate::logging::SensitiveValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub artifactory: ArtifactoryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub optional_metrics: OptionalMetrics,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactoryConfig {
    /// Base URI every endpoint path is appended to
    /// (e.g. "http://localhost:8081/artifactory/api")
    pub scrape_uri: String,

    /// Verify the server's TLS certificate (default: true)
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    /// Default per-request timeout (default: 5)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    pub credentials: Credentials,
}

impl ArtifactoryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Credentials attached to every request
#[derive(Clone, Deserialize, Serialize)]
#[serde(tag = "auth_method", rename_all = "snake_case")]
pub enum Credentials {
    UserPass { username: String, password: String },
    AccessToken { access_token: String },
}

impl Credentials {
    pub fn auth_method(&self) -> &'static str {
        match self {
            Self::UserPass { .. } => "user_pass",
            Self::AccessToken { .. } => "access_token",
        }
    }

    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::UserPass { username, password } => request.basic_auth(username, Some(password)),
            Self::AccessToken { access_token } => request.bearer_auth(access_token),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPass { username, password } => f
                .debug_struct("UserPass")
                .field("username", username)
                .field("password", &SensitiveValue::new(password))
                .finish(),
            Self::AccessToken { access_token } => f
                .debug_struct("AccessToken")
                .field("access_token", &SensitiveValue::new(access_token))
                .finish(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Serve repeated fetches of the same endpoint from memory (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Maximum age of a cached response (default: 300)
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// Timeout applied to fetches made on a cache miss (default: 30)
    #[serde(default = "default_cache_timeout")]
    pub timeout_seconds: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_seconds: default_cache_ttl(),
            timeout_seconds: default_cache_timeout(),
        }
    }
}

/// Metric families that are only collected when switched on
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OptionalMetrics {
    #[serde(default)]
    pub federation_status: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Fallback filter when RUST_LOG is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "text" or "json" (default: "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_ssl_verify() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Load configuration from `path` (any format the `config` crate detects by
/// extension), with `ARTIFACTORY_EXPORTER__*` environment overrides.
pub fn load_config(path: &str) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("ARTIFACTORY_EXPORTER").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    let uri = cfg.artifactory.scrape_uri.trim();
    if uri.is_empty() {
        anyhow::bail!("artifactory.scrape_uri cannot be empty");
    }
    if !uri.starts_with("http://") && !uri.starts_with("https://") {
        anyhow::bail!(
            "artifactory.scrape_uri must start with http:// or https://, got '{}'",
            uri
        );
    }

    if cfg.artifactory.timeout_seconds == 0 {
        anyhow::bail!("artifactory.timeout_seconds must be greater than 0");
    }

    match &cfg.artifactory.credentials {
        Credentials::UserPass { username, .. } => {
            if username.is_empty() {
                anyhow::bail!("Username cannot be empty for user_pass authentication");
            }
        }
        Credentials::AccessToken { access_token } => {
            if access_token.is_empty() {
                anyhow::bail!("Access token cannot be empty for access_token authentication");
            }
        }
    }

    if cfg.cache.enabled {
        if cfg.cache.ttl_seconds == 0 {
            anyhow::bail!("cache.ttl_seconds must be greater than 0 when caching is enabled");
        }
        if cfg.cache.timeout_seconds == 0 {
            anyhow::bail!("cache.timeout_seconds must be greater than 0 when caching is enabled");
        }
    }

    match cfg.logging.format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("Invalid logging.format '{}': expected 'text' or 'json'", other),
    }

    Ok(())
}
