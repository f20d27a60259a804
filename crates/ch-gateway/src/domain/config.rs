//! Gateway configuration with validation.
//!
//! Every setting has a development default. [`GatewayConfig::from_env`]
//! overrides them from `CH_GATEWAY_*` variables and fails on values that do
//! not parse; [`GatewayConfig::validate`] rejects unsafe combinations.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::ids::DEFAULT_ID_BASE;

/// Signing secret shipped as the development default
pub const DEFAULT_SIGNING_SECRET: &str = "123";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

/// Main gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Deployment environment
    pub environment: Environment,
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Identity the gateway presents in responses
    pub identity: IdentityConfig,
    /// Clearing House backend
    pub backend: BackendConfig,
    /// Service token minted for backend calls
    pub service_token: ServiceTokenConfig,
    /// Verification of inbound caller tokens
    pub dat: DatConfig,
    /// Request validation limits
    pub limits: LimitsConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            http: HttpConfig::default(),
            identity: IdentityConfig::default(),
            backend: BackendConfig::default(),
            service_token: ServiceTokenConfig::default(),
            dat: DatConfig::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `CH_GATEWAY_HOST`, `CH_GATEWAY_PORT`: bind address (default: 0.0.0.0:8181)
    /// - `CH_GATEWAY_ENVIRONMENT`: development | production
    /// - `CH_GATEWAY_CONNECTOR_ID`: gateway connector URI
    /// - `CH_GATEWAY_ID_BASE_URL`: base of generated identifiers
    /// - `CH_GATEWAY_MODEL_VERSION`: outbound model version (default: 4.1.0)
    /// - `CH_GATEWAY_IDENTITY_TOKEN`: static token for outbound envelopes
    /// - `CH_GATEWAY_APP_BASE_URL`: backend base URL (default: http://localhost:8000)
    /// - `CH_GATEWAY_APP_TIMEOUT_SECS`: backend timeout (default: 30)
    /// - `CH_GATEWAY_LEGACY_PAGE_PARAM`: send `size` as `page` (default: false)
    /// - `CH_GATEWAY_JWT_AUDIENCE`, `CH_GATEWAY_JWT_ISSUER`: service token claims (default: 1)
    /// - `CH_GATEWAY_JWT_SIGN_SECRET`: service token HS256 secret (default: 123)
    /// - `CH_GATEWAY_JWT_EXPIRES_AT`: service token TTL in seconds (default: 30)
    /// - `CH_GATEWAY_DAT_SECRET`, `CH_GATEWAY_DAT_AUDIENCE`: caller token verification
    /// - `CH_GATEWAY_MAX_REQUEST_SIZE`: request body limit in bytes
    /// - `CH_GATEWAY_LOG_LEVEL` or `RUST_LOG`: log filter (default: info)
    /// - `CH_GATEWAY_JSON_LOGS`: JSON log output (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);
        let mut config = Self::default();

        if let Some(env) = vars.parse::<Environment>("CH_GATEWAY_ENVIRONMENT")? {
            config.environment = env;
        }

        if let Some(host) = vars.parse::<IpAddr>("CH_GATEWAY_HOST")? {
            config.http.host = host;
        }
        if let Some(port) = vars.parse::<u16>("CH_GATEWAY_PORT")? {
            config.http.port = port;
        }

        if let Some(id) = vars.string("CH_GATEWAY_CONNECTOR_ID") {
            config.identity.connector_id = id;
        }
        if let Some(base) = vars.string("CH_GATEWAY_ID_BASE_URL") {
            config.identity.id_base = base;
        }
        if let Some(version) = vars.string("CH_GATEWAY_MODEL_VERSION") {
            config.identity.model_version = version;
        }
        config.identity.identity_token = vars.string("CH_GATEWAY_IDENTITY_TOKEN");

        if let Some(url) = vars.string("CH_GATEWAY_APP_BASE_URL") {
            config.backend.base_url = url;
        }
        if let Some(secs) = vars.parse::<u64>("CH_GATEWAY_APP_TIMEOUT_SECS")? {
            config.backend.timeout = Duration::from_secs(secs);
        }
        if let Some(legacy) = vars.parse::<bool>("CH_GATEWAY_LEGACY_PAGE_PARAM")? {
            config.backend.legacy_page_param = legacy;
        }

        if let Some(aud) = vars.string("CH_GATEWAY_JWT_AUDIENCE") {
            config.service_token.audience = aud;
        }
        if let Some(iss) = vars.string("CH_GATEWAY_JWT_ISSUER") {
            config.service_token.issuer = iss;
        }
        if let Some(secret) = vars.string("CH_GATEWAY_JWT_SIGN_SECRET") {
            config.service_token.secret = secret;
        }
        if let Some(secs) = vars.parse::<u64>("CH_GATEWAY_JWT_EXPIRES_AT")? {
            config.service_token.ttl = Duration::from_secs(secs);
        }

        config.dat.secret = vars.string("CH_GATEWAY_DAT_SECRET");
        config.dat.audience = vars.string("CH_GATEWAY_DAT_AUDIENCE");

        if let Some(size) = vars.parse::<usize>("CH_GATEWAY_MAX_REQUEST_SIZE")? {
            config.limits.max_request_size = size;
        }

        if let Some(level) = vars
            .string("CH_GATEWAY_LOG_LEVEL")
            .or_else(|| vars.string("RUST_LOG"))
        {
            config.logging.level = level;
        }
        if let Some(json) = vars.parse::<bool>("CH_GATEWAY_JSON_LOGS")? {
            config.logging.json = json;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.connector_id.trim().is_empty() {
            return Err(ConfigError::Invalid("connector_id cannot be empty".into()));
        }

        let base = self.backend.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.backend.base_url.clone()));
        }

        if self.backend.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "backend timeout cannot be 0".into(),
            ));
        }

        if self.service_token.ttl.as_secs() == 0 {
            return Err(ConfigError::InvalidTimeout(
                "service token TTL must be at least 1s".into(),
            ));
        }

        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if self.service_token.secret.is_empty() {
            return Err(ConfigError::Invalid("signing secret cannot be empty".into()));
        }

        if self.environment == Environment::Production {
            if self.service_token.secret == DEFAULT_SIGNING_SECRET {
                return Err(ConfigError::InsecureDefault(
                    "CH_GATEWAY_JWT_SIGN_SECRET must be set in production".into(),
                ));
            }
            if self.dat.secret.is_none() {
                return Err(ConfigError::InsecureDefault(
                    "CH_GATEWAY_DAT_SECRET must be set in production".into(),
                ));
            }
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8181)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8181,
        }
    }
}

/// Identity of the gateway in outbound envelopes
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Issuer connector and sender agent URI
    pub connector_id: String,
    /// Base of generated message and token ids
    pub id_base: String,
    /// Information model version stamped on responses
    pub model_version: String,
    /// Static security token for responses; minted when absent
    pub identity_token: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            connector_id: "urn:connector:clearing-house".to_string(),
            id_base: DEFAULT_ID_BASE.to_string(),
            model_version: "4.1.0".to_string(),
            identity_token: None,
        }
    }
}

/// Clearing House backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Send the `size` value as `page` in query URLs
    pub legacy_page_param: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(30),
            legacy_page_param: false,
        }
    }
}

impl BackendConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Service token configuration
#[derive(Debug, Clone)]
pub struct ServiceTokenConfig {
    pub audience: String,
    pub issuer: String,
    pub secret: String,
    /// Lifetime; `exp = iat + ttl`
    pub ttl: Duration,
}

impl Default for ServiceTokenConfig {
    fn default() -> Self {
        Self {
            audience: "1".to_string(),
            issuer: "1".to_string(),
            secret: DEFAULT_SIGNING_SECRET.to_string(),
            ttl: Duration::from_secs(30),
        }
    }
}

/// Caller token verification. Without a secret only structural checks run.
#[derive(Debug, Clone, Default)]
pub struct DatConfig {
    pub secret: Option<String>,
    pub audience: Option<String>,
}

/// Request validation limits
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes (default: 1MB)
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Env filter directive
    pub level: String,
    /// JSON formatted output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable that does not parse
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Backend URL that is not http(s)
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),
    /// Development default left in a production deployment
    #[error("insecure configuration: {0}")]
    InsecureDefault(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.string(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw,
                }),
        }
    }
}
