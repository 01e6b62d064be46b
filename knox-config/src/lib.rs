//! Configuration management for Knox clients

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Default Knox server location
pub const DEFAULT_BASE_URL: &str = "https://localhost:9000";

const ENV_PREFIX: &str = "KNOX";

/// Client configuration
#[derive(Clone, Deserialize)]
pub struct KnoxConfig {
    /// Scheme, host and port of the Knox server
    pub base_url: String,
    /// Value sent in the `Authorization` header, if any
    pub auth_token: Option<String>,
    pub timeout_seconds: u64,
    /// Accept self-signed certificates (test servers only)
    pub accept_invalid_certs: bool,
    /// How often a live key provider re-fetches its key
    pub refresh_interval_seconds: u64,
    pub log_level: Option<String>,
}

impl KnoxConfig {
    /// Build a configuration for `base_url` with every other field defaulted
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout_seconds: 10,
            accept_invalid_certs: false,
            refresh_interval_seconds: 10,
            log_level: Some("info".to_string()),
        }
    }

    /// Load configuration from `KNOX_*` environment variables
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_environment(source: Environment) -> Result<Self, ConfigError> {
        let loaded: KnoxConfig = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("timeout_seconds", 10_i64)?
            .set_default("accept_invalid_certs", false)?
            .set_default("refresh_interval_seconds", 10_i64)?
            .set_default("log_level", "info")?
            .add_source(source)
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Check values the deserializer cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Message(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.refresh_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "refresh_interval_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

impl fmt::Debug for KnoxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnoxConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("refresh_interval_seconds", &self.refresh_interval_seconds)
            .field("log_level", &self.log_level)
            .finish()
    }
}
