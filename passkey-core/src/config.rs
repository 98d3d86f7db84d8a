//! Client configuration loaded from environment variables with defaults.

use std::time::Duration;

use url::Url;

use crate::error::{PasskeyError, Result};
use crate::normalizer::NormalizerMode;

/// Default auth service base URL (better-auth mounts its routes under
/// `/api/auth`).
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/auth";

/// Configuration for [`HttpAuthService`](crate::transport::HttpAuthService)
/// and [`PasskeyClient`](crate::PasskeyClient).
#[derive(Clone)]
pub struct ClientConfig {
    /// Auth service base URL; endpoint paths are appended to it.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors on idempotent requests.
    pub max_retries: u32,
    /// Initial retry interval.
    pub initial_interval: Duration,
    /// Maximum retry interval.
    pub max_interval: Duration,
    /// Refuse plain-HTTP base URLs.
    pub require_https: bool,
    /// Bearer token sent with every request (session cookie alternative).
    pub bearer_token: Option<String>,
    /// Normalizer message policy; `None` derives it from the provider.
    pub normalizer_mode: Option<NormalizerMode>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("initial_interval", &self.initial_interval)
            .field("max_interval", &self.max_interval)
            .field("require_https", &self.require_https)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("normalizer_mode", &self.normalizer_mode)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            require_https: false,
            bearer_token: None,
            normalizer_mode: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            require_https: !is_loopback_url(&base_url),
            base_url,
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `PASSKEY_AUTH_URL` - base URL (default: `http://localhost:3000/api/auth`)
    /// - `PASSKEY_AUTH_TOKEN` - optional bearer token
    /// - `PASSKEY_HTTP_TIMEOUT_SECS` - request timeout (default: 10)
    /// - `PASSKEY_HTTP_MAX_RETRIES` - retries for GET requests (default: 2)
    /// - `PASSKEY_REQUIRE_HTTPS` - `true`/`false` (default: true unless the
    ///   base URL is loopback)
    /// - `PASSKEY_NORMALIZER_MODE` - `native` or `web` (default: from provider)
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("PASSKEY_AUTH_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url).with_env_overrides()
    }

    /// Apply every `from_env` variable except `PASSKEY_AUTH_URL`.
    pub fn with_env_overrides(self) -> Result<Self> {
        let mut config = self;

        if let Some(token) = std::env::var("PASSKEY_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
        {
            config.bearer_token = Some(token);
        }

        if let Some(secs) = parse_env::<u64>("PASSKEY_HTTP_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(retries) = parse_env::<u32>("PASSKEY_HTTP_MAX_RETRIES")? {
            config.max_retries = retries;
        }

        if let Ok(value) = std::env::var("PASSKEY_REQUIRE_HTTPS") {
            config.require_https = value.to_lowercase() != "false";
        }

        if let Ok(value) = std::env::var("PASSKEY_NORMALIZER_MODE") {
            let mode = value.parse::<NormalizerMode>().map_err(PasskeyError::Config)?;
            config.normalizer_mode = Some(mode);
        }

        Ok(config)
    }

    /// Parse and check the base URL.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| PasskeyError::Config(format!("Invalid base URL '{}': {e}", self.base_url)))?;

        match url.scheme() {
            "https" => {}
            "http" if !self.require_https => {}
            "http" => {
                return Err(PasskeyError::Config(format!(
                    "Plain HTTP base URL '{}' refused (set PASSKEY_REQUIRE_HTTPS=false for development)",
                    self.base_url
                )))
            }
            other => {
                return Err(PasskeyError::Config(format!(
                    "Unsupported URL scheme '{other}'"
                )))
            }
        }

        Ok(url)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PasskeyError::Config(format!("{name} has invalid value '{value}'"))),
        Err(_) => Ok(None),
    }
}

fn is_loopback_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .map(|host| matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]"))
        .unwrap_or(false)
}
