//! HTTP auth service client with retry and backoff for idempotent calls.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{AuthRequest, AuthService, Method};
use crate::config::ClientConfig;
use crate::error::{PasskeyError, Result};
use crate::outcome::{ActionError, ActionOutcome, INVALID_RESPONSE};

/// Error body returned by better-auth style servers.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// reqwest-backed [`AuthService`].
///
/// GET requests are retried on transient failures; POST requests (which
/// consume a single-use challenge) are sent exactly once.
pub struct HttpAuthService {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl HttpAuthService {
    /// Create a new client with the given configuration.
    #[instrument(level = "debug", skip_all, fields(base_url = %config.base_url))]
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.parsed_base_url()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .https_only(config.require_https)
            .build()
            .map_err(|e| PasskeyError::Transport(format!("Failed to create HTTP client: {e}")))?;

        debug!("Auth service client created");
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Client configured from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve an endpoint path below the base URL, keeping the base path.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| PasskeyError::Config(format!("Invalid endpoint '{path}': {e}")))
    }

    async fn send_once(
        &self,
        url: &Url,
        request: &AuthRequest,
    ) -> std::result::Result<ActionOutcome<Value>, backoff::Error<ActionError>> {
        let start = Instant::now();

        let mut builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.config.bearer_token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let latency_ms = start.elapsed().as_millis() as u64;
            let error = ActionError::network(format!("Request to {} failed: {e}", request.path));
            if is_transient_error(&e) {
                warn!(error = %e, latency_ms, "Transient transport error");
                backoff::Error::transient(error)
            } else {
                warn!(error = %e, latency_ms, "Permanent transport error");
                backoff::Error::permanent(error)
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            backoff::Error::permanent(ActionError::network(format!(
                "Failed to read response body: {e}"
            )))
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(status = %status, latency_ms, bytes = bytes.len(), "Received HTTP response");

        if status.is_success() {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(ActionOutcome::empty());
            }
            return Ok(match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => ActionOutcome::success(value),
                Err(e) => {
                    warn!(error = %e, "Response body is not JSON");
                    ActionOutcome::failure(ActionError::internal(
                        INVALID_RESPONSE,
                        format!("Response body is not JSON: {e}"),
                    ))
                }
            });
        }

        let error = error_from_response(status, &bytes);
        if is_transient_status(status) {
            warn!(status = %status, latency_ms, "Transient HTTP status");
            Err(backoff::Error::transient(error))
        } else {
            debug!(status = %status, code = ?error.code, "Auth service rejected request");
            Ok(ActionOutcome::failure(error))
        }
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_interval,
            max_interval: self.config.max_interval,
            max_elapsed_time: Some(
                self.config
                    .timeout
                    .checked_mul(self.config.max_retries)
                    .unwrap_or(Duration::MAX),
            ),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    #[instrument(
        level = "debug",
        skip_all,
        fields(method = %request.method, path = %request.path)
    )]
    async fn call(&self, request: AuthRequest) -> ActionOutcome<Value> {
        let url = match self.endpoint(&request.path) {
            Ok(url) => url,
            Err(e) => return ActionOutcome::failure(ActionError::network(e.to_string())),
        };

        let retry = request.method.is_idempotent() && self.config.max_retries > 0;
        if !retry {
            return self
                .send_once(&url, &request)
                .await
                .unwrap_or_else(into_failure);
        }

        retry_notify(
            self.build_backoff(),
            || async { self.send_once(&url, &request).await },
            |err: ActionError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
        .unwrap_or_else(ActionOutcome::failure)
    }
}

fn into_failure(err: backoff::Error<ActionError>) -> ActionOutcome<Value> {
    match err {
        backoff::Error::Permanent(error) => ActionOutcome::failure(error),
        backoff::Error::Transient { err, .. } => ActionOutcome::failure(err),
    }
}

/// Build the error half of an outcome from a non-2xx response.
fn error_from_response(status: StatusCode, body: &[u8]) -> ActionError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed.message.or_else(|| {
        let text = String::from_utf8_lossy(body).trim().to_string();
        if text.is_empty() {
            status.canonical_reason().map(str::to_string)
        } else {
            Some(text)
        }
    });

    ActionError {
        code: parsed.code,
        message,
        status: status.as_u16(),
        status_text: status_text(status),
    }
}

/// Upper snake case reason phrase, e.g. `BAD_REQUEST`.
pub fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason
            .chars()
            .filter_map(|c| match c {
                ' ' | '-' => Some('_'),
                c if c.is_ascii_alphanumeric() => Some(c.to_ascii_uppercase()),
                _ => None,
            })
            .collect(),
        None => status.as_str().to_string(),
    }
}

/// Check if a reqwest error is transient and should be retried.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Check if an HTTP status code indicates a transient error.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}
