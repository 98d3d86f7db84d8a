//! Remote auth service access.
//!
//! The client talks to the auth server through [`AuthService`], a single
//! request/outcome operation. Implementations never fail out of band: HTTP
//! errors, unreachable hosts and malformed bodies all come back as an
//! [`ActionOutcome`] carrying an [`ActionError`](crate::ActionError).
//!
//! - [`HttpAuthService`] - reqwest client with retry for idempotent calls
//! - [`MockAuthService`] - scripted responses, records every request

#[cfg(feature = "http")]
mod http_client;
mod mock;

#[cfg(feature = "http")]
pub use http_client::{is_transient_error, is_transient_status, status_text, HttpAuthService};
pub use mock::MockAuthService;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::outcome::ActionOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }

    /// Safe to retry without server-side effects.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Self::Get)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied request adjustments (the `fetchOptions` of the JS
/// client). Merged into the verify requests; the protocol body always
/// wins over anything supplied here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOverrides {
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
}

impl RequestOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.query.is_empty()
    }
}

/// One call to the auth service. `path` is relative to the service base
/// URL.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl AuthRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: Some(body),
        }
    }

    /// Add a query parameter only when a value is present.
    pub fn with_query_opt(mut self, name: &str, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            self.query.insert(name.to_string(), value.into());
        }
        self
    }

    /// Merge caller overrides. Existing protocol parameters are kept.
    pub fn with_overrides(mut self, overrides: &RequestOverrides) -> Self {
        for (name, value) in &overrides.headers {
            self.headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        for (name, value) in &overrides.query {
            self.query.entry(name.clone()).or_insert_with(|| value.clone());
        }
        self
    }
}

/// Remote auth service.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Perform one request. Must resolve to an outcome for every failure.
    async fn call(&self, request: AuthRequest) -> ActionOutcome<Value>;
}
