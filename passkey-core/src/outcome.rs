//! Uniform `{data, error}` result shape returned by every client action.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Error code for ceremonies that were cancelled or failed on the device.
pub const AUTH_CANCELLED: &str = "AUTH_CANCELLED";
/// Error code for option payloads the client could not decode.
pub const INVALID_OPTIONS: &str = "INVALID_OPTIONS";
/// Error code for verified payloads the client could not decode.
pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
/// Error code for requests that never produced an HTTP response.
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";

/// Error half of an [`ActionOutcome`].
///
/// Remote rejections are carried verbatim, so every field except `status`
/// may be missing on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
}

impl ActionError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        status: u16,
        status_text: impl Into<String>,
    ) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
            status,
            status_text: status_text.into(),
        }
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, 500, "INTERNAL_SERVER_ERROR")
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(NETWORK_ERROR, message, 0, NETWORK_ERROR)
    }

    pub fn is_cancelled(&self) -> bool {
        self.code.as_deref() == Some(AUTH_CANCELLED)
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = self.message.as_deref().unwrap_or("request failed");
        match &self.code {
            Some(code) => write!(f, "{message} ({code}, status {})", self.status),
            None => write!(f, "{message} (status {})", self.status),
        }
    }
}

impl std::error::Error for ActionError {}

/// `{data: T, error: null}` on success, `{data: null, error}` on failure.
///
/// A transport may also deliver `{data: null, error: null}` for an empty
/// payload, which callers treat as "no payload" rather than success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome<T> {
    pub data: Option<T>,
    pub error: Option<ActionError>,
}

impl<T> ActionOutcome<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ActionError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    pub fn empty() -> Self {
        Self {
            data: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some()
    }

    /// Re-type an outcome that carries no payload.
    ///
    /// Used to propagate remote failures unchanged across endpoints whose
    /// payload types differ.
    pub fn cast<U>(self) -> ActionOutcome<U> {
        ActionOutcome {
            data: None,
            error: self.error,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionOutcome<U> {
        ActionOutcome {
            data: self.data.map(f),
            error: self.error,
        }
    }

    /// Collapse into a `Result`, treating an empty payload as an error.
    pub fn into_result(self) -> Result<T, ActionError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            (None, None) => Err(ActionError {
                code: None,
                message: Some("empty response".to_string()),
                status: 0,
                status_text: String::new(),
            }),
        }
    }
}

impl ActionOutcome<serde_json::Value> {
    /// Decode the JSON payload into `T`.
    ///
    /// Failures and empty payloads pass through unchanged; a payload that
    /// does not match `T` becomes an error tagged with `code`. A JSON
    /// `null` payload counts as empty.
    pub fn decode<T: DeserializeOwned>(self, code: &str) -> ActionOutcome<T> {
        match self.data {
            None | Some(serde_json::Value::Null) => ActionOutcome {
                data: None,
                error: self.error,
            },
            Some(value) => match serde_json::from_value(value) {
                Ok(data) => ActionOutcome {
                    data: Some(data),
                    error: self.error,
                },
                Err(e) => ActionOutcome::failure(ActionError::internal(
                    code,
                    format!("Failed to decode response payload: {e}"),
                )),
            },
        }
    }
}
