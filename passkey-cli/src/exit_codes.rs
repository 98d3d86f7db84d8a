//! Exit codes following sysexits.h conventions.
//!
//! Scripts can tell a cancelled prompt from a server rejection or an
//! unreachable auth service without parsing output.

use passkey_core::{ActionError, PasskeyError, AUTH_CANCELLED, INVALID_OPTIONS, INVALID_RESPONSE};

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments, bad configuration).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (undecodable payload, malformed base64url).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Auth service unreachable or failing.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Ceremony cancelled or unavailable; retrying may succeed.
/// Maps to EX_TEMPFAIL from sysexits.h.
pub const CANCELLED: i32 = 75;

/// The auth service rejected the request.
/// Maps to EX_NOPERM from sysexits.h.
pub const REJECTED: i32 = 77;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let code = if let Some(action) = err.downcast_ref::<ActionError>() {
            code_for_action_error(action)
        } else if let Some(passkey) = err.downcast_ref::<PasskeyError>() {
            match passkey {
                PasskeyError::Config(_) => USAGE_ERROR,
                PasskeyError::Encoding(_) | PasskeyError::Serialization(_) => DATA_ERROR,
                PasskeyError::Transport(_) | PasskeyError::Http(_) => NETWORK_ERROR,
            }
        } else if message.contains("Failed to read") {
            INPUT_ERROR
        } else if message.contains("Failed to write") {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

/// Classify an action outcome error.
pub fn code_for_action_error(error: &ActionError) -> i32 {
    match error.code.as_deref() {
        Some(AUTH_CANCELLED) => CANCELLED,
        Some(passkey_core::NETWORK_ERROR) => NETWORK_ERROR,
        Some(INVALID_OPTIONS) | Some(INVALID_RESPONSE) => DATA_ERROR,
        _ if error.status >= 500 => NETWORK_ERROR,
        _ if error.status >= 400 => REJECTED,
        _ => GENERAL_ERROR,
    }
}
