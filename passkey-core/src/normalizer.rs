//! Maps ceremony failures onto the uniform [`ActionError`] shape.
//!
//! Every failure (cancellation, platform error, unsupported environment)
//! becomes `AUTH_CANCELLED` / 400 / `BAD_REQUEST`. Only the message differs
//! between modes:
//!
//! - [`NormalizerMode::Native`] keeps the provider's message.
//! - [`NormalizerMode::Web`] replaces cancellation-like messages with a
//!   fixed "not supported" notice, matching the browser client this crate
//!   interoperates with.

use crate::ceremony::{CeremonyFailure, CeremonyPlatform, FailureKind};
use crate::outcome::{ActionError, AUTH_CANCELLED};

/// Message the web mode substitutes for cancellation-like failures.
pub const WEB_UNSUPPORTED_MESSAGE: &str = "WebAuthn is not supported in this browser";

/// Case-insensitive vocabulary that marks a message as cancellation-like.
const CANCELLATION_TERMS: [&str; 5] = ["abort", "cancel", "dismiss", "not allowed", "unsupported"];

/// Which ceremony was running when the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyPhase {
    Authentication,
    Registration,
}

impl CeremonyPhase {
    /// Message used when the failure carries none.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Authentication => "auth cancelled",
            Self::Registration => "registration cancelled",
        }
    }
}

/// Message policy for normalized errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NormalizerMode {
    #[default]
    Native,
    Web,
}

impl From<CeremonyPlatform> for NormalizerMode {
    fn from(platform: CeremonyPlatform) -> Self {
        match platform {
            CeremonyPlatform::Native => Self::Native,
            CeremonyPlatform::Web => Self::Web,
        }
    }
}

impl std::str::FromStr for NormalizerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "web" => Ok(Self::Web),
            other => Err(format!("unknown normalizer mode '{other}' (expected native or web)")),
        }
    }
}

/// Whether `message` reads like a cancellation or unsupported environment.
pub fn is_cancellation_like(message: &str) -> bool {
    let message = message.to_lowercase();
    CANCELLATION_TERMS.iter().any(|term| message.contains(term))
}

/// Normalize a ceremony failure.
pub fn normalize(failure: &CeremonyFailure, phase: CeremonyPhase, mode: NormalizerMode) -> ActionError {
    let message = failure
        .message
        .as_deref()
        .unwrap_or_else(|| phase.default_message());

    let message = match mode {
        NormalizerMode::Native => message,
        NormalizerMode::Web => {
            let recognized = matches!(failure.kind, FailureKind::Cancelled | FailureKind::Unsupported);
            if recognized || is_cancellation_like(message) {
                WEB_UNSUPPORTED_MESSAGE
            } else {
                message
            }
        }
    };

    ActionError::new(AUTH_CANCELLED, message, 400, "BAD_REQUEST")
}
