//! Device credential ceremonies.
//!
//! A ceremony provider presents the platform UI (biometric prompt, browser
//! WebAuthn dialog, security key tap) and returns a signed WebAuthn
//! response. The client depends only on [`CeremonyProvider`]; each
//! platform ships its own implementation.
//!
//! - [`MockCeremony`] - scripted provider for tests
//! - [`UnsupportedCeremony`] - environment without passkey support
//!
//! Providers own their timeouts: the client never races a ceremony against
//! a clock and relies on the platform's own cancel path.

mod mock;

pub use mock::{CeremonyCall, MockCeremony};

use async_trait::async_trait;

use crate::types::{AuthenticationResult, CreationOptions, RegistrationResult, RequestOptions};

/// Input to the "create credential" (registration) ceremony.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub options: CreationOptions,
    /// Conditional-create hint: register without an explicit prompt when
    /// the platform supports it.
    pub use_auto_register: bool,
}

/// Input to the "get credential" (authentication) ceremony.
#[derive(Debug, Clone, PartialEq)]
pub struct GetRequest {
    pub options: RequestOptions,
    /// Conditional-mediation hint: offer passkeys through form autofill.
    pub use_autofill: bool,
}

/// Which family of platform API backs a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyPlatform {
    /// Native credential manager (iOS AuthenticationServices, Android
    /// Credential Manager, desktop helpers).
    Native,
    /// Browser `navigator.credentials`.
    Web,
}

impl std::fmt::Display for CeremonyPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Web => write!(f, "web"),
        }
    }
}

/// Classification of a failed ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The user dismissed the platform prompt.
    Cancelled,
    /// The environment has no passkey capability.
    Unsupported,
    /// No authenticator or matching credential is available.
    NoCredentials,
    /// Any other platform error.
    Platform,
    /// The provider failed with a value that carries no message.
    Opaque,
}

/// Why a ceremony did not produce a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyFailure {
    pub kind: FailureKind,
    pub message: Option<String>,
}

impl CeremonyFailure {
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::with_message(FailureKind::Cancelled, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::with_message(FailureKind::Unsupported, message)
    }

    pub fn no_credentials(message: impl Into<String>) -> Self {
        Self::with_message(FailureKind::NoCredentials, message)
    }

    pub fn platform(message: impl Into<String>) -> Self {
        Self::with_message(FailureKind::Platform, message)
    }

    pub fn opaque() -> Self {
        Self {
            kind: FailureKind::Opaque,
            message: None,
        }
    }

    fn with_message(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            message: (!message.is_empty()).then_some(message),
        }
    }
}

impl std::fmt::Display for CeremonyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{:?}: {message}", self.kind),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl std::error::Error for CeremonyFailure {}

/// Platform credential ceremony capability.
///
/// Implementations must be thread-safe (`Send + Sync`) and must encode all
/// binary response fields as base64url without padding (the
/// [`Base64UrlBytes`](crate::encoding::Base64UrlBytes) fields take care of
/// this when results are built from raw bytes).
#[async_trait]
pub trait CeremonyProvider: Send + Sync {
    /// Run the registration ceremony.
    async fn create_credential(
        &self,
        request: CreateRequest,
    ) -> Result<RegistrationResult, CeremonyFailure>;

    /// Run the authentication ceremony.
    async fn get_credential(
        &self,
        request: GetRequest,
    ) -> Result<AuthenticationResult, CeremonyFailure>;

    /// The platform family, used to pick the normalizer mode.
    fn platform(&self) -> CeremonyPlatform;

    /// Whether the ceremony capability exists at all. Checked before any
    /// network call.
    fn is_supported(&self) -> bool {
        true
    }
}

/// Provider for environments without passkey support.
///
/// Every ceremony fails with [`FailureKind::Unsupported`], and
/// [`CeremonyProvider::is_supported`] reports `false` so the client fails
/// before contacting the auth service.
#[derive(Debug, Clone)]
pub struct UnsupportedCeremony {
    platform: CeremonyPlatform,
    message: String,
}

impl UnsupportedCeremony {
    pub fn new(platform: CeremonyPlatform) -> Self {
        Self {
            platform,
            message: "WebAuthn not supported in this environment".to_string(),
        }
    }

    pub fn with_message(platform: CeremonyPlatform, message: impl Into<String>) -> Self {
        Self {
            platform,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[async_trait]
impl CeremonyProvider for UnsupportedCeremony {
    async fn create_credential(
        &self,
        _request: CreateRequest,
    ) -> Result<RegistrationResult, CeremonyFailure> {
        Err(CeremonyFailure::unsupported(self.message.clone()))
    }

    async fn get_credential(
        &self,
        _request: GetRequest,
    ) -> Result<AuthenticationResult, CeremonyFailure> {
        Err(CeremonyFailure::unsupported(self.message.clone()))
    }

    fn platform(&self) -> CeremonyPlatform {
        self.platform
    }

    fn is_supported(&self) -> bool {
        false
    }
}
