//! Passkey Core - client-side passkey (WebAuthn) actions
//!
//! This crate orchestrates the two passkey flows a client runs against a
//! better-auth style server: signing in with an existing passkey and
//! registering a new one for the signed-in user.
//!
//! # Features
//!
//! - Sequential options / ceremony / verify chains with a uniform
//!   `{data, error}` outcome
//! - Pluggable device ceremonies behind [`CeremonyProvider`]
//! - Pluggable transport behind [`AuthService`], with a reqwest client
//!   (`http` feature) that retries idempotent calls
//! - base64url (no padding) binary fields on the wire
//! - Reactive session and passkey list signals
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use passkey_core::{ClientConfig, MockCeremony, PasskeyClient, SignInOptions};
//!
//! # async fn example() -> passkey_core::Result<()> {
//! // Use the mock ceremony for testing (in production, use a platform provider)
//! let ceremony = Arc::new(MockCeremony::native());
//! let client = PasskeyClient::from_config(ClientConfig::from_env()?, ceremony)?;
//!
//! let outcome = client.sign_in_with_passkey(SignInOptions::default()).await;
//! match outcome.into_result() {
//!     Ok(data) => println!("signed in as {}", data.user.id),
//!     Err(error) => eprintln!("sign-in failed: {error}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod ceremony;
pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod normalizer;
pub mod outcome;
pub mod signal;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use ceremony::{
    CeremonyFailure, CeremonyPlatform, CeremonyProvider, CreateRequest, FailureKind, GetRequest,
    MockCeremony, UnsupportedCeremony,
};
pub use client::{
    paths, AddPasskeyOptions, PasskeyClient, PasskeyListQuery, SignInOptions, PLUGIN_ID,
};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use encoding::Base64UrlBytes;
pub use error::{PasskeyError, Result};
pub use normalizer::{normalize, CeremonyPhase, NormalizerMode, WEB_UNSUPPORTED_MESSAGE};
pub use outcome::{
    ActionError, ActionOutcome, AUTH_CANCELLED, INVALID_OPTIONS, INVALID_RESPONSE, NETWORK_ERROR,
};
pub use signal::{ChangeSignal, PasskeyStore, Signal, SignalBus};
pub use transport::{AuthRequest, AuthService, Method, MockAuthService, RequestOverrides};
pub use types::{
    AuthenticationResult, AuthenticatorAttachment, AuthenticatorTransport,
    CreationOptions, Passkey, RegisteredPasskey, RegistrationResult, RequestOptions, Session,
    SignInData, User,
};

#[cfg(feature = "http")]
pub use transport::HttpAuthService;
