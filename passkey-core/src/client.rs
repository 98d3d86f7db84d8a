//! Passkey actions: sign in with an existing passkey, register a new one.
//!
//! Each action is a strictly sequential chain:
//!
//! 1. fetch options from the auth service,
//! 2. run the device ceremony,
//! 3. submit the ceremony result for verification,
//! 4. update reactive state.
//!
//! Every path ends in an [`ActionOutcome`]; nothing is returned as
//! `Err` and nothing panics, so callers can treat both actions as total.
//!
//! Concurrent invocations are not deduplicated. The host UI must not start
//! a second ceremony while one is pending (the OS credential UI rejects it
//! anyway).

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::ceremony::{CeremonyFailure, CeremonyProvider, CreateRequest, GetRequest};
use crate::normalizer::{normalize, CeremonyPhase, NormalizerMode};
use crate::outcome::{ActionError, ActionOutcome, INVALID_OPTIONS, INVALID_RESPONSE};
use crate::signal::{ChangeSignal, PasskeyStore, Signal};
use crate::transport::{AuthRequest, AuthService, RequestOverrides};
use crate::types::{
    AuthenticatorAttachment, CreationOptions, Passkey, RegisteredPasskey, RequestOptions,
    SignInData,
};

/// Identifier of the server plugin this client pairs with.
pub const PLUGIN_ID: &str = "passkey";

/// Auth service endpoints.
pub mod paths {
    pub const GENERATE_AUTHENTICATE_OPTIONS: &str = "/passkey/generate-authenticate-options";
    pub const VERIFY_AUTHENTICATION: &str = "/passkey/verify-authentication";
    pub const GENERATE_REGISTER_OPTIONS: &str = "/passkey/generate-register-options";
    pub const VERIFY_REGISTRATION: &str = "/passkey/verify-registration";
    pub const LIST_USER_PASSKEYS: &str = "/passkey/list-user-passkeys";
}

/// Options for [`PasskeyClient::sign_in_with_passkey`].
#[derive(Debug, Clone, Default)]
pub struct SignInOptions {
    /// Offer passkeys through form autofill (conditional mediation).
    pub auto_fill: bool,
    /// Merged into the verification request.
    pub fetch_options: RequestOverrides,
}

/// Options for [`PasskeyClient::add_passkey`].
#[derive(Debug, Clone, Default)]
pub struct AddPasskeyOptions {
    /// Display name stored with the passkey.
    pub name: Option<String>,
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    /// Conditional create: register without an explicit prompt.
    pub use_auto_register: bool,
    /// Merged into the verification request.
    pub fetch_options: RequestOverrides,
}

/// Passkey action orchestrator.
///
/// Cheap to clone; clones share the auth service, the ceremony provider and
/// the reactive store.
#[derive(Clone)]
pub struct PasskeyClient {
    service: Arc<dyn AuthService>,
    ceremony: Arc<dyn CeremonyProvider>,
    store: PasskeyStore,
    mode: NormalizerMode,
}

impl PasskeyClient {
    /// Create a client. The normalizer mode follows the provider's platform.
    pub fn new(service: Arc<dyn AuthService>, ceremony: Arc<dyn CeremonyProvider>) -> Self {
        let mode = NormalizerMode::from(ceremony.platform());
        Self {
            service,
            ceremony,
            store: PasskeyStore::new(),
            mode,
        }
    }

    /// Client backed by [`HttpAuthService`](crate::transport::HttpAuthService).
    #[cfg(feature = "http")]
    pub fn from_config(
        config: crate::config::ClientConfig,
        ceremony: Arc<dyn CeremonyProvider>,
    ) -> crate::error::Result<Self> {
        let mode = config.normalizer_mode;
        let service = crate::transport::HttpAuthService::new(config)?;
        let client = Self::new(Arc::new(service), ceremony);
        Ok(match mode {
            Some(mode) => client.with_normalizer_mode(mode),
            None => client,
        })
    }

    pub fn with_normalizer_mode(mut self, mode: NormalizerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Share reactive state with another client or with UI bindings.
    pub fn with_store(mut self, store: PasskeyStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &PasskeyStore {
        &self.store
    }

    pub fn normalizer_mode(&self) -> NormalizerMode {
        self.mode
    }

    /// Sign in with a passkey.
    ///
    /// Emits [`Signal::SessionChanged`] once the server accepts the
    /// assertion.
    #[instrument(level = "info", skip_all, fields(auto_fill = opts.auto_fill))]
    pub async fn sign_in_with_passkey(&self, opts: SignInOptions) -> ActionOutcome<SignInData> {
        let phase = CeremonyPhase::Authentication;
        if !self.ceremony.is_supported() {
            return self.ceremony_failed(&unsupported(), phase);
        }

        let options = self
            .service
            .call(AuthRequest::get(paths::GENERATE_AUTHENTICATE_OPTIONS))
            .await;
        let options: RequestOptions = match options.decode(INVALID_OPTIONS).data_or_failure() {
            Ok(options) => options,
            Err(outcome) => {
                warn!("Authentication options unavailable");
                return outcome;
            }
        };

        debug!(
            rp_id = ?options.rp_id,
            allow_credentials = options.allow_credentials.as_ref().map(Vec::len),
            "Starting authentication ceremony"
        );
        let request = GetRequest {
            options,
            use_autofill: opts.auto_fill,
        };
        let assertion = match self.ceremony.get_credential(request).await {
            Ok(assertion) if assertion.has_consistent_id() => assertion,
            Ok(_) => return self.ceremony_failed(&mismatched_id(), phase),
            Err(failure) => return self.ceremony_failed(&failure, phase),
        };

        let body = match wrap_response(&assertion, None) {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };
        let verified = self
            .service
            .call(
                AuthRequest::post(paths::VERIFY_AUTHENTICATION, body)
                    .with_overrides(&opts.fetch_options),
            )
            .await;

        if !has_payload(&verified) {
            warn!(error = ?verified.error, "Authentication rejected");
            return verified.cast();
        }

        self.store.bus.notify(Signal::SessionChanged);
        info!(credential_id = %assertion.id, "Passkey authentication verified");
        verified.decode(INVALID_RESPONSE)
    }

    /// Register a new passkey for the signed-in user.
    ///
    /// Bumps the passkey list [`ChangeSignal`] and emits
    /// [`Signal::PasskeyListChanged`] once the server accepts the attestation.
    #[instrument(
        level = "info",
        skip_all,
        fields(
            attachment = ?opts.authenticator_attachment,
            use_auto_register = opts.use_auto_register
        )
    )]
    pub async fn add_passkey(&self, opts: AddPasskeyOptions) -> ActionOutcome<RegisteredPasskey> {
        let phase = CeremonyPhase::Registration;
        if !self.ceremony.is_supported() {
            return self.ceremony_failed(&unsupported(), phase);
        }

        let name = opts.name.filter(|n| !n.is_empty());
        let options_request = AuthRequest::get(paths::GENERATE_REGISTER_OPTIONS)
            .with_query_opt(
                "authenticatorAttachment",
                opts.authenticator_attachment.map(|a| a.as_str()),
            )
            .with_query_opt("name", name.clone());

        let options = self.service.call(options_request).await;
        let options: CreationOptions = match options.decode(INVALID_OPTIONS).data_or_failure() {
            Ok(options) => options,
            Err(outcome) => {
                warn!("Registration options unavailable");
                return outcome;
            }
        };

        debug!(
            rp_id = ?options.rp.id,
            algorithms = options.pub_key_cred_params.len(),
            "Starting registration ceremony"
        );
        let request = CreateRequest {
            options,
            use_auto_register: opts.use_auto_register,
        };
        let mut attestation = match self.ceremony.create_credential(request).await {
            Ok(attestation) if attestation.has_consistent_id() => attestation,
            Ok(_) => return self.ceremony_failed(&mismatched_id(), phase),
            Err(failure) => return self.ceremony_failed(&failure, phase),
        };
        if attestation.response.transports.is_empty() {
            attestation.response.transports = crate::types::default_transports();
        }

        let body = match wrap_response(&attestation, name.as_deref()) {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };
        let verified = self
            .service
            .call(
                AuthRequest::post(paths::VERIFY_REGISTRATION, body)
                    .with_overrides(&opts.fetch_options),
            )
            .await;

        if !has_payload(&verified) {
            warn!(error = ?verified.error, "Registration rejected");
            return verified.cast();
        }

        let version = self.store.list_passkeys.bump();
        self.store.bus.notify(Signal::PasskeyListChanged);
        info!(
            credential_id = %attestation.id,
            list_version = version,
            "Passkey registration verified"
        );
        verified.decode(INVALID_RESPONSE)
    }

    /// Fetch the signed-in user's passkeys. Never touches the change signal.
    #[instrument(level = "debug", skip_all)]
    pub async fn list_user_passkeys(&self) -> ActionOutcome<Vec<Passkey>> {
        fetch_passkeys(self.service.as_ref()).await
    }

    /// Cached passkey list that refetches whenever a registration lands.
    pub fn passkey_list(&self) -> PasskeyListQuery {
        PasskeyListQuery::new(self.service.clone(), self.store.list_passkeys.clone())
    }

    fn ceremony_failed<T>(&self, failure: &CeremonyFailure, phase: CeremonyPhase) -> ActionOutcome<T> {
        warn!(kind = ?failure.kind, phase = ?phase, "Ceremony did not complete");
        ActionOutcome::failure(normalize(failure, phase, self.mode))
    }
}

impl std::fmt::Debug for PasskeyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasskeyClient")
            .field("platform", &self.ceremony.platform())
            .field("mode", &self.mode)
            .field("list_version", &self.store.list_passkeys.version())
            .finish()
    }
}

/// Passkey list bound to a [`ChangeSignal`].
///
/// [`fetch`](Self::fetch) serves the cached list while the signal version
/// is unchanged and refetches once it moves.
pub struct PasskeyListQuery {
    service: Arc<dyn AuthService>,
    signal: ChangeSignal,
    cache: Mutex<Option<(u64, Vec<Passkey>)>>,
}

impl PasskeyListQuery {
    pub fn new(service: Arc<dyn AuthService>, signal: ChangeSignal) -> Self {
        Self {
            service,
            signal,
            cache: Mutex::new(None),
        }
    }

    pub async fn fetch(&self) -> ActionOutcome<Vec<Passkey>> {
        let version = self.signal.version();
        let mut cache = self.cache.lock().await;

        if let Some((cached_version, passkeys)) = cache.as_ref() {
            if *cached_version == version {
                debug!(version, "Serving cached passkey list");
                return ActionOutcome::success(passkeys.clone());
            }
        }

        let outcome = fetch_passkeys(self.service.as_ref()).await;
        if let Some(passkeys) = &outcome.data {
            *cache = Some((version, passkeys.clone()));
        }
        outcome
    }

    /// Whether the next [`fetch`](Self::fetch) will hit the network.
    pub async fn is_stale(&self) -> bool {
        match self.cache.lock().await.as_ref() {
            Some((cached_version, _)) => *cached_version != self.signal.version(),
            None => true,
        }
    }

    /// Drop the cached list so the next fetch hits the network.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

async fn fetch_passkeys(service: &dyn AuthService) -> ActionOutcome<Vec<Passkey>> {
    service
        .call(AuthRequest::get(paths::LIST_USER_PASSKEYS))
        .await
        .decode(INVALID_RESPONSE)
}

fn has_payload(outcome: &ActionOutcome<Value>) -> bool {
    !matches!(outcome.data, None | Some(Value::Null))
}

/// `{response, name?}` verification body.
fn wrap_response<R: serde::Serialize, T>(
    result: &R,
    name: Option<&str>,
) -> std::result::Result<Value, ActionOutcome<T>> {
    let response = serde_json::to_value(result).map_err(|e| {
        ActionOutcome::failure(ActionError::internal(
            "SERIALIZATION_ERROR",
            format!("Failed to serialize ceremony result: {e}"),
        ))
    })?;

    let mut body = Map::new();
    body.insert("response".to_string(), response);
    if let Some(name) = name {
        body.insert("name".to_string(), Value::String(name.to_string()));
    }
    Ok(Value::Object(body))
}

fn unsupported() -> CeremonyFailure {
    CeremonyFailure::unsupported("WebAuthn not supported in this environment")
}

fn mismatched_id() -> CeremonyFailure {
    CeremonyFailure::platform("credential id does not match raw id")
}

trait DataOrFailure<T> {
    /// Split into the payload or the outcome to return unchanged.
    fn data_or_failure<U>(self) -> std::result::Result<T, ActionOutcome<U>>;
}

impl<T> DataOrFailure<T> for ActionOutcome<T> {
    fn data_or_failure<U>(self) -> std::result::Result<T, ActionOutcome<U>> {
        match self.data {
            Some(data) => Ok(data),
            None => Err(ActionOutcome {
                data: None,
                error: self.error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ceremony::{CeremonyPlatform, MockCeremony, UnsupportedCeremony};
    use crate::transport::MockAuthService;
    use serde_json::json;

    #[test]
    fn test_mode_follows_platform() {
        let service = Arc::new(MockAuthService::new());
        let native = PasskeyClient::new(service.clone(), Arc::new(MockCeremony::native()));
        let web = PasskeyClient::new(service, Arc::new(MockCeremony::web()));

        assert_eq!(native.normalizer_mode(), NormalizerMode::Native);
        assert_eq!(web.normalizer_mode(), NormalizerMode::Web);
        assert_eq!(
            web.with_normalizer_mode(NormalizerMode::Native).normalizer_mode(),
            NormalizerMode::Native
        );
    }

    #[tokio::test]
    async fn test_unsupported_environment_fails_before_network() {
        let service = Arc::new(MockAuthService::new());
        let client = PasskeyClient::new(
            service.clone(),
            Arc::new(UnsupportedCeremony::new(CeremonyPlatform::Native)),
        );

        let sign_in = client.sign_in_with_passkey(SignInOptions::default()).await;
        let add = client.add_passkey(AddPasskeyOptions::default()).await;

        assert_eq!(service.call_count(), 0);
        for error in [sign_in.error.unwrap(), add.error.unwrap()] {
            assert!(error.is_cancelled());
            assert_eq!(
                error.message.as_deref(),
                Some("WebAuthn not supported in this environment")
            );
        }
    }

    #[tokio::test]
    async fn test_undecodable_options_skip_ceremony() {
        let service = Arc::new(MockAuthService::new());
        service.push_data(json!({ "unexpected": true }));
        let ceremony = Arc::new(MockCeremony::native());
        let client = PasskeyClient::new(service.clone(), ceremony.clone());

        let outcome = client.sign_in_with_passkey(SignInOptions::default()).await;

        assert_eq!(
            outcome.error.and_then(|e| e.code).as_deref(),
            Some(INVALID_OPTIONS)
        );
        assert_eq!(ceremony.get_count(), 0);
        assert_eq!(service.call_count(), 1);
    }

    #[test]
    fn test_wrap_response_omits_missing_name() {
        let body = wrap_response::<_, ()>(&json!({ "id": "x" }), None).unwrap();
        assert_eq!(body, json!({ "response": { "id": "x" } }));

        let body = wrap_response::<_, ()>(&json!({ "id": "x" }), Some("Work Laptop")).unwrap();
        assert_eq!(body, json!({ "response": { "id": "x" }, "name": "Work Laptop" }));
    }

    #[test]
    fn test_debug_output() {
        let client = PasskeyClient::new(
            Arc::new(MockAuthService::new()),
            Arc::new(MockCeremony::web()),
        );
        let debug = format!("{client:?}");
        assert!(debug.contains("Web"));
    }
}
