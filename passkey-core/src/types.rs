//! WebAuthn JSON data model exchanged with the auth service and the
//! ceremony provider.
//!
//! Field names follow the WebAuthn Level 3 JSON serialization
//! (`PublicKeyCredentialCreationOptionsJSON`, `RegistrationResponseJSON`
//! and friends). Binary fields are [`Base64UrlBytes`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::encoding::{self, Base64UrlBytes};

/// The only credential type WebAuthn defines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialType {
    #[default]
    #[serde(rename = "public-key")]
    PublicKey,
}

/// Authenticator transport hint. Unknown values are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthenticatorTransport {
    Usb,
    Nfc,
    Ble,
    SmartCard,
    Hybrid,
    Internal,
    Other(String),
}

impl AuthenticatorTransport {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Usb => "usb",
            Self::Nfc => "nfc",
            Self::Ble => "ble",
            Self::SmartCard => "smart-card",
            Self::Hybrid => "hybrid",
            Self::Internal => "internal",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for AuthenticatorTransport {
    fn from(value: String) -> Self {
        match value.as_str() {
            "usb" => Self::Usb,
            "nfc" => Self::Nfc,
            "ble" => Self::Ble,
            "smart-card" => Self::SmartCard,
            "hybrid" => Self::Hybrid,
            "internal" => Self::Internal,
            _ => Self::Other(value),
        }
    }
}

impl From<AuthenticatorTransport> for String {
    fn from(value: AuthenticatorTransport) -> Self {
        match value {
            AuthenticatorTransport::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AuthenticatorTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform authenticators are always locally attached, so a provider that
/// cannot report transports gets `["internal"]`.
pub fn default_transports() -> Vec<AuthenticatorTransport> {
    vec![AuthenticatorTransport::Internal]
}

/// Where the authenticator lives relative to the client device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    Platform,
    CrossPlatform,
}

impl AuthenticatorAttachment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::CrossPlatform => "cross-platform",
        }
    }
}

impl fmt::Display for AuthenticatorAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthenticatorAttachment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "platform" => Ok(Self::Platform),
            "cross-platform" => Ok(Self::CrossPlatform),
            other => Err(format!(
                "unknown authenticator attachment '{other}' (expected platform or cross-platform)"
            )),
        }
    }
}

// =============================================================================
// Options issued by the auth service
// =============================================================================

/// Relying party identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

/// User account the credential is created for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub id: Base64UrlBytes,
    pub name: String,
    pub display_name: String,
}

/// Accepted public key algorithm (COSE identifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialParameter {
    #[serde(rename = "type")]
    pub type_: CredentialType,
    pub alg: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub type_: CredentialType,
    pub id: Base64UrlBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,
}

/// Registration options (`PublicKeyCredentialCreationOptionsJSON`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOptions {
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub challenge: Base64UrlBytes,
    #[serde(default)]
    pub pub_key_cred_params: Vec<CredentialParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_credentials: Option<Vec<CredentialDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Authentication options (`PublicKeyCredentialRequestOptionsJSON`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub challenge: Base64UrlBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<CredentialDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

// =============================================================================
// Ceremony results submitted for verification
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,
    pub attestation_object: Base64UrlBytes,
    #[serde(default = "default_transports")]
    pub transports: Vec<AuthenticatorTransport>,
}

impl AttestationResponse {
    /// Build a response, defaulting unreported (or empty) transports.
    pub fn new(
        client_data_json: impl Into<Base64UrlBytes>,
        attestation_object: impl Into<Base64UrlBytes>,
        transports: Option<Vec<AuthenticatorTransport>>,
    ) -> Self {
        Self {
            client_data_json: client_data_json.into(),
            attestation_object: attestation_object.into(),
            transports: transports
                .filter(|t| !t.is_empty())
                .unwrap_or_else(default_transports),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,
    pub authenticator_data: Base64UrlBytes,
    pub signature: Base64UrlBytes,
    /// Present only for discoverable credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<Base64UrlBytes>,
}

/// Result of the "create credential" ceremony (`RegistrationResponseJSON`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub id: String,
    pub raw_id: Base64UrlBytes,
    #[serde(rename = "type", default)]
    pub type_: CredentialType,
    pub response: AttestationResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_extension_results: Option<Value>,
}

impl RegistrationResult {
    /// Build a result whose `id` and `rawId` come from the same bytes.
    pub fn new(credential_id: impl Into<Base64UrlBytes>, response: AttestationResponse) -> Self {
        let raw_id = credential_id.into();
        Self {
            id: raw_id.encoded(),
            raw_id,
            type_: CredentialType::PublicKey,
            response,
            authenticator_attachment: None,
            client_extension_results: None,
        }
    }

    pub fn has_consistent_id(&self) -> bool {
        ids_match(&self.id, &self.raw_id)
    }
}

/// Result of the "get credential" ceremony (`AuthenticationResponseJSON`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    pub id: String,
    pub raw_id: Base64UrlBytes,
    #[serde(rename = "type", default)]
    pub type_: CredentialType,
    pub response: AssertionResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_extension_results: Option<Value>,
}

impl AuthenticationResult {
    /// Build a result whose `id` and `rawId` come from the same bytes.
    pub fn new(credential_id: impl Into<Base64UrlBytes>, response: AssertionResponse) -> Self {
        let raw_id = credential_id.into();
        Self {
            id: raw_id.encoded(),
            raw_id,
            type_: CredentialType::PublicKey,
            response,
            authenticator_attachment: None,
            client_extension_results: None,
        }
    }

    pub fn has_consistent_id(&self) -> bool {
        ids_match(&self.id, &self.raw_id)
    }
}

/// `id` must decode to the same bytes as `rawId`.
fn ids_match(id: &str, raw_id: &Base64UrlBytes) -> bool {
    encoding::decode(id)
        .map(|bytes| bytes == raw_id.as_bytes())
        .unwrap_or(false)
}

// =============================================================================
// Verified payloads returned by the auth service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of a successful `/passkey/verify-authentication`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInData {
    pub session: Session,
    pub user: User,
}

/// Server-side record of a registered passkey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passkey {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "credentialID")]
    pub credential_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backed_up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of a successful `/passkey/verify-registration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredPasskey {
    pub passkey: Passkey,
}
