//! Mock ceremony provider for testing.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;

use super::{CeremonyFailure, CeremonyPlatform, CeremonyProvider, CreateRequest, GetRequest};
use crate::encoding;
use crate::types::{
    AssertionResponse, AttestationResponse, AuthenticationResult, RegistrationResult,
};

/// A ceremony invocation recorded by [`MockCeremony`].
#[derive(Debug, Clone, PartialEq)]
pub enum CeremonyCall {
    Create(CreateRequest),
    Get(GetRequest),
}

/// Scripted ceremony provider.
///
/// Queued outcomes are returned in order; once a queue is empty the mock
/// approves every ceremony with a deterministic credential whose client
/// data echoes the requested challenge.
/// WARNING: Do not use in production - nothing is signed!
pub struct MockCeremony {
    platform: CeremonyPlatform,
    credential_id: Vec<u8>,
    registrations: Mutex<VecDeque<Result<RegistrationResult, CeremonyFailure>>>,
    assertions: Mutex<VecDeque<Result<AuthenticationResult, CeremonyFailure>>>,
    calls: Mutex<Vec<CeremonyCall>>,
}

impl MockCeremony {
    pub fn new(platform: CeremonyPlatform) -> Self {
        Self {
            platform,
            credential_id: b"mock-credential-id".to_vec(),
            registrations: Mutex::new(VecDeque::new()),
            assertions: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock standing in for a native credential manager.
    pub fn native() -> Self {
        Self::new(CeremonyPlatform::Native)
    }

    /// Mock standing in for the browser WebAuthn API.
    pub fn web() -> Self {
        Self::new(CeremonyPlatform::Web)
    }

    /// Credential id used for auto-approved ceremonies.
    pub fn with_credential_id(mut self, credential_id: impl Into<Vec<u8>>) -> Self {
        self.credential_id = credential_id.into();
        self
    }

    pub fn push_registration(&self, result: Result<RegistrationResult, CeremonyFailure>) {
        lock(&self.registrations).push_back(result);
    }

    pub fn push_assertion(&self, result: Result<AuthenticationResult, CeremonyFailure>) {
        lock(&self.assertions).push_back(result);
    }

    /// Every ceremony invocation so far, in order.
    pub fn calls(&self) -> Vec<CeremonyCall> {
        lock(&self.calls).clone()
    }

    pub fn create_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, CeremonyCall::Create(_)))
            .count()
    }

    pub fn get_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, CeremonyCall::Get(_)))
            .count()
    }

    fn client_data(kind: &str, challenge: &[u8], rp_id: Option<&str>) -> Vec<u8> {
        json!({
            "type": kind,
            "challenge": encoding::encode(challenge),
            "origin": format!("https://{}", rp_id.unwrap_or("localhost")),
        })
        .to_string()
        .into_bytes()
    }

    fn approve_registration(&self, request: &CreateRequest) -> RegistrationResult {
        let client_data = Self::client_data(
            "webauthn.create",
            request.options.challenge.as_bytes(),
            request.options.rp.id.as_deref(),
        );
        RegistrationResult::new(
            self.credential_id.clone(),
            AttestationResponse::new(client_data, b"mock-attestation-object".to_vec(), None),
        )
    }

    fn approve_assertion(&self, request: &GetRequest) -> AuthenticationResult {
        let client_data = Self::client_data(
            "webauthn.get",
            request.options.challenge.as_bytes(),
            request.options.rp_id.as_deref(),
        );
        AuthenticationResult::new(
            self.credential_id.clone(),
            AssertionResponse {
                client_data_json: client_data.into(),
                authenticator_data: b"mock-authenticator-data".to_vec().into(),
                signature: b"mock-signature".to_vec().into(),
                user_handle: None,
            },
        )
    }
}

impl Default for MockCeremony {
    fn default() -> Self {
        Self::native()
    }
}

#[async_trait]
impl CeremonyProvider for MockCeremony {
    async fn create_credential(
        &self,
        request: CreateRequest,
    ) -> Result<RegistrationResult, CeremonyFailure> {
        lock(&self.calls).push(CeremonyCall::Create(request.clone()));
        let scripted = lock(&self.registrations).pop_front();
        scripted.unwrap_or_else(|| Ok(self.approve_registration(&request)))
    }

    async fn get_credential(
        &self,
        request: GetRequest,
    ) -> Result<AuthenticationResult, CeremonyFailure> {
        lock(&self.calls).push(CeremonyCall::Get(request.clone()));
        let scripted = lock(&self.assertions).pop_front();
        scripted.unwrap_or_else(|| Ok(self.approve_assertion(&request)))
    }

    fn platform(&self) -> CeremonyPlatform {
        self.platform
    }
}

/// A poisoned lock only means another test thread panicked; the data is
/// still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
