//! Mock auth service for testing.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{AuthRequest, AuthService};
use crate::outcome::{ActionError, ActionOutcome};

/// Scripted auth service.
///
/// Responses are served in the order they were pushed, regardless of path.
/// Running out of responses yields a 500 error outcome so a test that makes
/// an unexpected call fails visibly instead of hanging.
#[derive(Default)]
pub struct MockAuthService {
    responses: Mutex<VecDeque<ActionOutcome<Value>>>,
    requests: Mutex<Vec<AuthRequest>>,
}

impl MockAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome for the next call.
    pub fn push(&self, outcome: ActionOutcome<Value>) -> &Self {
        lock(&self.responses).push_back(outcome);
        self
    }

    pub fn push_data(&self, data: Value) -> &Self {
        self.push(ActionOutcome::success(data))
    }

    pub fn push_error(&self, error: ActionError) -> &Self {
        self.push(ActionOutcome::failure(error))
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<AuthRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Paths requested so far, in order.
    pub fn paths(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|r| r.path.clone()).collect()
    }
}

#[async_trait]
impl AuthService for MockAuthService {
    async fn call(&self, request: AuthRequest) -> ActionOutcome<Value> {
        let path = request.path.clone();
        lock(&self.requests).push(request);
        let next = lock(&self.responses).pop_front();
        next.unwrap_or_else(|| {
            ActionOutcome::failure(ActionError::internal(
                "UNEXPECTED_REQUEST",
                format!("No scripted response for {path}"),
            ))
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
