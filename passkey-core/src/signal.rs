//! Reactive state shared between the client and UI bindings.
//!
//! - [`ChangeSignal`] - versioned cell bumped when the set of registered
//!   passkeys changes; dependent queries refetch when the version moves.
//! - [`SignalBus`] - named notifications (`$sessionSignal`, ...) fanned out
//!   to any number of subscribers.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Capacity of the notification channel. Slow subscribers that fall behind
/// get `RecvError::Lagged` and should resync from current state.
const BUS_CAPACITY: usize = 32;

/// Named notification understood by the host's reactive layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The session changed (sign-in completed).
    SessionChanged,
    /// The registered passkey list changed.
    PasskeyListChanged,
}

impl Signal {
    /// Store key used by better-auth clients.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionChanged => "$sessionSignal",
            Self::PasskeyListChanged => "$listPasskeys",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Versioned change-detection cell.
///
/// The value is opaque: readers only compare it with a version they saw
/// earlier. Clones share the same cell.
#[derive(Debug, Clone)]
pub struct ChangeSignal {
    sender: Arc<watch::Sender<u64>>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        *self.sender.borrow()
    }

    /// Move to a new, distinct version and wake subscribers. Returns the
    /// new version.
    pub fn bump(&self) -> u64 {
        let mut next = 0;
        self.sender.send_modify(|version| {
            *version = version.wrapping_add(1);
            next = *version;
        });
        debug!(version = next, "Change signal bumped");
        next
    }

    /// Receiver that resolves `changed()` on every bump.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }
}

impl Default for ChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Publish/subscribe channel for [`Signal`]s.
#[derive(Debug, Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<Signal>,
}

impl SignalBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Fire a notification. Having no subscribers is not an error.
    pub fn notify(&self, signal: Signal) {
        let receivers = self.sender.send(signal).unwrap_or(0);
        debug!(signal = %signal, receivers, "Signal emitted");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.sender.subscribe()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Reactive state owned by one client instance.
#[derive(Debug, Clone, Default)]
pub struct PasskeyStore {
    /// Bumped after every server-verified registration.
    pub list_passkeys: ChangeSignal,
    pub bus: SignalBus,
}

impl PasskeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}
