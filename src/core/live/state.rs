//! Lifecycle state of a live session.
//!
//! ```text
//! Idle ──start()──▶ Connecting ──handshake ok──▶ Open ──send_stop()──▶ Stopping
//!                        │                         │                      │
//!                        └──handshake failed──▶ Closed ◀──close/error/drop─┘
//! ```
//!
//! The state is shared between the caller and the receive task, so it lives in
//! a `tokio::sync::watch` channel: transitions are compare-and-set and waiters
//! are woken on every change.

use std::fmt;
use tokio::sync::watch;

/// Lifecycle state of a [`LiveSession`](super::LiveSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Constructed, not yet connected
    #[default]
    Idle,
    /// WebSocket handshake in flight
    Connecting,
    /// Receive task running, audio may be sent
    Open,
    /// Stop frame sent, still receiving trailing events
    Stopping,
    /// Terminal
    Closed,
}

impl SessionState {
    /// Whether the receive task may be running in this state.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Open | SessionState::Stopping)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Open => write!(f, "Open"),
            SessionState::Stopping => write!(f, "Stopping"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

/// Shared, watchable session state.
#[derive(Debug)]
pub(crate) struct StateCell {
    tx: watch::Sender<SessionState>,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Idle);
        Self { tx }
    }

    #[inline]
    pub(crate) fn get(&self) -> SessionState {
        *self.tx.borrow()
    }

    /// Move to `to` only when the current state is one of `from`.
    pub(crate) fn transition(&self, from: &[SessionState], to: SessionState) -> bool {
        self.tx.send_if_modified(|state| {
            if from.contains(state) {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Move to `Closed` from any state. Returns false when already closed.
    pub(crate) fn close(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if state.is_closed() {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        })
    }

    /// Resolve once the state is `Closed`.
    pub(crate) async fn wait_closed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once closed.
        let _ = rx.wait_for(SessionState::is_closed).await;
    }
}
