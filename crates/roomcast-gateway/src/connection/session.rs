//! Session state
//!
//! A session is one authenticated connection bound to a scope. It is shared
//! as an `Arc` between the tasks driving that connection.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use roomcast_cache::PubSubChannel;
use roomcast_core::{Identity, Room};
use serde::Serialize;

/// Lifecycle of a session
///
/// `Connecting → Authorizing → Joined ⇄ Receiving → Closing → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Authorizing,
    Joined,
    /// Processing an inbound frame
    Receiving,
    Closing,
    Closed,
}

impl SessionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Authorizing => "authorizing",
            Self::Joined => "joined",
            Self::Receiving => "receiving",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }

    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Joined | Self::Receiving)
    }
}

/// What a session is bound to
#[derive(Debug, Clone)]
pub enum SessionScope {
    Room(Room),
    /// Global presence feed only
    Presence,
}

/// A single connection's session
pub struct Session {
    id: Arc<str>,
    identity: Identity,
    scope: SessionScope,
    state: Mutex<SessionState>,
    subscriptions: Mutex<Vec<PubSubChannel>>,
    created_at: Instant,
}

impl Session {
    /// Generate a new session ID
    #[must_use]
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    #[must_use]
    pub fn new(identity: Identity, scope: SessionScope) -> Arc<Self> {
        Arc::new(Self {
            id: Self::generate_id().into(),
            identity,
            scope,
            state: Mutex::new(SessionState::Connecting),
            subscriptions: Mutex::new(Vec::new()),
            created_at: Instant::now(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn shared_id(&self) -> Arc<str> {
        self.id.clone()
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    /// The bound room, for room-scoped sessions
    #[must_use]
    pub fn room(&self) -> Option<&Room> {
        match &self.scope {
            SessionScope::Room(room) => Some(room),
            SessionScope::Presence => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Move forward from `from` to `to`; fails if the session is elsewhere
    pub(crate) fn advance(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.state.lock();
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    /// Start handling an inbound frame. Only a joined session may receive.
    pub(crate) fn begin_receive(&self) -> Result<(), SessionState> {
        let mut state = self.state.lock();
        match *state {
            SessionState::Joined => {
                *state = SessionState::Receiving;
                Ok(())
            }
            other => Err(other),
        }
    }

    pub(crate) fn end_receive(&self) {
        self.advance(SessionState::Receiving, SessionState::Joined);
    }

    /// Enter `Closing`. Returns `false` when a close is already under way or done.
    pub(crate) fn begin_close(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            SessionState::Closing | SessionState::Closed => false,
            _ => {
                *state = SessionState::Closing;
                true
            }
        }
    }

    pub(crate) fn mark_closed(&self) {
        *self.state.lock() = SessionState::Closed;
    }

    pub(crate) fn add_subscription(&self, channel: PubSubChannel) {
        self.subscriptions.lock().push(channel);
    }

    /// Take every subscription, leaving none behind
    pub(crate) fn take_subscriptions(&self) -> Vec<PubSubChannel> {
        std::mem::take(&mut *self.subscriptions.lock())
    }

    #[must_use]
    pub fn subscriptions(&self) -> Vec<PubSubChannel> {
        self.subscriptions.lock().clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.identity.user_id)
            .field("room_id", &self.room().map(|r| r.id))
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
