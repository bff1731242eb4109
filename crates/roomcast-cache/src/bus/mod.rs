//! Event fan-out bus.
//!
//! A [`FanoutBus`] delivers every event published on a channel to every
//! session subscribed to that channel, in publish order per publisher. Each
//! session owns a bounded queue; what happens when that queue is full is
//! governed by [`OverflowPolicy`](roomcast_common::OverflowPolicy).

mod local;
mod redis_bus;

use std::sync::Arc;

use async_trait::async_trait;
use roomcast_core::RoomEvent;
use tokio::sync::{mpsc, Notify};

use crate::pool::RedisPoolError;
use crate::pubsub::{PubSubChannel, SubscriberError};

pub use self::local::LocalBus;
pub use self::redis_bus::RedisBus;

/// Error type for bus operations
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisPoolError),

    #[error("Subscriber error: {0}")]
    Subscriber(#[from] SubscriberError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
}

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// The bus side of a live session: its outbound queue and eviction signal.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Arc<str>,
    tx: mpsc::Sender<RoomEvent>,
    evicted: Arc<Notify>,
}

impl SessionHandle {
    /// Create a handle with a bounded queue of `capacity` events.
    ///
    /// The returned receiver is drained by the session's writer task.
    #[must_use]
    pub fn channel(session_id: impl Into<Arc<str>>, capacity: usize) -> (Self, mpsc::Receiver<RoomEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            session_id: session_id.into(),
            tx,
            evicted: Arc::new(Notify::new()),
        };
        (handle, rx)
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Signal the owning session that it was dropped by the bus.
    ///
    /// The permit is stored, so a waiter that starts later still observes it.
    pub fn evict(&self) {
        self.evicted.notify_one();
    }

    /// Eviction signal, awaited by the session's writer task
    #[must_use]
    pub fn eviction(&self) -> Arc<Notify> {
        self.evicted.clone()
    }

    pub(crate) fn try_send(&self, event: RoomEvent) -> Result<(), mpsc::error::TrySendError<RoomEvent>> {
        self.tx.try_send(event)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("capacity", &self.tx.capacity())
            .finish_non_exhaustive()
    }
}

/// Channel-addressed fan-out.
#[async_trait]
pub trait FanoutBus: Send + Sync {
    /// Register a session on a channel. Re-subscribing the same session id
    /// replaces the previous handle.
    async fn subscribe(&self, channel: &PubSubChannel, session: SessionHandle) -> BusResult<()>;

    /// Remove a session from a channel. Returns `false` if it was not subscribed.
    async fn unsubscribe(&self, channel: &PubSubChannel, session_id: &str) -> BusResult<bool>;

    /// Publish an event. The return value is the number of sessions reached
    /// locally, or the number of processes reached for a distributed bus.
    async fn publish(&self, channel: &PubSubChannel, event: &RoomEvent) -> BusResult<usize>;

    /// Sessions currently subscribed to a channel in this process
    fn subscriber_count(&self, channel: &PubSubChannel) -> usize;
}
