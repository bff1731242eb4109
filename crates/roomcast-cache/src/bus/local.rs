//! In-process fan-out bus.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use roomcast_common::OverflowPolicy;
use roomcast_core::RoomEvent;
use tokio::sync::mpsc::error::TrySendError;

use super::{BusResult, FanoutBus, SessionHandle};
use crate::pubsub::PubSubChannel;

/// Fan-out within a single process.
///
/// Delivery to one channel runs under that channel's lock, so concurrent
/// publishers to the same channel are totally ordered for every subscriber.
#[derive(Debug)]
pub struct LocalBus {
    channels: DashMap<PubSubChannel, Mutex<Vec<SessionHandle>>>,
    policy: OverflowPolicy,
}

impl LocalBus {
    #[must_use]
    pub fn new(policy: OverflowPolicy) -> Self {
        Self {
            channels: DashMap::new(),
            policy,
        }
    }

    #[must_use]
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Add a handle; returns `true` if the channel had no subscribers before.
    ///
    /// Replacing the handle of an already attached session id is not a first
    /// subscription, even when that session was the only one.
    pub(crate) fn attach(&self, channel: &PubSubChannel, session: SessionHandle) -> bool {
        let entry = self
            .channels
            .entry(channel.clone())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let mut sessions = entry.lock();
        let first = sessions.is_empty();
        sessions.retain(|s| s.session_id() != session.session_id());
        sessions.push(session);
        first
    }

    /// Remove a handle; returns `(removed, channel_now_empty)`.
    pub(crate) fn detach(&self, channel: &PubSubChannel, session_id: &str) -> (bool, bool) {
        let removed = match self.channels.get(channel) {
            Some(entry) => {
                let mut sessions = entry.lock();
                let before = sessions.len();
                sessions.retain(|s| s.session_id() != session_id);
                sessions.len() != before
            }
            None => return (false, false),
        };

        let emptied = self
            .channels
            .remove_if(channel, |_, sessions| sessions.lock().is_empty())
            .is_some();

        (removed, emptied)
    }

    /// Push an event to every local subscriber of `channel`.
    pub(crate) fn deliver(&self, channel: &PubSubChannel, event: &RoomEvent) -> usize {
        let Some(entry) = self.channels.get(channel) else {
            return 0;
        };

        let policy = self.policy;
        let mut delivered = 0;
        let mut sessions = entry.lock();
        sessions.retain(|session| match session.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => match policy {
                OverflowPolicy::DropEvent => {
                    tracing::warn!(
                        channel = %channel,
                        session_id = session.session_id(),
                        "Subscriber queue full, event dropped"
                    );
                    true
                }
                OverflowPolicy::Disconnect => {
                    tracing::warn!(
                        channel = %channel,
                        session_id = session.session_id(),
                        "Subscriber queue full, evicting session"
                    );
                    session.evict();
                    false
                }
            },
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(
                    channel = %channel,
                    session_id = session.session_id(),
                    "Subscriber queue closed, removing"
                );
                false
            }
        });

        delivered
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(OverflowPolicy::default())
    }
}

#[async_trait]
impl FanoutBus for LocalBus {
    async fn subscribe(&self, channel: &PubSubChannel, session: SessionHandle) -> BusResult<()> {
        self.attach(channel, session);
        Ok(())
    }

    async fn unsubscribe(&self, channel: &PubSubChannel, session_id: &str) -> BusResult<bool> {
        Ok(self.detach(channel, session_id).0)
    }

    async fn publish(&self, channel: &PubSubChannel, event: &RoomEvent) -> BusResult<usize> {
        Ok(self.deliver(channel, event))
    }

    fn subscriber_count(&self, channel: &PubSubChannel) -> usize {
        self.channels
            .get(channel)
            .map_or(0, |sessions| sessions.lock().len())
    }
}
