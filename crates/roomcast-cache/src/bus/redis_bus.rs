//! Redis-backed fan-out bus for multi-process deployments.
//!
//! Publishing goes to Redis only. Every process holds one Redis
//! subscription per channel that has at least one local session, and a relay
//! task hands received events to the in-process [`LocalBus`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use roomcast_common::OverflowPolicy;
use roomcast_core::RoomEvent;
use tokio::sync::{broadcast, Mutex};

use super::{BusError, BusResult, FanoutBus, LocalBus, SessionHandle};
use crate::pool::RedisPool;
use crate::pubsub::{PubSubChannel, Publisher, ReceivedMessage, Subscriber, SubscriberConfig};

const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fan-out across processes through Redis Pub/Sub
pub struct RedisBus {
    local: Arc<LocalBus>,
    publisher: Publisher,
    subscriber: Subscriber,
    /// Serializes first-subscriber and last-subscriber transitions
    transitions: Mutex<()>,
}

impl RedisBus {
    /// Connect the bus and start relaying Redis messages to local sessions.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(pool: RedisPool, subscriber: SubscriberConfig, policy: OverflowPolicy) -> Arc<Self> {
        let subscriber = Subscriber::new(subscriber);
        let receiver = subscriber.receiver();
        let local = Arc::new(LocalBus::new(policy));

        tokio::spawn(Self::relay(receiver, local.clone()));

        Arc::new(Self {
            local,
            publisher: Publisher::new(pool),
            subscriber,
            transitions: Mutex::new(()),
        })
    }

    async fn relay(mut receiver: broadcast::Receiver<ReceivedMessage>, local: Arc<LocalBus>) {
        loop {
            match receiver.recv().await {
                Ok(msg) => match msg.event {
                    Some(event) => {
                        local.deliver(&msg.channel, &event);
                    }
                    None => {
                        tracing::warn!(channel = %msg.channel, "Discarding undecodable bus payload");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Bus relay lagged behind Redis");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Bus relay stopped");
                    break;
                }
            }
        }
    }

    /// Stop the Redis subscriber
    pub async fn shutdown(&self) -> BusResult<()> {
        self.subscriber.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl FanoutBus for RedisBus {
    async fn subscribe(&self, channel: &PubSubChannel, session: SessionHandle) -> BusResult<()> {
        let _guard = self.transitions.lock().await;
        let session_id = session.session_id().to_string();

        if self.local.attach(channel, session) {
            let outcome = tokio::time::timeout(
                SUBSCRIBE_TIMEOUT,
                self.subscriber.subscribe(std::slice::from_ref(channel)),
            )
            .await;

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(BusError::Subscriber(e)),
                Err(_) => Some(BusError::Timeout("redis subscribe")),
            };

            if let Some(error) = failure {
                self.local.detach(channel, &session_id);
                tracing::error!(channel = %channel, error = %error, "Redis subscribe failed");
                return Err(error);
            }
        }

        Ok(())
    }

    async fn unsubscribe(&self, channel: &PubSubChannel, session_id: &str) -> BusResult<bool> {
        let _guard = self.transitions.lock().await;
        let (removed, emptied) = self.local.detach(channel, session_id);

        if emptied {
            match tokio::time::timeout(
                SUBSCRIBE_TIMEOUT,
                self.subscriber.unsubscribe(std::slice::from_ref(channel)),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(channel = %channel, error = %e, "Redis unsubscribe failed");
                }
                Err(_) => {
                    tracing::warn!(channel = %channel, "Redis unsubscribe timed out");
                }
            }
        }

        Ok(removed)
    }

    async fn publish(&self, channel: &PubSubChannel, event: &RoomEvent) -> BusResult<usize> {
        let receivers = self.publisher.publish(channel, event).await?;
        Ok(receivers as usize)
    }

    fn subscriber_count(&self, channel: &PubSubChannel) -> usize {
        self.local.subscriber_count(channel)
    }
}

impl std::fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBus")
            .field("policy", &self.local.policy())
            .field("subscriber", &self.subscriber)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use roomcast_core::{PresenceChangeEvent, RoomId, UserId};

    use super::*;
    use crate::pool::RedisPoolConfig;

    fn redis_url() -> Option<String> {
        std::env::var("REDIS_URL").ok()
    }

    fn spawn_bus(url: &str) -> Arc<RedisBus> {
        let pool = RedisPool::new(RedisPoolConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .unwrap();
        let config = SubscriberConfig {
            redis_url: url.to_string(),
            ..Default::default()
        };
        RedisBus::spawn(pool, config, OverflowPolicy::Disconnect)
    }

    fn event(user: i64) -> RoomEvent {
        RoomEvent::PresenceChange(PresenceChangeEvent {
            user_id: UserId::new(user),
            online: true,
            last_seen: None,
        })
    }

    #[tokio::test]
    async fn test_subscribe_timeout_rolls_back_local_handle() {
        let bus = spawn_bus("redis://127.0.0.1:1");
        let channel = PubSubChannel::room(RoomId::new(7));
        let (handle, _events) = SessionHandle::channel("s1", 4);

        let err = bus.subscribe(&channel, handle).await.unwrap_err();
        assert!(matches!(err, BusError::Timeout(_)));
        assert_eq!(bus.subscriber_count(&channel), 0);
        assert!(bus.subscriber.subscribed_channels().await.is_empty());
    }

    #[tokio::test]
    async fn test_events_cross_processes() {
        let Some(url) = redis_url() else {
            eprintln!("REDIS_URL not set, skipping");
            return;
        };

        let node_a = spawn_bus(&url);
        let node_b = spawn_bus(&url);
        let channel = PubSubChannel::room(RoomId::new(
            chrono::Utc::now().timestamp_micros(),
        ));

        let (handle, mut events) = SessionHandle::channel("listener", 16);
        node_b.subscribe(&channel, handle).await.unwrap();
        assert_eq!(node_b.subscriber_count(&channel), 1);

        for i in 0..3 {
            node_a.publish(&channel, &event(i)).await.unwrap();
        }

        for i in 0..3 {
            let received = tokio::time::timeout(Duration::from_secs(2), events.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(received, event(i));
        }

        assert!(node_b.unsubscribe(&channel, "listener").await.unwrap());
        assert_eq!(node_b.subscriber_count(&channel), 0);
    }
}
