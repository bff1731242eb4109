//! Redis Pub/Sub publisher.
//!
//! Publishes room events as JSON to Redis channels.

use redis::AsyncCommands;
use roomcast_core::RoomEvent;

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::PubSubChannel;

/// Redis Pub/Sub publisher
#[derive(Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event to a channel, returning the number of Redis subscribers reached
    pub async fn publish(&self, channel: &PubSubChannel, event: &RoomEvent) -> RedisResult<u32> {
        let payload = serde_json::to_string(event)?;
        let receivers = self.publish_raw(channel, &payload).await?;

        tracing::debug!(
            channel = %channel,
            event_type = event.event_type(),
            receivers = receivers,
            "Published event"
        );

        Ok(receivers)
    }

    /// Publish a raw message to a channel
    pub async fn publish_raw(&self, channel: &PubSubChannel, message: &str) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let receivers: u32 = conn.publish(channel.name(), message).await?;
        Ok(receivers)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").field("pool", &self.pool).finish()
    }
}
