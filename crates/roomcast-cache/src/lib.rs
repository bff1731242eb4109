//! # roomcast-cache
//!
//! Event fan-out for room and presence channels.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Pub/Sub**: Channel naming, a publisher, and a reconnecting subscriber
//! - **Fan-out Bus**: [`FanoutBus`] with an in-process [`LocalBus`] and a
//!   Redis-backed [`RedisBus`] for multi-process deployments
//!
//! ## Example
//!
//! ```ignore
//! use roomcast_cache::{FanoutBus, LocalBus, PubSubChannel, SessionHandle};
//!
//! let bus = LocalBus::new(OverflowPolicy::Disconnect);
//! let (handle, mut events) = SessionHandle::channel("session-1", 256);
//! bus.subscribe(&PubSubChannel::room(room_id), handle).await?;
//! bus.publish(&PubSubChannel::room(room_id), &event).await?;
//! ```

pub mod bus;
pub mod pool;
pub mod pubsub;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export pubsub types
pub use pubsub::{
    PubSubChannel, Publisher, ReceivedMessage, Subscriber, SubscriberConfig,
    SubscriberError, SubscriberResult, PRESENCE_CHANNEL, ROOM_CHANNEL_PREFIX,
};

// Re-export bus types
pub use bus::{BusError, BusResult, FanoutBus, LocalBus, RedisBus, SessionHandle};
pub use roomcast_common::OverflowPolicy;
