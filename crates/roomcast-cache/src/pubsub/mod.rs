//! Redis Pub/Sub module.

mod channels;
mod publisher;
mod subscriber;

pub use channels::{PubSubChannel, PRESENCE_CHANNEL, ROOM_CHANNEL_PREFIX};
pub use publisher::Publisher;
pub use subscriber::{
    ReceivedMessage, Subscriber, SubscriberConfig, SubscriberError,
    SubscriberResult,
};
