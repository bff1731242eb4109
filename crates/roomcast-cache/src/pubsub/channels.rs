//! Pub/Sub channel definitions.
//!
//! Defines the channel naming conventions shared by every bus implementation.

use roomcast_core::RoomId;

/// Channel prefix for room events
pub const ROOM_CHANNEL_PREFIX: &str = "room:";
/// Global presence channel
pub const PRESENCE_CHANNEL: &str = "presence";

/// Pub/Sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Messages of one room
    Room(RoomId),
    /// Online/offline changes of every user
    Presence,
    /// Custom channel name
    Custom(String),
}

impl PubSubChannel {
    #[must_use]
    pub fn room(room_id: RoomId) -> Self {
        Self::Room(room_id)
    }

    #[must_use]
    pub fn presence() -> Self {
        Self::Presence
    }

    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Room(id) => format!("{ROOM_CHANNEL_PREFIX}{id}"),
            Self::Presence => PRESENCE_CHANNEL.to_string(),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a channel name back to a `PubSubChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name == PRESENCE_CHANNEL {
            return Self::Presence;
        }

        if let Some(id_str) = name.strip_prefix(ROOM_CHANNEL_PREFIX) {
            if let Ok(id) = id_str.parse::<RoomId>() {
                return Self::Room(id);
            }
        }

        Self::Custom(name.to_string())
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(PubSubChannel::room(RoomId::new(12345)).name(), "room:12345");
        assert_eq!(PubSubChannel::presence().name(), "presence");
        assert_eq!(PubSubChannel::custom("test").name(), "test");
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!(
            PubSubChannel::parse("room:12345"),
            PubSubChannel::Room(RoomId::new(12345))
        );
        assert_eq!(PubSubChannel::parse("presence"), PubSubChannel::Presence);
        assert_eq!(
            PubSubChannel::parse("room:abc"),
            PubSubChannel::Custom("room:abc".to_string())
        );
    }
}
