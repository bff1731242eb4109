//! Room events - the closed set of events carried over the fan-out bus
//!
//! Events are serialized as internally tagged JSON so they can cross process
//! boundaries through Redis. The client-facing wire envelopes are produced
//! separately by the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Identity, Message, Presence};
use crate::value_objects::{MessageId, RoomId, UserId};

/// All events delivered to sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    RoomMessage(RoomMessageEvent),
    PresenceChange(PresenceChangeEvent),
}

impl RoomEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RoomMessage(_) => "room_message",
            Self::PresenceChange(_) => "presence_change",
        }
    }

    /// Room the event belongs to, if it is room-scoped
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            Self::RoomMessage(e) => Some(e.room_id),
            Self::PresenceChange(_) => None,
        }
    }
}

/// A message persisted in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMessageEvent {
    pub room_id: RoomId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl RoomMessageEvent {
    pub fn from_message(message: &Message, author: &Identity) -> Self {
        Self {
            room_id: message.room_id,
            message_id: message.id,
            user_id: message.author_id,
            username: author.display_name.clone(),
            content: message.content.clone(),
            timestamp: message.created_at,
        }
    }
}

/// A user went online or offline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChangeEvent {
    pub user_id: UserId,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<&Presence> for PresenceChangeEvent {
    fn from(presence: &Presence) -> Self {
        Self {
            user_id: presence.user_id,
            online: presence.online,
            last_seen: presence.last_seen,
        }
    }
}
