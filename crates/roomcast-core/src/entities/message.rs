//! Message entity - one immutable entry in a room's log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageId, RoomId, UserId};

/// Message entity
///
/// `created_at` never decreases within a room and `seq` increases strictly,
/// so `(created_at, seq)` is the room's total order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub seq: i64,
    pub is_read: bool,
}

impl Message {
    /// Sort key within the owning room
    #[inline]
    pub fn order_key(&self) -> (DateTime<Utc>, i64) {
        (self.created_at, self.seq)
    }

    /// Get a truncated preview of the message content
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }
}
