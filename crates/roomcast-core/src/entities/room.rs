//! Room entity - a named conversation with a member set

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Message;
use crate::value_objects::{RoomId, RoomName};

/// Room entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: RoomName,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(id: RoomId, name: RoomName) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A room together with its latest message, as shown in room listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room: Room,
    pub last_message: Option<Message>,
}
