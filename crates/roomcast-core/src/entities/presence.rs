//! Presence record - online status of one user

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub user_id: UserId,
    pub online: bool,
    /// Set only when the user goes from online to offline
    pub last_seen: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Presence {
    /// Record for a user that has never connected
    pub fn offline(user_id: UserId) -> Self {
        Self {
            user_id,
            online: false,
            last_seen: None,
            updated_at: Utc::now(),
        }
    }

    /// Apply a transition, returning whether anything changed
    pub fn transition(&mut self, online: bool, now: DateTime<Utc>) -> bool {
        if self.online == online {
            return false;
        }
        if self.online && !online {
            self.last_seen = Some(now);
        }
        self.online = online;
        self.updated_at = now;
        true
    }
}
