//! User entity and the authenticated identity bound to a session

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// User as known to this service
///
/// Accounts are owned by an external service; only the id and the display
/// name are read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// The identity a connection was authenticated as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: String,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            display_name: user.username,
        }
    }
}
