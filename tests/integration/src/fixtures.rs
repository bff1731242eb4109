//! Seeded users and envelope helpers

use roomcast_core::{User, UserId};
use serde_json::Value;

pub const ALICE: UserId = UserId::new(1);
pub const BOB: UserId = UserId::new(2);
pub const CAROL: UserId = UserId::new(3);

/// Users every test server starts with
pub fn seed_users() -> Vec<User> {
    [(ALICE, "alice"), (BOB, "bob"), (CAROL, "carol")]
        .into_iter()
        .map(|(id, username)| User {
            id,
            username: username.to_string(),
        })
        .collect()
}

/// Whether a frame is a presence notice
pub fn is_presence(frame: &Value) -> bool {
    frame["type"] == "user_status"
}

/// Inbound envelope for `content`
pub fn chat_frame(content: &str) -> String {
    serde_json::json!({ "message": content }).to_string()
}
