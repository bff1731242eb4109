//! JSON envelopes exchanged with clients.
//!
//! Inbound: `{"message": "<text>"}`.
//! Outbound room message: `{"message", "username", "user_id"}`.
//! Outbound presence: `{"type": "user_status", "user_id", "status"}` where
//! `status` is `"online"` or `false`.

use roomcast_core::{DomainError, RoomEvent};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

/// Client to server envelope
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InboundMessage {
    #[validate(length(min = 1))]
    pub message: String,
}

impl InboundMessage {
    /// Parse and validate a text frame; `None` when it is not a usable envelope
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let inbound: Self = serde_json::from_str(raw).ok()?;
        inbound.validate().ok()?;
        Some(inbound)
    }
}

/// Encode an event into its client envelope
#[must_use]
pub fn encode_event(event: &RoomEvent) -> String {
    let value = match event {
        RoomEvent::RoomMessage(msg) => json!({
            "message": msg.content,
            "username": msg.username,
            "user_id": msg.user_id,
        }),
        RoomEvent::PresenceChange(change) => json!({
            "type": "user_status",
            "user_id": change.user_id,
            "status": if change.online { Value::from("online") } else { Value::Bool(false) },
        }),
    };
    value.to_string()
}

/// Rejection notice sent to the sender only
#[must_use]
pub fn rejection_frame(error: &DomainError) -> String {
    json!({
        "type": "error",
        "code": error.code(),
        "message": error.to_string(),
    })
    .to_string()
}
