//! Room name - the stable key used in connection routing

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Maximum room name length in characters
pub const MAX_ROOM_NAME_LENGTH: usize = 255;

/// A validated room key
///
/// Names are trimmed, must not be empty, and may hold at most
/// [`MAX_ROOM_NAME_LENGTH`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName(String);

impl RoomName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidRoomName(
                "room name must not be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > MAX_ROOM_NAME_LENGTH {
            return Err(DomainError::InvalidRoomName(format!(
                "room name exceeds {MAX_ROOM_NAME_LENGTH} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomName> for String {
    fn from(name: RoomName) -> Self {
        name.0
    }
}
