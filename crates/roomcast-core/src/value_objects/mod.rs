//! Value objects - immutable types that represent domain concepts

mod ids;
mod room_name;

pub use ids::{IdParseError, MessageId, RoomId, UserId};
pub use room_name::{RoomName, MAX_ROOM_NAME_LENGTH};

/// Maximum message content length in characters
pub const MAX_CONTENT_LENGTH: usize = 4000;
