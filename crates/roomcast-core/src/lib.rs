//! # roomcast-core
//!
//! Domain layer containing entities, value objects, repository traits, and room events.
//! This crate has no dependency on infrastructure (database, bus, web framework).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Identity, Message, Presence, Room, RoomSummary, User};
pub use error::DomainError;
pub use events::{PresenceChangeEvent, RoomEvent, RoomMessageEvent};
pub use traits::{
    MessageRepository, PresenceRepository, RepoResult, RoomRepository, UserRepository,
};
pub use value_objects::{
    IdParseError, MessageId, RoomId, RoomName, UserId, MAX_CONTENT_LENGTH, MAX_ROOM_NAME_LENGTH,
};
