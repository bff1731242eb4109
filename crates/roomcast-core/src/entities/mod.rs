//! Domain entities

mod message;
mod presence;
mod room;
mod user;

pub use message::Message;
pub use presence::Presence;
pub use room::{Room, RoomSummary};
pub use user::{Identity, User};
