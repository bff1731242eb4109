//! Database models - SQLx-compatible structs for PostgreSQL tables

mod message;
mod presence;
mod room;
mod user;

pub use message::MessageModel;
pub use presence::PresenceModel;
pub use room::{RoomModel, RoomUpsertModel};
pub use user::UserModel;
