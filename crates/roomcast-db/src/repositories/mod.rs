//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in roomcast-core.

mod error;
mod message;
mod presence;
mod room;
mod user;

pub use message::PgMessageRepository;
pub use presence::PgPresenceRepository;
pub use room::PgRoomRepository;
pub use user::PgUserRepository;
