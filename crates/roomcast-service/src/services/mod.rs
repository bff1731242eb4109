//! Services
//!
//! Each service borrows a [`ServiceContext`] and is cheap to construct per call.

pub mod context;
pub mod error;
pub mod message;
pub mod presence;
pub mod room;

pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use message::MessageStore;
pub use presence::PresenceTracker;
pub use room::RoomRegistry;
