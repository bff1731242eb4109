//! # roomcast-service
//!
//! Application layer: the room registry, message store, and presence
//! tracker, wired over the repository ports and the fan-out bus.

pub mod services;

pub use services::{
    MessageStore, PresenceTracker, RoomRegistry, ServiceContext, ServiceContextBuilder,
    ServiceError, ServiceResult,
};
