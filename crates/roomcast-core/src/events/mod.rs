//! Events carried over the fan-out bus

mod room_event;

pub use room_event::{PresenceChangeEvent, RoomEvent, RoomMessageEvent};
