//! Integration test utilities for the roomcast gateway
//!
//! Spawns a gateway on an ephemeral port with in-memory storage and the
//! in-process bus, and drives it with real WebSocket clients.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
