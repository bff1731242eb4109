//! # roomcast-gateway
//!
//! WebSocket gateway: authenticates connections, binds each to a room or to
//! the global presence feed, persists inbound messages, and pushes fan-out
//! events to clients.

pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use connection::{ConnectScope, Connected, ConnectionManager, Session, SessionScope, SessionState};
pub use handlers::{Authenticator, HandlerError, HandlerResult, JwtAuthenticator};
pub use server::{create_app, create_gateway_state, run, run_server, GatewayState};
