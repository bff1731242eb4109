//! Connection management
//!
//! Sessions, the per-key async locks that order room writes and presence
//! transitions, the transport seam, and the [`ConnectionManager`] that ties
//! them to the services.

mod locks;
mod manager;
mod session;
mod transport;

pub use locks::KeyedLocks;
pub use manager::{ConnectScope, Connected, ConnectionManager};
pub use session::{Session, SessionScope, SessionState};
pub use transport::{Transport, TransportError};

#[cfg(test)]
pub(crate) use transport::recording;
