//! Request-level handlers: authentication and error policy.

mod auth;
mod error;

pub use auth::{bearer_token, Authenticator, JwtAuthenticator};
pub use error::{HandlerError, HandlerResult};
