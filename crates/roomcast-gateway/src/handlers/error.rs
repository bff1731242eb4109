//! Handler error types
//!
//! Each variant carries its policy: connect-time failures refuse the
//! upgrade with an HTTP status, per-message failures drop only that message.

use roomcast_cache::BusError;
use roomcast_core::DomainError;
use roomcast_service::ServiceError;
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No usable identity on the connection
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Identity is not a member of an existing room
    #[error("Access denied")]
    AccessDenied,

    /// Room key did not pass validation
    #[error("Invalid room: {0}")]
    InvalidRoom(String),

    /// Inbound frame is not a valid envelope
    #[error("Malformed payload: {0}")]
    MalformedPayload(&'static str),

    /// Content failed the message rules (empty or too long)
    #[error("Message rejected: {0}")]
    Rejected(DomainError),

    /// Session is not in a state that accepts the operation
    #[error("Session is {0}")]
    InvalidState(&'static str),

    /// Presence sessions have no room to post to
    #[error("Session has no room")]
    NoRoom,

    /// Service error
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Bus error
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

impl From<DomainError> for HandlerError {
    fn from(err: DomainError) -> Self {
        Self::Service(ServiceError::Domain(err))
    }
}

impl HandlerError {
    /// Classify a service failure raised while appending a message
    #[must_use]
    pub fn from_append(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e @ (DomainError::EmptyContent | DomainError::ContentTooLong { .. })) => {
                Self::Rejected(e)
            }
            other => Self::Service(other),
        }
    }

    /// HTTP status used to refuse an upgrade
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::AccessDenied => 403,
            Self::InvalidRoom(_) | Self::MalformedPayload(_) | Self::Rejected(_) => 400,
            Self::InvalidState(_) | Self::NoRoom => 409,
            Self::Service(e) => {
                if e.is_unavailable() {
                    503
                } else {
                    e.status_code()
                }
            }
            Self::Bus(_) => 503,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::InvalidRoom(_) => "INVALID_ROOM_NAME",
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::Rejected(e) => e.code(),
            Self::InvalidState(_) => "INVALID_STATE",
            Self::NoRoom => "NO_ROOM",
            Self::Service(e) => e.error_code(),
            Self::Bus(_) => "BUS_UNAVAILABLE",
        }
    }

    /// Storage or bus could not be reached
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Service(e) => e.is_unavailable(),
            Self::Bus(_) => true,
            _ => false,
        }
    }

    /// Rejection frame for the sender, when this failure has one
    #[must_use]
    pub fn rejection(&self) -> Option<&DomainError> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }

    /// Log a per-message failure at the level its kind calls for
    pub fn log_dropped(&self, session_id: &str) {
        let kind = self.error_code();
        match self {
            Self::MalformedPayload(_) | Self::NoRoom | Self::InvalidState(_) => {
                tracing::debug!(session_id, kind, error = %self, "Inbound frame dropped");
            }
            Self::Rejected(_) => {
                tracing::info!(session_id, kind, error = %self, "Message rejected");
            }
            _ => {
                tracing::warn!(session_id, kind, error = %self, "Message dropped");
            }
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
