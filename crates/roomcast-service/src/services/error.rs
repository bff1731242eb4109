//! Service layer error types

use std::fmt;

use roomcast_cache::BusError;
use roomcast_common::AppError;
use roomcast_core::DomainError;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation or storage failure
    Domain(DomainError),

    /// Application error (auth, config)
    App(AppError),

    /// Fan-out bus failure
    Bus(BusError),

    /// Resource not found
    NotFound { resource: &'static str, id: String },

    /// Validation error
    Validation(String),

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::App(e) => write!(f, "{e}"),
            Self::Bus(e) => write!(f, "Bus error: {e}"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::App(e) => Some(e),
            Self::Bus(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The wrapped domain error, if any
    #[must_use]
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Storage or bus could not be reached; the operation may succeed later
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Domain(e) => e.is_unavailable(),
            Self::Bus(_) => true,
            _ => false,
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Domain(e) => {
                if e.is_not_found() {
                    404
                } else if e.is_authorization() {
                    403
                } else if e.is_validation() {
                    400
                } else if e.is_conflict() {
                    409
                } else if e.is_unavailable() {
                    503
                } else {
                    500
                }
            }
            Self::App(e) => e.status_code(),
            Self::Bus(_) => 503,
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code for logs and rejection frames
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::Bus(_) => "BUS_UNAVAILABLE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<BusError> for ServiceError {
    fn from(err: BusError) -> Self {
        Self::Bus(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::Bus(e) => AppError::Cache(e.to_string()),
            ServiceError::NotFound { resource, id } => {
                AppError::NotFound(format!("{resource} {id}"))
            }
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
