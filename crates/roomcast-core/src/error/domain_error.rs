//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{RoomId, UserId};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Message content is empty")]
    EmptyContent,

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    #[error("Invalid room name: {0}")]
    InvalidRoomName(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("User {user_id} is not a member of room {room_id}")]
    NotRoomMember { room_id: RoomId, user_id: UserId },

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Room already exists: {0}")]
    RoomAlreadyExists(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for logs and rejection frames
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::RoomNotFound(_) => "UNKNOWN_ROOM",
            Self::UserNotFound(_) => "UNKNOWN_USER",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::EmptyContent => "EMPTY_CONTENT",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::InvalidRoomName(_) => "INVALID_ROOM_NAME",

            // Authorization
            Self::NotRoomMember { .. } => "ACCESS_DENIED",

            // Conflict
            Self::RoomAlreadyExists(_) => "ROOM_ALREADY_EXISTS",

            // Infrastructure
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RoomNotFound(_) | Self::UserNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::EmptyContent
                | Self::ContentTooLong { .. }
                | Self::InvalidRoomName(_)
        )
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::NotRoomMember { .. })
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::RoomAlreadyExists(_))
    }

    /// Check if the backing store could not serve the request
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DomainError::RoomNotFound(RoomId::new(1)).code(), "UNKNOWN_ROOM");
        assert_eq!(DomainError::EmptyContent.code(), "EMPTY_CONTENT");
        assert_eq!(
            DomainError::ContentTooLong { max: 4000 }.code(),
            "CONTENT_TOO_LONG"
        );
        assert_eq!(
            DomainError::StoreUnavailable("down".into()).code(),
            "STORE_UNAVAILABLE"
        );
    }

    #[test]
    fn test_classification() {
        assert!(DomainError::RoomNotFound(RoomId::new(1)).is_not_found());
        assert!(DomainError::EmptyContent.is_validation());
        assert!(DomainError::NotRoomMember {
            room_id: RoomId::new(1),
            user_id: UserId::new(3),
        }
        .is_authorization());
        assert!(DomainError::RoomAlreadyExists("general".into()).is_conflict());
        assert!(DomainError::StoreUnavailable("timeout".into()).is_unavailable());
        assert!(!DomainError::EmptyContent.is_unavailable());
    }

    #[test]
    fn test_display() {
        let err = DomainError::NotRoomMember {
            room_id: RoomId::new(2),
            user_id: UserId::new(3),
        };
        assert_eq!(err.to_string(), "User 3 is not a member of room 2");
    }
}
