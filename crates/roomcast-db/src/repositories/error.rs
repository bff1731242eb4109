//! Error handling utilities for repositories

use roomcast_core::error::DomainError;
use roomcast_core::value_objects::{RoomId, UserId};
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::StoreUnavailable(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    map_db_error(e)
}

/// Create a "room not found" error
pub fn room_not_found(id: RoomId) -> DomainError {
    DomainError::RoomNotFound(id)
}

/// Deduplicated raw ids, for `UNNEST($n::bigint[])` binds
pub fn unique_ids(ids: &[UserId]) -> Vec<i64> {
    let mut raw: Vec<i64> = ids.iter().map(|id| id.into_inner()).collect();
    raw.sort_unstable();
    raw.dedup();
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids() {
        let ids = [UserId::new(3), UserId::new(1), UserId::new(3)];
        assert_eq!(unique_ids(&ids), vec![1, 3]);
    }

    #[test]
    fn test_map_db_error_is_unavailable() {
        assert!(map_db_error(SqlxError::PoolTimedOut).is_unavailable());
    }
}
