//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs and the infrastructure layer
//! provides the implementation (Postgres or in-memory).

use async_trait::async_trait;

use crate::entities::{Message, Presence, Room, User};
use crate::error::DomainError;
use crate::value_objects::{RoomId, RoomName, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Find several users at once; unknown ids are skipped
    async fn find_many(&self, ids: &[UserId]) -> RepoResult<Vec<User>>;

    /// Insert or refresh the local copy of an account
    async fn upsert(&self, user: &User) -> RepoResult<()>;
}

// ============================================================================
// Room Repository
// ============================================================================

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Return the room with this name, creating it if absent
    ///
    /// Creation and the creator's membership happen in one transaction.
    /// Concurrent callers for the same name all observe the same row.
    /// The flag is `true` only for the caller that created it.
    async fn get_or_create(&self, name: &RoomName, creator: UserId) -> RepoResult<(Room, bool)>;

    /// Create a room with an initial member set (the creator is always included)
    ///
    /// Fails with `RoomAlreadyExists` if the name is taken.
    async fn create_with_members(
        &self,
        name: &RoomName,
        creator: UserId,
        members: &[UserId],
    ) -> RepoResult<Room>;

    /// Find room by ID
    async fn find_by_id(&self, id: RoomId) -> RepoResult<Option<Room>>;

    /// Find room by its routing key
    async fn find_by_name(&self, name: &RoomName) -> RepoResult<Option<Room>>;

    /// Check membership
    async fn is_member(&self, room_id: RoomId, user_id: UserId) -> RepoResult<bool>;

    /// Union users into the member set, returning how many were new
    async fn add_members(&self, room_id: RoomId, user_ids: &[UserId]) -> RepoResult<u64>;

    /// List member ids of a room
    async fn members(&self, room_id: RoomId) -> RepoResult<Vec<UserId>>;

    /// List rooms a user belongs to, most recently updated first
    async fn list_for_user(&self, user_id: UserId) -> RepoResult<Vec<Room>>;
}

// ============================================================================
// Message Repository
// ============================================================================

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append a message, assigning its timestamp and per-room sequence
    ///
    /// The timestamp is never earlier than the previous message in the room.
    async fn append(&self, room_id: RoomId, author_id: UserId, content: &str)
        -> RepoResult<Message>;

    /// Most recent messages in ascending order (limit is clamped to 1..=100)
    async fn list_recent(&self, room_id: RoomId, limit: i64) -> RepoResult<Vec<Message>>;

    /// Mark every unread message not written by `exclude_author_id` as read
    async fn mark_read(&self, room_id: RoomId, exclude_author_id: UserId) -> RepoResult<u64>;

    /// Latest message in a room
    async fn latest(&self, room_id: RoomId) -> RepoResult<Option<Message>>;
}

// ============================================================================
// Presence Repository
// ============================================================================

#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// Set the online flag, returning the record and whether it changed
    async fn set_online(&self, user_id: UserId, online: bool) -> RepoResult<(Presence, bool)>;

    /// Get the presence record of a user
    async fn get(&self, user_id: UserId) -> RepoResult<Option<Presence>>;
}
