//! Message store
//!
//! Validates and persists room messages.

use roomcast_core::{DomainError, Message, RoomId, UserId, MAX_CONTENT_LENGTH};
use tracing::{debug, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Largest page `list_recent` will return
pub const MAX_RECENT_LIMIT: i64 = 100;

/// Message store service
pub struct MessageStore<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageStore<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Check content against the message rules without persisting it
    pub fn validate(content: &str) -> Result<(), DomainError> {
        if content.trim().is_empty() {
            return Err(DomainError::EmptyContent);
        }
        if content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(DomainError::ContentTooLong {
                max: MAX_CONTENT_LENGTH,
            });
        }
        Ok(())
    }

    /// Persist a message. The stored timestamp never precedes the room's
    /// previous message.
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub async fn append(
        &self,
        room_id: RoomId,
        author_id: UserId,
        content: &str,
    ) -> ServiceResult<Message> {
        Self::validate(content)?;

        let message = self
            .ctx
            .message_repo()
            .append(room_id, author_id, content)
            .await?;

        debug!(message_id = %message.id, seq = message.seq, "Message stored");
        Ok(message)
    }

    /// Up to `limit` most recent messages, oldest first. `limit` is clamped to 1..=100.
    #[instrument(skip(self))]
    pub async fn list_recent(&self, room_id: RoomId, limit: i64) -> ServiceResult<Vec<Message>> {
        let limit = limit.clamp(1, MAX_RECENT_LIMIT);
        Ok(self.ctx.message_repo().list_recent(room_id, limit).await?)
    }

    /// Mark every unread message not written by `exclude_author_id` as read
    #[instrument(skip(self))]
    pub async fn mark_read(&self, room_id: RoomId, exclude_author_id: UserId) -> ServiceResult<u64> {
        Ok(self
            .ctx
            .message_repo()
            .mark_read(room_id, exclude_author_id)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn latest(&self, room_id: RoomId) -> ServiceResult<Option<Message>> {
        Ok(self.ctx.message_repo().latest(room_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use roomcast_core::RoomName;

    use super::*;
    use crate::services::context::testing::{harness, Harness};
    use crate::services::{RoomRegistry, ServiceError};

    async fn room(h: &Harness) -> RoomId {
        let (room, _) = RoomRegistry::new(&h.ctx)
            .get_or_create(&RoomName::parse("general").unwrap(), UserId::new(1))
            .await
            .unwrap();
        room.id
    }

    #[test]
    fn test_validate() {
        assert!(MessageStore::validate("hi").is_ok());
        assert!(matches!(MessageStore::validate("   \n"), Err(DomainError::EmptyContent)));
        assert!(matches!(
            MessageStore::validate(&"x".repeat(MAX_CONTENT_LENGTH + 1)),
            Err(DomainError::ContentTooLong { .. })
        ));
        assert!(MessageStore::validate(&"é".repeat(MAX_CONTENT_LENGTH)).is_ok());
    }

    #[tokio::test]
    async fn test_append_then_list_roundtrip() {
        let h = harness().await;
        let store = MessageStore::new(&h.ctx);
        let room_id = room(&h).await;

        let before = Utc::now();
        let message = store.append(room_id, UserId::new(1), "hello").await.unwrap();

        let listed = store.list_recent(room_id, 50).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, message.id);
        assert_eq!(listed[0].content, "hello");
        assert_eq!(listed[0].author_id, UserId::new(1));
        assert!(!listed[0].is_read);
        assert!(listed[0].created_at >= before);
    }

    #[tokio::test]
    async fn test_list_recent_ascending_and_limited() {
        let h = harness().await;
        let store = MessageStore::new(&h.ctx);
        let room_id = room(&h).await;

        for i in 0..5 {
            store.append(room_id, UserId::new(1), &format!("m{i}")).await.unwrap();
        }

        let listed = store.list_recent(room_id, 3).await.unwrap();
        let contents: Vec<_> = listed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
        assert!(listed.windows(2).all(|w| w[0].order_key() < w[1].order_key()));

        // Zero clamps up to one
        assert_eq!(store.list_recent(room_id, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_rejects_blank_and_long() {
        let h = harness().await;
        let store = MessageStore::new(&h.ctx);
        let room_id = room(&h).await;

        let err = store.append(room_id, UserId::new(1), "  ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::EmptyContent)));

        let long = "a".repeat(MAX_CONTENT_LENGTH + 1);
        let err = store.append(room_id, UserId::new(1), &long).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::ContentTooLong { .. })));

        assert!(store.latest(room_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_read_twice() {
        let h = harness().await;
        let store = MessageStore::new(&h.ctx);
        let room_id = room(&h).await;

        store.append(room_id, UserId::new(1), "from alice").await.unwrap();
        store.append(room_id, UserId::new(2), "from bob").await.unwrap();
        store.append(room_id, UserId::new(2), "bob again").await.unwrap();

        assert_eq!(store.mark_read(room_id, UserId::new(1)).await.unwrap(), 2);
        assert_eq!(store.mark_read(room_id, UserId::new(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_unavailable_propagates() {
        let h = harness().await;
        let store = MessageStore::new(&h.ctx);
        let room_id = room(&h).await;

        h.store.set_unavailable(true);
        let err = store.append(room_id, UserId::new(1), "hi").await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
