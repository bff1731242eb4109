//! PostgreSQL implementation of MessageRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use roomcast_core::entities::Message;
use roomcast_core::error::DomainError;
use roomcast_core::traits::{MessageRepository, RepoResult};
use roomcast_core::value_objects::{RoomId, UserId};

use crate::models::MessageModel;

use super::error::{map_db_error, room_not_found};

/// PostgreSQL implementation of MessageRepository
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn room_exists(&self, room_id: RoomId) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM rooms WHERE id = $1)")
            .bind(room_id.into_inner())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, content), fields(len = content.len()))]
    async fn append(
        &self,
        room_id: RoomId,
        author_id: UserId,
        content: &str,
    ) -> RepoResult<Message> {
        if content.trim().is_empty() {
            return Err(DomainError::EmptyContent);
        }

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Serializes appends per room; seq and the timestamp floor are read under this lock.
        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
            .bind(room_id.into_inner())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;

        if locked.is_none() {
            return Err(room_not_found(room_id));
        }

        let model = sqlx::query_as::<_, MessageModel>(
            r#"
            INSERT INTO messages (room_id, author_id, content, created_at, seq)
            SELECT id, $2, $3, GREATEST(clock_timestamp(), last_message_at), message_seq + 1
            FROM rooms
            WHERE id = $1
            RETURNING id, room_id, author_id, content, created_at, seq, is_read
            "#,
        )
        .bind(room_id.into_inner())
        .bind(author_id.into_inner())
        .bind(content)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r#"
            UPDATE rooms
            SET message_seq = $2, last_message_at = $3, updated_at = GREATEST(updated_at, $3)
            WHERE id = $1
            "#,
        )
        .bind(room_id.into_inner())
        .bind(model.seq)
        .bind(model.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(Message::from(model))
    }

    #[instrument(skip(self))]
    async fn list_recent(&self, room_id: RoomId, limit: i64) -> RepoResult<Vec<Message>> {
        let limit = limit.clamp(1, 100);

        let results = sqlx::query_as::<_, MessageModel>(
            r#"
            SELECT id, room_id, author_id, content, created_at, seq, is_read
            FROM messages
            WHERE room_id = $1
            ORDER BY seq DESC
            LIMIT $2
            "#,
        )
        .bind(room_id.into_inner())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        if results.is_empty() && !self.room_exists(room_id).await? {
            return Err(room_not_found(room_id));
        }

        // Scanned newest first to apply the limit; returned oldest first
        Ok(results.into_iter().rev().map(Message::from).collect())
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, room_id: RoomId, exclude_author_id: UserId) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE room_id = $1 AND author_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(room_id.into_inner())
        .bind(exclude_author_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        let affected = result.rows_affected();
        if affected == 0 && !self.room_exists(room_id).await? {
            return Err(room_not_found(room_id));
        }

        Ok(affected)
    }

    #[instrument(skip(self))]
    async fn latest(&self, room_id: RoomId) -> RepoResult<Option<Message>> {
        let result = sqlx::query_as::<_, MessageModel>(
            r#"
            SELECT id, room_id, author_id, content, created_at, seq, is_read
            FROM messages
            WHERE room_id = $1
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(room_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Message::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgMessageRepository>();
    }
}
