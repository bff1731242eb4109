//! PostgreSQL implementation of RoomRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use roomcast_core::entities::Room;
use roomcast_core::error::DomainError;
use roomcast_core::traits::{RepoResult, RoomRepository};
use roomcast_core::value_objects::{RoomId, RoomName, UserId};

use crate::models::{RoomModel, RoomUpsertModel};

use super::error::{map_db_error, map_unique_violation, room_not_found, unique_ids};

/// PostgreSQL implementation of RoomRepository
#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    /// Create a new PgRoomRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, room_id: RoomId) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM rooms WHERE id = $1)")
            .bind(room_id.into_inner())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    #[instrument(skip(self), fields(room = %name))]
    async fn get_or_create(&self, name: &RoomName, creator: UserId) -> RepoResult<(Room, bool)> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // The no-op update makes the conflicting row visible to RETURNING and
        // serializes concurrent creators on the row lock.
        let row = sqlx::query_as::<_, RoomUpsertModel>(
            r#"
            INSERT INTO rooms (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, created_at, updated_at, (xmax = 0) AS created
            "#,
        )
        .bind(name.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let (model, created) = row.into_parts();

        if created {
            sqlx::query("INSERT INTO room_members (room_id, user_id) VALUES ($1, $2)")
                .bind(model.id)
                .bind(creator.into_inner())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok((Room::try_from(model)?, created))
    }

    #[instrument(skip(self), fields(room = %name))]
    async fn create_with_members(
        &self,
        name: &RoomName,
        creator: UserId,
        members: &[UserId],
    ) -> RepoResult<Room> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let model = sqlx::query_as::<_, RoomModel>(
            r#"
            INSERT INTO rooms (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, || DomainError::RoomAlreadyExists(name.to_string()))
        })?;

        let mut all = members.to_vec();
        all.push(creator);

        sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id)
            SELECT $1, UNNEST($2::bigint[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(model.id)
        .bind(unique_ids(&all))
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Room::try_from(model)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: RoomId) -> RepoResult<Option<Room>> {
        let result = sqlx::query_as::<_, RoomModel>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Room::try_from).transpose()
    }

    #[instrument(skip(self), fields(room = %name))]
    async fn find_by_name(&self, name: &RoomName) -> RepoResult<Option<Room>> {
        let result = sqlx::query_as::<_, RoomModel>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM rooms
            WHERE name = $1
            "#,
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Room::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn is_member(&self, room_id: RoomId, user_id: UserId) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn add_members(&self, room_id: RoomId, user_ids: &[UserId]) -> RepoResult<u64> {
        if !self.exists(room_id).await? {
            return Err(room_not_found(room_id));
        }
        if user_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let added = sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id)
            SELECT $1, UNNEST($2::bigint[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(room_id.into_inner())
        .bind(unique_ids(user_ids))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // The room may have been deleted between the check and the insert
            if e.as_database_error()
                .is_some_and(|db| db.is_foreign_key_violation())
            {
                room_not_found(room_id)
            } else {
                map_db_error(e)
            }
        })?
        .rows_affected();

        if added > 0 {
            sqlx::query("UPDATE rooms SET updated_at = NOW() WHERE id = $1")
                .bind(room_id.into_inner())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(added)
    }

    #[instrument(skip(self))]
    async fn members(&self, room_id: RoomId) -> RepoResult<Vec<UserId>> {
        if !self.exists(room_id).await? {
            return Err(room_not_found(room_id));
        }

        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT user_id FROM room_members WHERE room_id = $1 ORDER BY user_id
            "#,
        )
        .bind(room_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: UserId) -> RepoResult<Vec<Room>> {
        let results = sqlx::query_as::<_, RoomModel>(
            r#"
            SELECT r.id, r.name, r.created_at, r.updated_at
            FROM rooms r
            INNER JOIN room_members m ON m.room_id = r.id
            WHERE m.user_id = $1
            ORDER BY r.updated_at DESC, r.id DESC
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Room::try_from).collect()
    }
}
