//! PostgreSQL implementation of PresenceRepository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;

use roomcast_core::entities::Presence;
use roomcast_core::traits::{PresenceRepository, RepoResult};
use roomcast_core::value_objects::UserId;

use crate::models::PresenceModel;

use super::error::map_db_error;

/// PostgreSQL implementation of PresenceRepository
#[derive(Clone)]
pub struct PgPresenceRepository {
    pool: PgPool,
}

impl PgPresenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresenceRepository for PgPresenceRepository {
    #[instrument(skip(self))]
    async fn set_online(&self, user_id: UserId, online: bool) -> RepoResult<(Presence, bool)> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r#"
            INSERT INTO user_presence (user_id, online)
            VALUES ($1, FALSE)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let current = sqlx::query_as::<_, PresenceModel>(
            r#"
            SELECT user_id, online, last_seen, updated_at
            FROM user_presence
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let mut presence = Presence::from(current);
        let changed = presence.transition(online, Utc::now());

        if changed {
            sqlx::query(
                r#"
                UPDATE user_presence
                SET online = $2, last_seen = $3, updated_at = $4
                WHERE user_id = $1
                "#,
            )
            .bind(user_id.into_inner())
            .bind(presence.online)
            .bind(presence.last_seen)
            .bind(presence.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok((presence, changed))
    }

    #[instrument(skip(self))]
    async fn get(&self, user_id: UserId) -> RepoResult<Option<Presence>> {
        let result = sqlx::query_as::<_, PresenceModel>(
            r#"
            SELECT user_id, online, last_seen, updated_at
            FROM user_presence
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Presence::from))
    }
}
