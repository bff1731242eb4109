//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use roomcast_core::entities::User;
use roomcast_core::traits::{RepoResult, UserRepository};
use roomcast_core::value_objects::UserId;

use crate::models::UserModel;

use super::error::{map_db_error, unique_ids};

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, username, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_many(&self, ids: &[UserId]) -> RepoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, username, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(unique_ids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self))]
    async fn upsert(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username, updated_at = NOW()
            "#,
        )
        .bind(user.id.into_inner())
        .bind(&user.username)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
