//! Room database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for rooms table
#[derive(Debug, Clone, FromRow)]
pub struct RoomModel {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row returned by the get-or-create upsert
#[derive(Debug, Clone, FromRow)]
pub struct RoomUpsertModel {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `true` when this statement inserted the row
    pub created: bool,
}

impl RoomUpsertModel {
    pub fn into_parts(self) -> (RoomModel, bool) {
        (
            RoomModel {
                id: self.id,
                name: self.name,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            self.created,
        )
    }
}
