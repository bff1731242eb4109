//! Message database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub room_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub seq: i64,
    pub is_read: bool,
}
