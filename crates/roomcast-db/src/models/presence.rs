//! Presence database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for user_presence table
#[derive(Debug, Clone, FromRow)]
pub struct PresenceModel {
    pub user_id: i64,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
