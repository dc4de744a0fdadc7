use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct UsageCounter {
    pub user_id: Uuid,
    pub feature: String,
    /// Calendar month, `YYYY-MM`.
    pub period: String,
    pub current: i64,
    pub updated_at: DateTime<Utc>,
}
