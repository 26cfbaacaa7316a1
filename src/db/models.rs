use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One recorded YouTube API call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct UsageLogEntry {
    pub id: i64,
    /// Epoch milliseconds, UTC.
    pub created_at: i64,
    pub endpoint: String,
    pub operation: String,
}
