use crate::db::models::UsageLogEntry;
use crate::db::schema::SQLITE_INIT;
use crate::error::DeckError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

/// Open (creating if needed) the database and apply the schema.
pub async fn connect(database_url: &str) -> Result<UsageStorage, DeckError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    // Each connection to `:memory:` is its own database.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 4 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_opts)
        .await?;
    let storage = UsageStorage::new(pool);
    storage.init_schema().await?;
    Ok(storage)
}

#[derive(Clone)]
pub struct UsageStorage {
    pool: SqlitePool,
}

impl UsageStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), DeckError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn insert(
        &self,
        at: DateTime<Utc>,
        endpoint: &str,
        operation: &str,
    ) -> Result<i64, DeckError> {
        let res = sqlx::query(
            "INSERT INTO api_usage (created_at, endpoint, operation) VALUES (?, ?, ?)",
        )
        .bind(at.timestamp_millis())
        .bind(endpoint)
        .bind(operation)
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn count_since(&self, since: DateTime<Utc>) -> Result<i64, DeckError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_usage WHERE created_at >= ?")
            .bind(since.timestamp_millis())
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    /// Delete entries strictly older than `cutoff`. Returns the number removed.
    pub async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DeckError> {
        let res = sqlx::query("DELETE FROM api_usage WHERE created_at < ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<UsageLogEntry>, DeckError> {
        let rows = sqlx::query_as::<_, UsageLogEntry>(
            r#"SELECT id, created_at, endpoint, operation
               FROM api_usage WHERE created_at >= ? ORDER BY id"#,
        )
        .bind(since.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
