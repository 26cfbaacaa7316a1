//! SQL DDL for initializing the usage log.

/// SQLite schema with:
/// - `id` INTEGER PRIMARY KEY AUTOINCREMENT
/// - `created_at` epoch milliseconds (UTC), indexed for day-range counts
/// - `endpoint` / `operation` describing the call (e.g. `playlistItems` / `insert`)
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS api_usage (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at INTEGER NOT NULL,
    endpoint TEXT NOT NULL,
    operation TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_api_usage_created_at ON api_usage(created_at);
"#;
