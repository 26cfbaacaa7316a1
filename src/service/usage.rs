use crate::db::UsageStorage;
use crate::error::DeckError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Counts YouTube API calls per UTC day. Purely informational: a failing
/// log never fails the request that made the call.
#[derive(Clone)]
pub struct UsageCounter {
    storage: UsageStorage,
}

impl UsageCounter {
    pub fn new(storage: UsageStorage) -> Self {
        Self { storage }
    }

    /// Append one entry stamped with the current time.
    pub async fn record(&self, endpoint: &str, operation: &str) {
        if let Err(e) = self.storage.insert(Utc::now(), endpoint, operation).await {
            warn!(endpoint, operation, error = %e, "failed to record API usage");
        }
    }

    /// Entries at or after today's UTC midnight.
    pub async fn count_today(&self) -> Result<i64, DeckError> {
        self.storage.count_since(start_of_day(Utc::now())).await
    }

    /// Today's entries grouped by `endpoint.operation`.
    pub async fn breakdown_today(&self) -> Result<BTreeMap<String, i64>, DeckError> {
        let entries = self.storage.list_since(start_of_day(Utc::now())).await?;
        let mut out = BTreeMap::new();
        for entry in entries {
            *out.entry(format!("{}.{}", entry.endpoint, entry.operation))
                .or_insert(0) += 1;
        }
        Ok(out)
    }

    /// Drop everything recorded before today. Run once at start-up.
    pub async fn purge_before_today(&self) -> Result<u64, DeckError> {
        let removed = self.storage.delete_before(start_of_day(Utc::now())).await?;
        info!(removed, "purged API usage entries from previous days");
        Ok(removed)
    }
}

/// UTC midnight of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::TimeDelta;

    async fn counter() -> UsageCounter {
        let storage = db::connect("sqlite::memory:").await.unwrap();
        UsageCounter::new(storage)
    }

    #[test]
    fn day_boundary_is_utc_midnight() {
        let now = DateTime::parse_from_rfc3339("2026-10-19T23:59:59.999+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            start_of_day(now).to_rfc3339(),
            "2026-10-19T00:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn purge_leaves_zero_when_everything_is_old() {
        let usage = counter().await;
        let yesterday = start_of_day(Utc::now()) - TimeDelta::milliseconds(1);
        for _ in 0..3 {
            usage.storage.insert(yesterday, "playlists", "list").await.unwrap();
        }
        assert_eq!(usage.purge_before_today().await.unwrap(), 3);
        assert_eq!(usage.count_today().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn count_today_only_sees_todays_entries() {
        let usage = counter().await;
        let midnight = start_of_day(Utc::now());
        usage
            .storage
            .insert(midnight - TimeDelta::hours(2), "playlists", "list")
            .await
            .unwrap();
        usage.storage.insert(midnight, "playlists", "delete").await.unwrap();
        usage.record("playlistItems", "insert").await;
        usage.record("playlistItems", "insert").await;

        assert_eq!(usage.count_today().await.unwrap(), 3);
        let breakdown = usage.breakdown_today().await.unwrap();
        assert_eq!(breakdown.get("playlistItems.insert"), Some(&2));
        assert_eq!(breakdown.get("playlists.delete"), Some(&1));
        assert!(!breakdown.contains_key("playlists.list"));

        assert_eq!(usage.purge_before_today().await.unwrap(), 1);
        assert_eq!(usage.count_today().await.unwrap(), 3);
    }
}
