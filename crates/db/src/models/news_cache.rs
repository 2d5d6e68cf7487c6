use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

/// Cached headline payload for one topic, refreshed on a TTL.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct NewsCache {
    pub topic: String,
    pub payload: String,
    pub fetched_at: DateTime<Utc>,
}

impl NewsCache {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.fetched_at <= ttl
    }

    pub async fn find_by_topic(
        pool: &SqlitePool,
        topic: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, NewsCache>(
            r#"SELECT topic, payload, fetched_at
               FROM news_cache
               WHERE topic = $1"#,
        )
        .bind(topic)
        .fetch_optional(pool)
        .await
    }

    pub async fn upsert(
        pool: &SqlitePool,
        topic: &str,
        payload: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, NewsCache>(
            r#"INSERT INTO news_cache (topic, payload, fetched_at)
               VALUES ($1, $2, datetime('now', 'subsec'))
               ON CONFLICT(topic) DO UPDATE SET
                 payload = excluded.payload,
                 fetched_at = excluded.fetched_at
               RETURNING topic, payload, fetched_at"#,
        )
        .bind(topic)
        .bind(payload)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn upsert_replaces_existing_payload() {
        let pool = test_pool().await;
        NewsCache::upsert(&pool, "climate", r#"[{"title":"old"}]"#).await.unwrap();
        NewsCache::upsert(&pool, "climate", r#"[{"title":"new"}]"#).await.unwrap();

        let row = NewsCache::find_by_topic(&pool, "climate").await.unwrap().unwrap();
        assert!(row.payload.contains("new"));
    }

    #[tokio::test]
    async fn freshly_upserted_row_is_fresh() {
        let pool = test_pool().await;
        let row = NewsCache::upsert(&pool, "tech", "[]").await.unwrap();
        assert!(row.is_fresh(Duration::minutes(30)));
        assert!(!row.is_fresh(Duration::seconds(-1)));
    }
}
