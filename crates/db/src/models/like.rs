use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Like {
    pub id: Uuid,
    pub debate_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Like {
    pub async fn add(pool: &SqlitePool, debate_id: Uuid) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Like>(
            r#"INSERT INTO likes (id, debate_id)
               VALUES ($1, $2)
               RETURNING id, debate_id, created_at"#,
        )
        .bind(id)
        .bind(debate_id)
        .fetch_one(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool, debate_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE debate_id = $1")
            .bind(debate_id)
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{argument::ArgumentTree, debate::Debate};
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn count_tracks_added_likes() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let debate = Debate::create(&pool, Uuid::new_v4(), "s", &ArgumentTree::default())
            .await
            .unwrap();

        assert_eq!(Like::count(&pool, debate.id).await.unwrap(), 0);
        Like::add(&pool, debate.id).await.unwrap();
        Like::add(&pool, debate.id).await.unwrap();
        assert_eq!(Like::count(&pool, debate.id).await.unwrap(), 2);
    }
}
