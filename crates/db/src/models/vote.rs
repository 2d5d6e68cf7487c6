use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::argument::Side;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Vote {
    pub id: Uuid,
    pub debate_id: Uuid,
    pub side: Side,
    pub created_at: DateTime<Utc>,
}

/// Per-side vote counts for one debate.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct VoteTally {
    #[serde(rename = "for")]
    pub supporting: i64,
    pub against: i64,
}

impl Vote {
    pub async fn cast(pool: &SqlitePool, debate_id: Uuid, side: Side) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Vote>(
            r#"INSERT INTO votes (id, debate_id, side)
               VALUES ($1, $2, $3)
               RETURNING id, debate_id, side, created_at"#,
        )
        .bind(id)
        .bind(debate_id)
        .bind(side)
        .fetch_one(pool)
        .await
    }

    pub async fn tally(pool: &SqlitePool, debate_id: Uuid) -> Result<VoteTally, sqlx::Error> {
        sqlx::query_as::<_, VoteTally>(
            r#"SELECT
                 COALESCE(SUM(CASE WHEN side = 'for' THEN 1 ELSE 0 END), 0) AS supporting,
                 COALESCE(SUM(CASE WHEN side = 'against' THEN 1 ELSE 0 END), 0) AS against
               FROM votes
               WHERE debate_id = $1"#,
        )
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

    async fn debate_pool() -> (SqlitePool, Uuid) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let debate = Debate::create(&pool, Uuid::new_v4(), "s", &ArgumentTree::default())
            .await
            .unwrap();
        (pool, debate.id)
    }

    #[tokio::test]
    async fn tally_counts_per_side() {
        let (pool, debate_id) = debate_pool().await;
        Vote::cast(&pool, debate_id, Side::For).await.unwrap();
        Vote::cast(&pool, debate_id, Side::For).await.unwrap();
        Vote::cast(&pool, debate_id, Side::Against).await.unwrap();

        let tally = Vote::tally(&pool, debate_id).await.unwrap();
        assert_eq!(tally.supporting, 2);
        assert_eq!(tally.against, 1);
    }

    #[tokio::test]
    async fn tally_is_zero_for_fresh_debate() {
        let (pool, debate_id) = debate_pool().await;
        let tally = Vote::tally(&pool, debate_id).await.unwrap();
        assert_eq!(tally.supporting, 0);
        assert_eq!(tally.against, 0);
    }
}
