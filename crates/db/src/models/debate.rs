use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::argument::ArgumentTree;

/// A generated debate: the statement plus the full argument tree, stored as
/// one JSON document. The tree only grows; every refutation append rewrites
/// the column with the new snapshot.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Debate {
    pub id: Uuid,
    pub statement: String,
    pub tree: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Debate {
    /// Decode the stored argument tree.
    pub fn parsed_tree(&self) -> Result<ArgumentTree, serde_json::Error> {
        serde_json::from_str(&self.tree)
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        statement: &str,
        tree: &ArgumentTree,
    ) -> Result<Self, sqlx::Error> {
        let tree_json =
            serde_json::to_string(tree).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        sqlx::query_as::<_, Debate>(
            r#"INSERT INTO debates (id, statement, tree)
               VALUES ($1, $2, $3)
               RETURNING id, statement, tree, created_at, updated_at"#,
        )
        .bind(id)
        .bind(statement)
        .bind(tree_json)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Debate>(
            r#"SELECT id, statement, tree, created_at, updated_at
               FROM debates
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Debate>(
            r#"SELECT id, statement, tree, created_at, updated_at
               FROM debates
               ORDER BY created_at DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Persist a new tree snapshot for an existing debate.
    pub async fn update_tree<'e, E>(
        executor: E,
        id: Uuid,
        tree: &ArgumentTree,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let tree_json =
            serde_json::to_string(tree).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        sqlx::query_as::<_, Debate>(
            r#"UPDATE debates
               SET tree = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, statement, tree, created_at, updated_at"#,
        )
        .bind(id)
        .bind(tree_json)
        .fetch_one(executor)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM debates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
