use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::argument::Side;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of a practice transcript. The assistant entry's content is
/// assembled incrementally while streaming and persisted once complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A live debate-practice session. `side` is the side the user argues; the
/// AI opponent argues the opposite. `transcript` is a JSON-serialized
/// sequence of `ChatMessage`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PracticeSession {
    pub id: Uuid,
    pub statement: String,
    pub side: Side,
    pub transcript: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PracticeSession {
    pub fn parsed_transcript(&self) -> Result<Vec<ChatMessage>, serde_json::Error> {
        serde_json::from_str(&self.transcript)
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        statement: &str,
        side: Side,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PracticeSession>(
            r#"INSERT INTO practice_sessions (id, statement, side)
               VALUES ($1, $2, $3)
               RETURNING id, statement, side, transcript, created_at, updated_at"#,
        )
        .bind(id)
        .bind(statement)
        .bind(side)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PracticeSession>(
            r#"SELECT id, statement, side, transcript, created_at, updated_at
               FROM practice_sessions
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_transcript(
        pool: &SqlitePool,
        id: Uuid,
        transcript: &[ChatMessage],
    ) -> Result<Self, sqlx::Error> {
        let json =
            serde_json::to_string(transcript).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        sqlx::query_as::<_, PracticeSession>(
            r#"UPDATE practice_sessions
               SET transcript = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, statement, side, transcript, created_at, updated_at"#,
        )
        .bind(id)
        .bind(json)
        .fetch_one(pool)
        .await
    }
}
