//! Live debate-practice chat: the user argues one side, the gateway's model
//! argues the other, and replies stream back token by token.

use db::models::{
    argument::Side,
    practice_session::{ChatMessage, ChatRole, PracticeSession},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::gateway::{GatewayClient, GatewayError, Message};

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("practice session not found")]
    NotFound,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("stored transcript is unreadable: {0}")]
    CorruptTranscript(String),
}

#[derive(Clone)]
pub struct PracticeService {
    pool: SqlitePool,
    gateway: GatewayClient,
}

impl PracticeService {
    pub fn new(pool: SqlitePool, gateway: GatewayClient) -> Self {
        Self { pool, gateway }
    }

    /// Open a new session. `side` is the side the user will argue.
    pub async fn start(&self, statement: &str, side: Side) -> Result<PracticeSession, PracticeError> {
        let session = PracticeSession::create(&self.pool, Uuid::new_v4(), statement.trim(), side).await?;
        info!(session_id = %session.id, side = %side, "started practice session");
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<PracticeSession, PracticeError> {
        PracticeSession::find_by_id(&self.pool, id)
            .await?
            .ok_or(PracticeError::NotFound)
    }

    /// Append the user's message, stream the opponent's reply through
    /// `on_delta`, and persist the transcript once the reply is complete.
    /// Nothing is written if the stream fails partway.
    pub async fn reply<F>(
        &self,
        id: Uuid,
        content: &str,
        on_delta: F,
    ) -> Result<String, PracticeError>
    where
        F: FnMut(&str),
    {
        let content = content.trim();
        if content.is_empty() {
            return Err(PracticeError::EmptyMessage);
        }

        let session = self.get(id).await?;
        let mut transcript = session
            .parsed_transcript()
            .map_err(|e| PracticeError::CorruptTranscript(e.to_string()))?;
        transcript.push(ChatMessage::user(content));

        let messages = opponent_messages(&session, &transcript);
        let reply = self.gateway.stream(messages, Some(512), Some(0.7), on_delta).await?;

        transcript.push(ChatMessage::assistant(&reply));
        PracticeSession::update_transcript(&self.pool, id, &transcript).await?;
        info!(session_id = %id, turns = transcript.len(), "practice turn complete");
        Ok(reply)
    }
}

/// Build the gateway conversation: opponent system prompt plus the
/// transcript mapped onto gateway roles.
fn opponent_messages(session: &PracticeSession, transcript: &[ChatMessage]) -> Vec<Message> {
    let opponent_side = match session.side.opposite() {
        Side::For => "defend",
        Side::Against => "argue against",
    };
    let mut messages = vec![Message::system(format!(
        "You are a sharp debate opponent practicing with the user. The motion is: \
         \"{}\". You {} the motion. Rebut the user's points directly and keep replies \
         under 150 words.",
        session.statement, opponent_side,
    ))];
    messages.extend(transcript.iter().map(|entry| match entry.role {
        ChatRole::User => Message::user(&entry.content),
        ChatRole::Assistant => Message::assistant(&entry.content),
    }));
    messages
}
