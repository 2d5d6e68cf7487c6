//! Routes for debate practice sessions, including the streaming reply.

use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::{
        Json as ResponseJson,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use db::models::{
    argument::Side,
    practice_session::{ChatMessage, PracticeSession},
};
use serde::{Deserialize, Serialize};
use services::services::practice::PracticeError;
use tokio_stream::wrappers::UnboundedReceiverStream;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const DONE_EVENT: &str = "[DONE]";

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatePracticeRequest {
    pub statement: String,
    /// The side the user will argue; the AI opponent takes the other one.
    pub side: Side,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PracticeMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PracticeSessionResponse {
    pub id: Uuid,
    pub statement: String,
    pub side: Side,
    pub transcript: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PracticeSession> for PracticeSessionResponse {
    type Error = serde_json::Error;

    fn try_from(session: PracticeSession) -> Result<Self, Self::Error> {
        let transcript = session.parsed_transcript()?;
        Ok(Self {
            id: session.id,
            statement: session.statement,
            side: session.side,
            transcript,
            created_at: session.created_at,
            updated_at: session.updated_at,
        })
    }
}

pub async fn create_session(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreatePracticeRequest>,
) -> Result<ResponseJson<ApiResponse<PracticeSessionResponse>>, ApiError> {
    let session = state.practice.start(&payload.statement, payload.side).await?;
    Ok(ResponseJson(ApiResponse::success(session.try_into()?)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<PracticeSessionResponse>>, ApiError> {
    let session = state.practice.get(id).await?;
    Ok(ResponseJson(ApiResponse::success(session.try_into()?)))
}

/// Send a user message and stream the opponent's reply as server-sent
/// events: one `data:` JSON frame per text fragment, then a `[DONE]`
/// sentinel. The transcript is persisted by the service once the reply
/// completes.
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<PracticeMessageRequest>,
) -> Result<Sse<UnboundedReceiverStream<Result<Event, Infallible>>>, ApiError> {
    // Reject unknown sessions and empty messages before the stream opens;
    // past this point errors can only be reported in-band.
    state.practice.get(id).await?;
    let content = payload.content.trim().to_string();
    if content.is_empty() {
        return Err(PracticeError::EmptyMessage.into());
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<Event, Infallible>>();
    let practice = state.practice.clone();

    tokio::spawn(async move {
        let delta_tx = tx.clone();
        let result = practice
            .reply(id, &content, move |delta| {
                let frame = serde_json::json!({ "content": delta }).to_string();
                let _ = delta_tx.send(Ok(Event::default().data(frame)));
            })
            .await;
        if let Err(e) = result {
            tracing::error!(session_id = %id, error = %e, "practice reply failed");
            let frame = serde_json::json!({ "error": e.to_string() }).to_string();
            let _ = tx.send(Ok(Event::default().data(frame)));
        }
        let _ = tx.send(Ok(Event::default().data(DONE_EVENT)));
    });

    Ok(Sse::new(UnboundedReceiverStream::new(rx)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/practice", post(create_session))
        .route("/practice/{id}", get(get_session))
        .route("/practice/{id}/messages", post(post_message))
}
