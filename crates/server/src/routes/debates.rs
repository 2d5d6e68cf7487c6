//! Routes for debates: generation, refutations, votes, likes.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use db::models::{
    argument::{ArgumentTree, Side},
    debate::Debate,
    like::Like,
    vote::{Vote, VoteTally},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateDebateRequest {
    pub statement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RefutationRequest {
    pub side: Side,
    pub path: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct VoteRequest {
    pub side: Side,
}

/// A debate with its argument tree decoded for the frontend.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DebateResponse {
    pub id: Uuid,
    pub statement: String,
    pub tree: ArgumentTree,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Debate> for DebateResponse {
    type Error = serde_json::Error;

    fn try_from(debate: Debate) -> Result<Self, Self::Error> {
        let tree = debate.parsed_tree()?;
        Ok(Self {
            id: debate.id,
            statement: debate.statement,
            tree,
            created_at: debate.created_at,
            updated_at: debate.updated_at,
        })
    }
}

/// Generate a debate for a statement
pub async fn create_debate(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateDebateRequest>,
) -> Result<ResponseJson<ApiResponse<DebateResponse>>, ApiError> {
    let debate = state.debates.generate(&payload.statement).await?;
    Ok(ResponseJson(ApiResponse::success(debate.try_into()?)))
}

/// List recent debates
pub async fn list_debates(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<DebateResponse>>>, ApiError> {
    let debates = Debate::find_recent(&state.db.pool, 50).await?;
    let responses = debates
        .into_iter()
        .map(DebateResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResponseJson(ApiResponse::success(responses)))
}

pub async fn get_debate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<DebateResponse>>, ApiError> {
    let debate = Debate::find_by_id(&state.db.pool, id)
        .await?
        .ok_or(ApiError::DebateNotFound)?;
    Ok(ResponseJson(ApiResponse::success(debate.try_into()?)))
}

pub async fn delete_debate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = Debate::delete(&state.db.pool, id).await?;
    if deleted == 0 {
        return Err(ApiError::DebateNotFound);
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Generate and append a refutation at a path in the argument tree
pub async fn create_refutation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<RefutationRequest>,
) -> Result<ResponseJson<ApiResponse<DebateResponse>>, ApiError> {
    let debate = state
        .debates
        .refute(id, payload.side, &payload.path)
        .await?;
    Ok(ResponseJson(ApiResponse::success(debate.try_into()?)))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<VoteRequest>,
) -> Result<ResponseJson<ApiResponse<VoteTally>>, ApiError> {
    Debate::find_by_id(&state.db.pool, id)
        .await?
        .ok_or(ApiError::DebateNotFound)?;
    Vote::cast(&state.db.pool, id, payload.side).await?;
    let tally = Vote::tally(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(tally)))
}

pub async fn get_votes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<VoteTally>>, ApiError> {
    let tally = Vote::tally(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(tally)))
}

pub async fn add_like(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<i64>>, ApiError> {
    Debate::find_by_id(&state.db.pool, id)
        .await?
        .ok_or(ApiError::DebateNotFound)?;
    Like::add(&state.db.pool, id).await?;
    let count = Like::count(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(count)))
}

pub async fn get_likes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<i64>>, ApiError> {
    let count = Like::count(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(count)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/debates", post(create_debate).get(list_debates))
        .route("/debates/{id}", get(get_debate).delete(delete_debate))
        .route("/debates/{id}/refutations", post(create_refutation))
        .route("/debates/{id}/votes", post(cast_vote).get(get_votes))
        .route("/debates/{id}/likes", post(add_like).get(get_likes))
}
