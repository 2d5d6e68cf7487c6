//! Route for cached news headlines.

use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use serde::Deserialize;
use services::services::news::NewsArticle;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

const DEFAULT_TOPIC: &str = "debate";

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub topic: Option<String>,
}

pub async fn get_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<NewsArticle>>>, ApiError> {
    let topic = query.topic.as_deref().unwrap_or(DEFAULT_TOPIC);
    let articles = state.news.headlines(topic).await?;
    Ok(ResponseJson(ApiResponse::success(articles)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/news", get(get_news))
}
