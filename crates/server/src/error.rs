use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{debate::DebateError, news::NewsError, practice::PracticeError};
use utils::response::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Debate(#[from] DebateError),
    #[error(transparent)]
    Practice(#[from] PracticeError),
    #[error(transparent)]
    News(#[from] NewsError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("debate not found")]
    DebateNotFound,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::DebateNotFound
            | Self::Debate(DebateError::NotFound)
            | Self::Debate(DebateError::Tree(_))
            | Self::Practice(PracticeError::NotFound) => StatusCode::NOT_FOUND,
            Self::Debate(DebateError::EmptyStatement)
            | Self::Practice(PracticeError::EmptyMessage) => StatusCode::BAD_REQUEST,
            Self::Debate(DebateError::Gateway(_))
            | Self::Practice(PracticeError::Gateway(_))
            | Self::News(NewsError::Fetch(_)) => StatusCode::BAD_GATEWAY,
            Self::News(NewsError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}
