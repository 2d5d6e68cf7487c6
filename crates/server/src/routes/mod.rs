use axum::Router;

use crate::AppState;

pub mod debates;
pub mod news;
pub mod practice;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(debates::router())
        .merge(practice::router())
        .merge(news::router())
}
