use std::net::Ipv4Addr;

use anyhow::Context;
use axum::Router;
use db::DBService;
use services::services::{
    config::Config,
    debate::DebateService,
    gateway::GatewayClient,
    news::NewsService,
    practice::PracticeService,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod routes;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub debates: DebateService,
    pub practice: PracticeService,
    pub news: NewsService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let db = DBService::new(&config.database_url)
        .await
        .context("opening database")?;
    let gateway = GatewayClient::new(&config)?;

    let state = AppState {
        debates: DebateService::new(db.pool.clone(), gateway.clone()),
        practice: PracticeService::new(db.pool.clone(), gateway),
        news: NewsService::new(
            db.pool.clone(),
            config.news_endpoint.clone(),
            config.news_ttl_minutes,
        ),
        db,
    };

    let app = Router::new()
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
