//! Headline lookup with a DB-backed TTL cache, feeding debate topic
//! discovery in the UI.

use chrono::Duration;
use db::models::news_cache::NewsCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("news endpoint not configured")]
    NotConfigured,
    #[error("news fetch failed: {0}")]
    Fetch(String),
    #[error("cached payload is unreadable: {0}")]
    CorruptPayload(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

#[derive(Clone)]
pub struct NewsService {
    pool: SqlitePool,
    http: reqwest::Client,
    endpoint: Option<String>,
    ttl: Duration,
}

impl NewsService {
    pub fn new(pool: SqlitePool, endpoint: Option<String>, ttl_minutes: i64) -> Self {
        Self {
            pool,
            http: reqwest::Client::new(),
            endpoint,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Headlines for a topic: fresh cache row if available, otherwise fetch
    /// and upsert. A failed refresh falls back to a stale row when one
    /// exists.
    pub async fn headlines(&self, topic: &str) -> Result<Vec<NewsArticle>, NewsError> {
        let cached = NewsCache::find_by_topic(&self.pool, topic).await?;
        if let Some(row) = &cached
            && row.is_fresh(self.ttl)
        {
            return parse_payload(&row.payload);
        }

        match self.fetch(topic).await {
            Ok(articles) => {
                let payload = serde_json::to_string(&articles)
                    .map_err(|e| NewsError::CorruptPayload(e.to_string()))?;
                NewsCache::upsert(&self.pool, topic, &payload).await?;
                info!(topic, count = articles.len(), "refreshed news cache");
                Ok(articles)
            }
            Err(e) => match cached {
                Some(stale) => {
                    warn!(topic, error = %e, "news refresh failed, serving stale cache");
                    parse_payload(&stale.payload)
                }
                None => Err(e),
            },
        }
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<NewsArticle>, NewsError> {
        let endpoint = self.endpoint.as_deref().ok_or(NewsError::NotConfigured)?;
        let body: Value = self
            .http
            .get(endpoint)
            .query(&[("q", topic)])
            .send()
            .await
            .map_err(|e| NewsError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| NewsError::Fetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| NewsError::Fetch(e.to_string()))?;
        Ok(extract_articles(body))
    }
}

fn parse_payload(payload: &str) -> Result<Vec<NewsArticle>, NewsError> {
    serde_json::from_str(payload).map_err(|e| NewsError::CorruptPayload(e.to_string()))
}

/// Accept either a bare array of articles or the common `{"articles": [...]}`
/// wrapper, skipping entries that don't carry a title and url.
fn extract_articles(body: Value) -> Vec<NewsArticle> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("articles") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}
