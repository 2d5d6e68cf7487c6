//! Chat-completions client for the LLM gateway that backs argument
//! generation and practice replies.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::{config::Config, stream::StreamAssembler};

const COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("json error: {0}")]
    Serde(String),
}

impl GatewayError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// A message in the conversation sent to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for the chat-completions endpoint.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

impl ChatResponse {
    /// Extract the text content from the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// Chat-completions client for an OpenAI-compatible gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GatewayClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("agora/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.gateway_api_key.clone(),
            base_url: config.gateway_base_url.trim_end_matches('/').to_string(),
            model: config.gateway_model.clone(),
        })
    }

    /// Send a completion request, retrying transient failures.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<ChatResponse, GatewayError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
            temperature,
            stream: None,
        };

        (|| async { self.send_request(&request).await })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(30))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &GatewayError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "gateway call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        let res = self
            .http
            .post(format!("{}{}", self.base_url, COMPLETIONS_PATH))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<ChatResponse>()
                .await
                .map_err(|e| GatewayError::Serde(e.to_string())),
            s => Err(error_for_status(s, res.text().await.unwrap_or_default())),
        }
    }

    /// Stream a completion, invoking `on_delta` for every extracted text
    /// fragment. Returns the full assembled reply.
    pub async fn stream<F>(
        &self,
        messages: Vec<Message>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        mut on_delta: F,
    ) -> Result<String, GatewayError>
    where
        F: FnMut(&str),
    {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
            temperature,
            stream: Some(true),
        };

        let mut response = self
            .http
            .post(format!("{}{}", self.base_url, COMPLETIONS_PATH))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_for_status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }

        let mut assembler = StreamAssembler::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            let update = assembler.feed(&chunk);
            if !update.delta.is_empty() {
                on_delta(&update.delta);
            }
            if update.done {
                break;
            }
        }
        Ok(assembler.finalize())
    }

    /// Send a prompt expecting JSON in the reply, tolerating markdown code
    /// fences around it.
    pub async fn ask_json<T: for<'de> Deserialize<'de>>(
        &self,
        messages: Vec<Message>,
        max_tokens: Option<u32>,
    ) -> Result<T, GatewayError> {
        let response = self.complete(messages, max_tokens, Some(0.2)).await?;
        let text = response
            .text()
            .ok_or_else(|| GatewayError::Serde("no choices in response".to_string()))?;

        if text.trim().is_empty() {
            tracing::error!("gateway returned an empty response");
            return Err(GatewayError::Serde("empty response".to_string()));
        }

        let json_str = extract_json(text);
        serde_json::from_str(json_str).map_err(|e| {
            tracing::error!(
                json_error = %e,
                response_preview = %json_str.chars().take(500).collect::<String>(),
                "failed to parse JSON response from gateway"
            );
            GatewayError::Serde(e.to_string())
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

fn error_for_status(status: StatusCode, body: String) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED => GatewayError::InvalidApiKey,
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
        s => GatewayError::Http {
            status: s.as_u16(),
            body,
        },
    }
}

/// Extract JSON from a string that might contain markdown code blocks.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        // Skip past any language identifier on the same line.
        let content_start = text[content_start..]
            .find('\n')
            .map(|i| content_start + i + 1)
            .unwrap_or(content_start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    text
}
