use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ShortenerConfig;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("shortener request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("shortener responded with HTTP {0}")]
    Status(StatusCode),
    #[error("shortener returned malformed JSON: {0}")]
    MalformedBody(#[source] serde_json::Error),
    #[error("shortener reported an error: {0}")]
    Api(String),
    #[error("shortener returned an unexpected response: {0}")]
    Unexpected(String),
}

/// Turns a long URL into a short, trackable one.
#[async_trait]
pub trait Shortener: Send + Sync {
    async fn shorten(&self, long_url: &str) -> Result<String, GatewayError>;
}

/// Client for GPLinks-style `GET <endpoint>?api=<key>&url=<target>` shorteners.
#[derive(Clone)]
pub struct GpLinksClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl GpLinksClient {
    pub fn new(config: &ShortenerConfig) -> Result<Self> {
        assert!(!config.endpoint.is_empty(), "Shortener endpoint must be provided");
        assert!(!config.api_key.is_empty(), "Shortener API key must be provided");
        let timeout = config.request_timeout();

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| format!("Failed to build HTTP client for {}", config.endpoint))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Shortener for GpLinksClient {
    async fn shorten(&self, long_url: &str) -> Result<String, GatewayError> {
        assert!(!long_url.is_empty(), "Target URL cannot be empty");

        // The request URL carries the API key, so it is stripped from transport errors.
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("api", self.api_key.as_str()), ("url", long_url)])
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| GatewayError::Transport(err.without_url()))?;
        let short_url = interpret_response(&body)?;
        debug!(%short_url, "Shortener issued link");
        Ok(short_url)
    }
}

/// Accepts only `{"status": "success", "shortenedUrl": "<non-empty>"}`.
pub fn interpret_response(body: &[u8]) -> Result<String, GatewayError> {
    let data: Value = serde_json::from_slice(body).map_err(GatewayError::MalformedBody)?;

    let status = data.get("status").and_then(Value::as_str);
    let short_url = data
        .get("shortenedUrl")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty());

    if let (Some("success"), Some(url)) = (status, short_url) {
        return Ok(url.to_string());
    }

    match data.get("error") {
        Some(Value::Null) | Some(Value::Bool(false)) | None => {}
        Some(Value::String(message)) if message.is_empty() => {}
        Some(Value::String(message)) => return Err(GatewayError::Api(message.clone())),
        Some(other) => return Err(GatewayError::Api(other.to_string())),
    }

    let detail = data
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| truncate_for_log(&data.to_string()));
    warn!("Shortener returned unexpected response: {detail}");
    Err(GatewayError::Unexpected(detail))
}

fn truncate_for_log(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() <= LIMIT {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(LIMIT).collect();
    truncated.push('…');
    truncated
}
