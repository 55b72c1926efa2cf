//! Remote quote source
//!
//! The remote is a placeholder REST collection: GET returns posts with at
//! least `id` and `title`, POST echoes back a fabricated object without
//! storing anything.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::models::{Quote, QuoteId};

/// `userId` sent with every post
const POST_USER_ID: u32 = 1;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: HTTP {0}")]
    Status(u16),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// An item of the remote collection
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemotePost {
    pub id: QuoteId,
    pub title: String,
}

/// Body of a create request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub user_id: u32,
}

impl NewPost {
    /// Map a quote onto the remote's post shape
    pub fn from_quote(quote: &Quote) -> Self {
        Self {
            title: quote.text.clone(),
            body: quote.category.clone(),
            user_id: POST_USER_ID,
        }
    }
}

/// Source of remote quotes
#[async_trait]
pub trait QuoteRemote: Send + Sync {
    /// Fetch the whole remote collection
    async fn fetch_posts(&self) -> RemoteResult<Vec<RemotePost>>;

    /// Create a post; the echoed response is returned unvalidated
    async fn create_post(&self, post: &NewPost) -> RemoteResult<serde_json::Value>;
}

/// HTTP implementation of [`QuoteRemote`]
#[derive(Clone)]
pub struct HttpRemote {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mantra/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { endpoint, client })
    }

    pub fn from_config(config: &Config) -> RemoteResult<Self> {
        Self::new(config.api_url.clone(), config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QuoteRemote for HttpRemote {
    async fn fetch_posts(&self) -> RemoteResult<Vec<RemotePost>> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        Ok(response.json::<Vec<RemotePost>>().await?)
    }

    async fn create_post(&self, post: &NewPost) -> RemoteResult<serde_json::Value> {
        let body =
            serde_json::to_string(post).map_err(|e| RemoteError::InvalidPayload(e.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let echoed = response.json::<serde_json::Value>().await?;
        debug!("Quote posted to server: {}", echoed);
        Ok(echoed)
    }
}

fn status_error(status: StatusCode) -> RemoteError {
    RemoteError::Status(status.as_u16())
}

fn normalize_endpoint(raw: String) -> RemoteResult<String> {
    let endpoint = raw.trim();
    if endpoint.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "endpoint must not be empty".to_string(),
        ));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}
