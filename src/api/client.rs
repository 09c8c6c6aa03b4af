use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ApiTransport, QueryParams, TokenSource};
use crate::config::ApiConfig;
use crate::error::FetchError;

/// reqwest-backed transport with bearer-token injection.
///
/// The overall request timeout is fixed when the client is built. The token
/// getter is awaited before every request so a refreshed session is picked
/// up without rebuilding the client.
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl HttpApiClient {
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("costboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Point the client at another server (tests, staging).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn bearer(&self) -> Option<SecretString> {
        match self.tokens.token().await {
            Ok(Some(token)) => Some(token),
            Ok(None) => {
                warn!("no session token available, sending request unauthenticated");
                None
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "failed to obtain session token, sending request unauthenticated"
                );
                None
            }
        }
    }
}

#[async_trait]
impl ApiTransport for HttpApiClient {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value, FetchError> {
        let token = self.bearer().await;
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(
            path,
            params = ?params.pairs(),
            has_token = token.is_some(),
            request_id = %request_id,
            "api request"
        );

        let mut req = self
            .client
            .get(self.url(path))
            .query(params.pairs())
            .header("accept", "application/json")
            .header("x-request-id", &request_id);
        if let Some(token) = &token {
            req = req.bearer_auth(token.expose_secret());
        }

        let response = req.send().await.map_err(|source| FetchError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED {
                warn!(path, had_token = token.is_some(), "api rejected credentials (401)");
            } else {
                warn!(path, status = status.as_u16(), "api request failed");
            }
            return Err(FetchError::status(path, status.as_u16(), body));
        }

        let body = response.text().await.map_err(|source| FetchError::Transport {
            path: path.to_string(),
            source,
        })?;
        debug!(path, status = status.as_u16(), bytes = body.len(), "api response");

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            path: path.to_string(),
            source,
        })
    }
}
