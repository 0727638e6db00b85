//! Request dispatch and the refresh endpoint
//!
//! [`Dispatcher`] sends one request with no retry logic: it attaches the
//! stored token on the way out and turns any non-2xx status into
//! [`Error::HttpStatus`]. Both the authenticated client and the refresh call
//! go through it.

use super::request::OutboundRequest;
use crate::auth::{Refresher, TokenStore};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::Token;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends single requests with the stored token attached
pub struct Dispatcher {
    client: Client,
    config: ClientConfig,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .cookie_store(config.with_credentials)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            config,
            store,
        })
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token store consulted before every request
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Send a request once
    pub async fn send(&self, request: &OutboundRequest) -> Result<Response> {
        let url = self.build_url(&request.path);
        let mut req = self.client.request(request.method.clone(), &url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        // An explicit header (e.g. set after a refresh) wins over the store
        if !request.unauthenticated && request.header_value(&self.config.auth_header).is_none() {
            if let Some(token) = self.store.get_token() {
                req = req.header(
                    self.config.auth_header.as_str(),
                    self.config.auth_value(token.as_str()),
                );
            }
        }

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                let timeout = request.timeout.unwrap_or_else(|| self.config.timeout());
                Error::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("{} {} -> {}", request.method, url, status.as_u16());
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        debug!("{} {} -> {}", request.method, url, status.as_u16());
        Ok(response)
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let path = path.trim_start_matches('/');
        format!("{}/{path}", self.base_url)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Calls the backend's credential-renewal endpoint
///
/// `POST {refresh_path}` with an empty JSON object. The request carries the
/// current token like any other, but is flagged so that its own 401/403
/// never starts another refresh.
#[derive(Debug, Clone)]
pub struct EndpointRefresher {
    dispatcher: Arc<Dispatcher>,
}

impl EndpointRefresher {
    /// Create a refresher sharing the client's dispatcher
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Refresher for EndpointRefresher {
    async fn refresh(&self) -> Result<Option<Token>> {
        let config = self.dispatcher.config();
        let request = OutboundRequest::post(config.refresh_path.clone())
            .json(Value::Object(serde_json::Map::new()))
            .skip_auth_refresh();

        let response = self.dispatcher.send(&request).await?;
        let text = response.text().await?;

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) => {
                warn!("Refresh response is not JSON, no token update: {e}");
                return Ok(None);
            }
        };

        Ok(extract_token(&body, &config.token_fields))
    }
}

/// First non-empty string found under one of `fields`
pub fn extract_token(body: &Value, fields: &[String]) -> Option<Token> {
    fields
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .find_map(Token::new)
}
