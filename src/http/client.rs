//! Authenticated HTTP client
//!
//! Wraps the [`Dispatcher`] with the response phase of the auth cycle:
//! - 2xx responses are returned unchanged
//! - a 401/403 on a request that was not yet retried (and is neither the
//!   refresh call itself nor marked unauthenticated) triggers a shared token
//!   refresh and exactly one resubmission
//! - everything else is returned to the caller as is

use super::dispatch::{Dispatcher, EndpointRefresher};
use super::request::OutboundRequest;
use crate::auth::{RefreshCoordinator, Refresher, TokenStore};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::Token;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP client with transparent token refresh
#[derive(Clone)]
pub struct AuthenticatedHttpClient {
    dispatcher: Arc<Dispatcher>,
    coordinator: RefreshCoordinator,
}

impl AuthenticatedHttpClient {
    /// Create a client that refreshes through the configured endpoint
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let dispatcher = Arc::new(Dispatcher::new(config, store)?);
        let refresher = Arc::new(EndpointRefresher::new(Arc::clone(&dispatcher)));
        Ok(Self::from_parts(dispatcher, refresher))
    }

    /// Create a client with a custom refresher
    pub fn with_refresher(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        refresher: Arc<dyn Refresher>,
    ) -> Result<Self> {
        let dispatcher = Arc::new(Dispatcher::new(config, store)?);
        Ok(Self::from_parts(dispatcher, refresher))
    }

    fn from_parts(dispatcher: Arc<Dispatcher>, refresher: Arc<dyn Refresher>) -> Self {
        let coordinator = RefreshCoordinator::new(refresher, Arc::clone(dispatcher.store()))
            .with_timeout(dispatcher.config().refresh_timeout());
        Self {
            dispatcher,
            coordinator,
        }
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        self.dispatcher.config()
    }

    /// Token store used by this client
    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        self.dispatcher.store()
    }

    /// Refresh coordinator used by this client
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Renew the token now, joining a refresh already in flight
    pub async fn refresh_token(&self) -> Result<Option<Token>> {
        self.coordinator.refresh().await
    }

    /// Send a request, refreshing the token and retrying once on 401/403
    pub async fn request(&self, mut request: OutboundRequest) -> Result<Response> {
        let err = match self.dispatcher.send(&request).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        // Requests that never carry the token have nothing to refresh
        if !err.is_auth_rejection()
            || request.already_retried
            || request.skip_auth_refresh
            || request.unauthenticated
        {
            return Err(err);
        }

        request.already_retried = true;
        warn!(
            "{} {} rejected with {}, refreshing token",
            request.method,
            request.path,
            err.status().unwrap_or_default()
        );

        let token = self.coordinator.refresh().await?;
        if let Some(token) = token {
            let config = self.dispatcher.config();
            request.set_header(&config.auth_header, config.auth_value(token.as_str()));
        }

        debug!("Retrying {} {} after refresh", request.method, request.path);
        self.dispatcher.send(&request).await
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        self.request(OutboundRequest::get(path)).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, path: &str, body: Value) -> Result<Response> {
        self.request(OutboundRequest::post(path).json(body)).await
    }

    /// Make a request and parse the JSON response
    pub async fn request_json<T: DeserializeOwned>(&self, request: OutboundRequest) -> Result<T> {
        let response = self.request(request).await?;
        let json: T = response.json().await.map_err(Error::Http)?;
        Ok(json)
    }

    /// Make a GET request and parse the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(OutboundRequest::get(path)).await
    }

    /// Make a POST request and parse the JSON response
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        self.request_json(OutboundRequest::post(path).json(body))
            .await
    }

    /// Make a request with an arbitrary method
    pub async fn send(&self, method: Method, path: &str) -> Result<Response> {
        self.request(OutboundRequest::new(method, path)).await
    }
}

impl std::fmt::Debug for AuthenticatedHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedHttpClient")
            .field("dispatcher", &self.dispatcher)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
