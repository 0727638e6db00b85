//! Single-flight token refresh
//!
//! Any number of requests may discover at the same time that their token
//! was rejected. [`RefreshCoordinator::refresh`] makes sure only one of them
//! actually calls the refresh endpoint; the others attach to the pending
//! refresh and receive the same outcome.

use super::store::TokenStore;
use crate::error::{Error, Result};
use crate::types::Token;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Performs the credential-renewal network call
#[async_trait]
pub trait Refresher: Send + Sync {
    /// Ask the backend for a new token.
    ///
    /// `Ok(None)` means the call succeeded but carried no token.
    async fn refresh(&self) -> Result<Option<Token>>;
}

/// Outcome handed to every waiter of one refresh
pub type RefreshOutcome = std::result::Result<Option<Token>, Arc<Error>>;

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Slot for the refresh currently in flight
///
/// Holds at most one pending refresh. Owned by a coordinator, so separate
/// clients never share a slot.
#[derive(Default)]
pub struct RefreshState {
    pending: Mutex<Option<PendingRefresh>>,
}

impl RefreshState {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh is currently in flight
    pub async fn is_pending(&self) -> bool {
        self.pending.lock().await.is_some()
    }

    async fn clear(&self) {
        self.pending.lock().await.take();
    }
}

impl std::fmt::Debug for RefreshState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshState").finish_non_exhaustive()
    }
}

/// Coalesces concurrent refresh requests into one network call
#[derive(Clone)]
pub struct RefreshCoordinator {
    refresher: Arc<dyn Refresher>,
    store: Arc<dyn TokenStore>,
    state: Arc<RefreshState>,
    timeout: Option<Duration>,
}

impl RefreshCoordinator {
    /// Create a coordinator with its own refresh slot
    pub fn new(refresher: Arc<dyn Refresher>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            refresher,
            store,
            state: Arc::new(RefreshState::new()),
            timeout: None,
        }
    }

    /// Bound how long a refresh may take
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The refresh slot owned by this coordinator
    pub fn state(&self) -> &Arc<RefreshState> {
        &self.state
    }

    /// Obtain a new token, joining the pending refresh if there is one.
    ///
    /// On success the token (if any) has already been written to the store
    /// by the time this returns.
    pub async fn refresh(&self) -> Result<Option<Token>> {
        let pending = {
            let mut slot = self.state.pending.lock().await;
            if let Some(pending) = slot.as_ref() {
                debug!("Joining in-flight token refresh");
                pending.clone()
            } else {
                let pending = self.start();
                *slot = Some(pending.clone());
                pending
            }
        };

        pending.await.map_err(Error::refresh_failed)
    }

    /// Spawn the refresh task and wrap it for sharing.
    ///
    /// Must be called with the slot locked: the task clears the slot when it
    /// settles, which cannot happen before the caller has stored it.
    fn start(&self) -> PendingRefresh {
        info!("Starting token refresh");

        let refresher = Arc::clone(&self.refresher);
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, refresher.refresh()).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    }),
                },
                None => refresher.refresh().await,
            };

            match &outcome {
                Ok(Some(token)) => {
                    // Stores may do file I/O; keep it off the async workers
                    let token = token.clone();
                    if let Err(e) =
                        tokio::task::spawn_blocking(move || store.set_token(token)).await
                    {
                        warn!("Persisting refreshed token failed: {e}");
                    }
                    info!("Token refresh succeeded");
                }
                Ok(None) => warn!("Token refresh succeeded without a token, keeping current one"),
                Err(e) => warn!("Token refresh failed: {e}"),
            }

            state.clear().await;
            outcome.map_err(Arc::new)
        });

        let state = Arc::clone(&self.state);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The task died before it could clear the slot
                    state.clear().await;
                    Err(Arc::new(Error::Other(format!("Token refresh task failed: {e}"))))
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
