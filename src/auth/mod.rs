//! Authentication module
//!
//! Token storage and single-flight token refresh.
//!
//! The [`TokenStore`] holds the current credential; the
//! [`RefreshCoordinator`] renews it through a [`Refresher`] and guarantees
//! that concurrent callers share one refresh call.

mod refresh;
mod store;

pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshState, Refresher};
pub use store::{FileTokenStore, LayeredTokenStore, MemoryTokenStore, TokenStore};
