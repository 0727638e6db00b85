//! HTTP client module
//!
//! Authenticated HTTP client with single-flight token refresh.
//!
//! # Features
//!
//! - **Token Attachment**: The stored token is sent on every request
//! - **Refresh and Retry**: A 401/403 triggers one shared refresh and one resubmission
//! - **No Recursion**: The refresh call itself never triggers a refresh

mod client;
mod dispatch;
mod request;

pub use client::AuthenticatedHttpClient;
pub use dispatch::{extract_token, Dispatcher, EndpointRefresher};
pub use request::OutboundRequest;
