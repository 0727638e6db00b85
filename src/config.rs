//! Client configuration
//!
//! `ClientConfig` describes where the backend lives, how the token travels
//! on the wire and how the refresh endpoint is reached. It can be loaded
//! from YAML or assembled with the builder.
//!
//! ```yaml
//! origin: https://backend.example.com
//! api_prefix: /api
//! refresh_path: /auth/refresh
//! auth_header: authorization
//! token_fields: [token, accessToken]
//! refresh_timeout_secs: 10
//! token_file: ~/.config/tokenflight/token.json
//! ```

use crate::error::{Error, Result};
use crate::types::StringMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default backend origin (local development server)
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Configuration for [`AuthenticatedHttpClient`](crate::http::AuthenticatedHttpClient)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host of the backend
    pub origin: String,

    /// Path prefix appended to the origin
    pub api_prefix: String,

    /// Explicit base URL, overrides `origin` + `api_prefix`
    pub base_url: Option<String>,

    /// Credential-renewal endpoint, relative to the base URL
    pub refresh_path: String,

    /// Header carrying the token
    pub auth_header: String,

    /// Optional scheme prefix (e.g. "Bearer "). The backend expects the raw
    /// token, so this is unset by default.
    pub auth_scheme: Option<String>,

    /// Response fields holding a renewed token, checked in order
    pub token_fields: Vec<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Upper bound on how long a refresh may take, unbounded if unset
    pub refresh_timeout_secs: Option<u64>,

    /// Keep cookies between requests (refresh cookies live there)
    pub with_credentials: bool,

    /// User agent string
    pub user_agent: String,

    /// Headers added to every request
    pub default_headers: StringMap,

    /// Durable token file
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            api_prefix: "/api".to_string(),
            base_url: None,
            refresh_path: "/auth/refresh".to_string(),
            auth_header: "authorization".to_string(),
            auth_scheme: None,
            token_fields: vec!["token".to_string(), "accessToken".to_string()],
            timeout_secs: 30,
            refresh_timeout_secs: None,
            with_credentials: true,
            user_agent: format!("tokenflight/{}", env!("CARGO_PKG_VERSION")),
            default_headers: StringMap::new(),
            token_file: None,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Parse and validate a config from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.token_file = config.token_file.map(|path| expand_home(&path));
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Resolved base URL for relative request paths
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => {
                let origin = self.origin.trim_end_matches('/');
                let prefix = self.api_prefix.trim_matches('/');
                if prefix.is_empty() {
                    origin.to_string()
                } else {
                    format!("{origin}/{prefix}")
                }
            }
        }
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Refresh timeout, if one is configured
    pub fn refresh_timeout(&self) -> Option<Duration> {
        self.refresh_timeout_secs.map(Duration::from_secs)
    }

    /// Header value for a token, with the scheme prefix if configured
    pub fn auth_value(&self, token: &str) -> String {
        format!("{}{}", self.auth_scheme.as_deref().unwrap_or(""), token)
    }

    /// Check that the config can be used to build a client
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url();
        Url::parse(&base).map_err(|e| Error::invalid_value("base_url", format!("{base}: {e}")))?;

        if self.refresh_path.trim().is_empty() {
            return Err(Error::missing_field("refresh_path"));
        }
        if self.auth_header.trim().is_empty() {
            return Err(Error::missing_field("auth_header"));
        }
        // The token header is owned by the client, a default would be sent twice
        if self
            .default_headers
            .keys()
            .any(|key| key.eq_ignore_ascii_case(&self.auth_header))
        {
            return Err(Error::invalid_value(
                "default_headers",
                format!("must not contain the auth header '{}'", self.auth_header),
            ));
        }
        if self.token_fields.iter().all(|f| f.trim().is_empty()) {
            return Err(Error::missing_field("token_fields"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be greater than 0"));
        }
        if self.refresh_timeout_secs == Some(0) {
            return Err(Error::invalid_value(
                "refresh_timeout_secs",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Resolve a leading `~` against `$HOME`; other paths are returned as is
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// Builder for [`ClientConfig`]
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the backend origin
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.config.origin = origin.into();
        self
    }

    /// Set the API path prefix
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.api_prefix = prefix.into();
        self
    }

    /// Set an explicit base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the refresh endpoint path
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.config.refresh_path = path.into();
        self
    }

    /// Set the authorization header name
    pub fn auth_header(mut self, name: impl Into<String>) -> Self {
        self.config.auth_header = name.into();
        self
    }

    /// Set a scheme prefix for the token value
    pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.auth_scheme = Some(scheme.into());
        self
    }

    /// Replace the response fields searched for a renewed token
    pub fn token_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.token_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Bound the time a refresh may take
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.config.refresh_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Enable or disable the cookie store
    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.config.with_credentials = enabled;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the durable token file
    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.token_file = Some(path.into());
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
