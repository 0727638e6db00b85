//! Token storage
//!
//! The HTTP layer only sees the [`TokenStore`] trait. Absence is a normal
//! state (not logged in), and stores never fail: durable I/O problems are
//! logged and treated as "no token".

use crate::types::Token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Holds the current credential
pub trait TokenStore: Send + Sync {
    /// Current token, if any. No side effects.
    fn get_token(&self) -> Option<Token>;

    /// Replace the current token. Idempotent.
    fn set_token(&self, token: Token);
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-process token slot
///
/// Backed by a watch channel so that other parts of an application (a UI
/// state container, a status line) can follow token changes through
/// [`MemoryTokenStore::subscribe`].
#[derive(Debug)]
pub struct MemoryTokenStore {
    tx: watch::Sender<Option<Token>>,
}

impl MemoryTokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Create a store holding `token`
    pub fn with_token(token: Token) -> Self {
        let (tx, _rx) = watch::channel(Some(token));
        Self { tx }
    }

    /// Receive every subsequent token change
    pub fn subscribe(&self) -> watch::Receiver<Option<Token>> {
        self.tx.subscribe()
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_token(&self) -> Option<Token> {
        self.tx.borrow().clone()
    }

    fn set_token(&self, token: Token) {
        self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&token) {
                false
            } else {
                *current = Some(token);
                true
            }
        });
    }
}

// ============================================================================
// File store
// ============================================================================

/// On-disk token record
#[derive(Debug, Serialize, Deserialize)]
struct TokenRecord {
    token: Token,
    updated_at: DateTime<Utc>,
}

/// Durable token store backed by a JSON file
///
/// Writes go to a temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store for the given path. The file need not exist.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the stored token was last written
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.read_record().map(|r| r.updated_at)
    }

    fn read_record(&self) -> Option<TokenRecord> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read token file {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str::<TokenRecord>(&contents) {
            Ok(record) if !record.token.as_str().is_empty() => Some(record),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring malformed token file {}: {e}", self.path.display());
                None
            }
        }
    }

    fn write_record(&self, record: &TokenRecord) -> std::io::Result<()> {
        let contents = serde_json::to_string_pretty(record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &self.path)
    }
}

impl TokenStore for FileTokenStore {
    fn get_token(&self) -> Option<Token> {
        self.read_record().map(|r| r.token)
    }

    fn set_token(&self, token: Token) {
        let record = TokenRecord {
            token,
            updated_at: Utc::now(),
        };
        match self.write_record(&record) {
            Ok(()) => debug!("Token persisted to {}", self.path.display()),
            Err(e) => warn!("Failed to write token file {}: {e}", self.path.display()),
        }
    }
}

// ============================================================================
// Layered store
// ============================================================================

/// Memory first, durable fallback
///
/// `get_token` reads the in-memory value and only consults the durable
/// store when memory is empty. `set_token` writes both.
pub struct LayeredTokenStore {
    memory: MemoryTokenStore,
    durable: Option<Arc<dyn TokenStore>>,
}

impl LayeredTokenStore {
    /// Create a store with only the in-memory layer
    pub fn in_memory() -> Self {
        Self {
            memory: MemoryTokenStore::new(),
            durable: None,
        }
    }

    /// Create a store with a durable fallback
    pub fn with_durable(durable: Arc<dyn TokenStore>) -> Self {
        Self {
            memory: MemoryTokenStore::new(),
            durable: Some(durable),
        }
    }

    /// Follow in-memory token changes
    pub fn subscribe(&self) -> watch::Receiver<Option<Token>> {
        self.memory.subscribe()
    }
}

impl TokenStore for LayeredTokenStore {
    fn get_token(&self) -> Option<Token> {
        self.memory
            .get_token()
            .or_else(|| self.durable.as_ref().and_then(|d| d.get_token()))
    }

    fn set_token(&self, token: Token) {
        if let Some(durable) = &self.durable {
            durable.set_token(token.clone());
        }
        self.memory.set_token(token);
    }
}

impl std::fmt::Debug for LayeredTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredTokenStore")
            .field("memory", &self.memory)
            .field("has_durable", &self.durable.is_some())
            .finish()
    }
}
