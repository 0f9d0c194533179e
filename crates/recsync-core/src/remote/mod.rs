//! Remote collection store.
//!
//! The remote authority holds one snapshot per collection and supports three
//! operations: full read, staleness check against a known version, and full
//! replace. Each call is bounded by a timeout and resolves to an error when
//! the bound is exceeded; the in-flight request is dropped at that point.

mod http;

use std::future::Future;

pub use http::HttpRemoteStore;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{Collection, Snapshot};

/// Operations against the remote copy of collection `R`.
pub trait RemoteStore<R: Collection>: Send + Sync + 'static {
    /// Read the whole collection.
    fn fetch_all(&self) -> impl Future<Output = Result<Snapshot<R>>> + Send;

    /// Ask whether `known_version` is behind the remote version.
    fn check_stale(&self, known_version: i64) -> impl Future<Output = Result<bool>> + Send;

    /// Replace the whole remote collection with `snapshot`.
    fn save(&self, snapshot: &Snapshot<R>) -> impl Future<Output = Result<()>> + Send;

    /// Whether a remote authority stands behind this store. When it doesn't,
    /// a failed load is the normal case rather than an outage.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Remote selected at runtime from configuration.
#[derive(Debug, Clone)]
pub enum RemoteBackend {
    Http(HttpRemoteStore),
    /// No remote configured: the local mirror is the only persistence.
    LocalOnly,
}

impl RemoteBackend {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        match config.api_base_url.as_deref() {
            Some(base_url) => {
                tracing::info!("Remote sync enabled: {}", base_url);
                Ok(Self::Http(HttpRemoteStore::new(base_url, config.timeouts)?))
            }
            None => {
                tracing::info!("Running in local-only mode (no RECSYNC_API_BASE_URL)");
                Ok(Self::LocalOnly)
            }
        }
    }

    pub const fn is_local_only(&self) -> bool {
        matches!(self, Self::LocalOnly)
    }
}

impl<R: Collection> RemoteStore<R> for RemoteBackend {
    async fn fetch_all(&self) -> Result<Snapshot<R>> {
        match self {
            Self::Http(store) => RemoteStore::<R>::fetch_all(store).await,
            Self::LocalOnly => Err(Error::RemoteUnavailable(
                "no remote configured".to_string(),
            )),
        }
    }

    async fn check_stale(&self, known_version: i64) -> Result<bool> {
        match self {
            Self::Http(store) => RemoteStore::<R>::check_stale(store, known_version).await,
            Self::LocalOnly => Ok(false),
        }
    }

    async fn save(&self, snapshot: &Snapshot<R>) -> Result<()> {
        match self {
            Self::Http(store) => RemoteStore::<R>::save(store, snapshot).await,
            Self::LocalOnly => Ok(()),
        }
    }

    fn is_configured(&self) -> bool {
        !self.is_local_only()
    }
}
