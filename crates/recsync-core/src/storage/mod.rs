//! Local persistent storage for collection snapshots.
//!
//! A store is a flat key/value space of serialized snapshots. The controller
//! uses it through [`LocalMirror`] as the legacy persistence path: loaded once
//! at activation as the fallback for a failed remote load, rewritten on every
//! cache change.

mod file;
mod memory;

use std::marker::PhantomData;
use std::sync::Arc;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use crate::error::{Error, Result};
use crate::models::{Collection, Record, Snapshot};

/// Synchronous key/value storage for serialized snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing was ever written.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn store(&self, key: &str, value: &str) -> Result<()>;
}

/// Typed view of one snapshot slot in a [`SnapshotStore`].
pub struct LocalMirror<R> {
    store: Arc<dyn SnapshotStore>,
    key: String,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for LocalMirror<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> LocalMirror<R> {
    pub fn new(store: Arc<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _record: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the mirrored snapshot.
    ///
    /// Unreadable or corrupt entries are logged and treated as absent.
    pub fn load(&self) -> Option<Snapshot<R>> {
        let raw = match self.store.load(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!("Failed to read local mirror '{}': {}", self.key, error);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                tracing::warn!("Ignoring corrupt local mirror '{}': {}", self.key, error);
                None
            }
        }
    }

    /// Overwrite the mirrored snapshot.
    pub fn persist(&self, snapshot: &Snapshot<R>) -> Result<()> {
        let raw = serde_json::to_string(snapshot)
            .map_err(|error| Error::PersistenceWriteFailure(error.to_string()))?;
        self.store.store(&self.key, &raw)
    }
}

impl<R: Collection> LocalMirror<R> {
    /// Mirror stored under the fixed key `"<collection>-data"`.
    pub fn for_collection(store: Arc<dyn SnapshotStore>) -> Self {
        Self::new(store, format!("{}-data", R::NAME))
    }
}
