//! recsync-core - Core library for recsync
//!
//! Keeps an in-memory working copy of a small record collection, applies edits
//! optimistically, saves them to a remote collection endpoint in the background,
//! and reconciles with that endpoint by polling and in-process change notifications.

pub mod bus;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod mutators;
pub mod remote;
pub mod storage;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use bus::{ChangeBus, Subscription};
pub use config::ClientConfig;
pub use controller::{ControllerOptions, SyncController, SyncPhase};
pub use error::{Error, Result};
pub use models::{
    Collection, Magazine, ParentRecord, Record, RecordId, Session, Snapshot, Speaker,
};
pub use remote::{HttpRemoteStore, RemoteBackend, RemoteStore};
pub use storage::{FileSnapshotStore, LocalMirror, MemorySnapshotStore, SnapshotStore};
