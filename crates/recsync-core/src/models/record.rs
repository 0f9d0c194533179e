//! Record traits, ids and collection snapshots

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Client-generated record identifier of the form `<kind>-<creation timestamp>`.
///
/// Uniqueness is best effort: ids are not checked against the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Build an id for a record of kind `prefix` created at `timestamp` (Unix ms).
    #[must_use]
    pub fn generate(prefix: &str, timestamp: i64) -> Self {
        Self(format!("{prefix}-{timestamp}"))
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation timestamp encoded in the id, if it was generated by this client.
    #[must_use]
    pub fn created_at(&self) -> Option<i64> {
        self.0
            .rsplit_once('-')
            .and_then(|(_, suffix)| suffix.parse().ok())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

/// A user-editable record held in a collection snapshot.
///
/// `Draft` is the payload for creation (everything but the id) and `Patch`
/// is a shallow partial update: every field set in the patch replaces the
/// corresponding field wholesale.
pub trait Record:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Draft: Send + 'static;
    type Patch: Send + 'static;

    /// Kind prefix used when generating ids, e.g. `"magazine"`.
    const ID_PREFIX: &'static str;

    fn id(&self) -> &RecordId;

    fn from_draft(id: RecordId, draft: Self::Draft) -> Self;

    fn apply_patch(&mut self, patch: Self::Patch);
}

/// A record kind that is stored as a top-level remote collection.
pub trait Collection: Record {
    /// Collection name used in endpoint paths and notification channels,
    /// e.g. `"magazines"`.
    const NAME: &'static str;
}

/// A record owning a nested sequence of child records.
pub trait ParentRecord: Record {
    type Child: Record;

    fn children(&self) -> &[Self::Child];

    fn children_mut(&mut self) -> &mut Vec<Self::Child>;
}

/// Versioned copy of a whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<R> {
    pub items: Vec<R>,
    /// Logical version stamp (Unix ms); the only input to staleness checks.
    pub last_modified: i64,
}

impl<R> Snapshot<R> {
    /// An empty collection stamped with `last_modified`.
    #[must_use]
    pub const fn empty(last_modified: i64) -> Self {
        Self {
            items: Vec::new(),
            last_modified,
        }
    }

    /// Version to stamp on the successor of this snapshot.
    ///
    /// Normally the wall clock, but never less than one past the current stamp
    /// so versions strictly increase even within a millisecond or under clock skew.
    #[must_use]
    pub fn next_stamp(&self, now: i64) -> i64 {
        now.max(self.last_modified.saturating_add(1))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<R: Record> Snapshot<R> {
    /// Find an item by id.
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<&R> {
        self.items.iter().find(|item| item.id() == id)
    }
}
