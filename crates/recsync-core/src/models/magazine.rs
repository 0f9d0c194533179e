//! Magazine model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::{Collection, Record, RecordId};

/// A magazine issue in the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Magazine {
    pub id: RecordId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub publisher: String,
    /// Free-form issue label, e.g. "Spring 2024" or "#42"
    #[serde(default)]
    pub issue: String,
    /// Publication date as entered by the user (ISO-8601 preferred)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_on: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Fields written by other clients; kept so saves don't drop them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Creation payload for a magazine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MagazineDraft {
    pub title: String,
    pub publisher: String,
    pub issue: String,
    pub published_on: Option<String>,
    pub description: String,
    pub cover_url: Option<String>,
}

/// Shallow partial update for a magazine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MagazinePatch {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub issue: Option<String>,
    pub published_on: Option<Option<String>>,
    pub description: Option<String>,
    pub cover_url: Option<Option<String>>,
}

impl MagazinePatch {
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

impl Record for Magazine {
    type Draft = MagazineDraft;
    type Patch = MagazinePatch;

    const ID_PREFIX: &'static str = "magazine";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: MagazineDraft) -> Self {
        Self {
            id,
            title: draft.title,
            publisher: draft.publisher,
            issue: draft.issue,
            published_on: draft.published_on,
            description: draft.description,
            cover_url: draft.cover_url,
            extra: Map::new(),
        }
    }

    fn apply_patch(&mut self, patch: MagazinePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(publisher) = patch.publisher {
            self.publisher = publisher;
        }
        if let Some(issue) = patch.issue {
            self.issue = issue;
        }
        if let Some(published_on) = patch.published_on {
            self.published_on = published_on;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(cover_url) = patch.cover_url {
            self.cover_url = cover_url;
        }
    }
}

impl Collection for Magazine {
    const NAME: &'static str = "magazines";
}
