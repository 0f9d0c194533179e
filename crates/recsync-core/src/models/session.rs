//! Session and speaker models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::{Collection, ParentRecord, Record, RecordId};

/// A conference session with its speakers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: RecordId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Start time as entered by the user (ISO-8601 preferred)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Owned by the session; removed together with it
    #[serde(default)]
    pub speakers: Vec<Speaker>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDraft {
    pub title: String,
    pub description: String,
    pub starts_at: Option<String>,
    pub room: Option<String>,
}

/// Shallow partial update for a session.
///
/// Setting `speakers` replaces the whole speaker list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<Option<String>>,
    pub room: Option<Option<String>>,
    pub speakers: Option<Vec<Speaker>>,
}

impl Record for Session {
    type Draft = SessionDraft;
    type Patch = SessionPatch;

    const ID_PREFIX: &'static str = "session";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: SessionDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            starts_at: draft.starts_at,
            room: draft.room,
            speakers: Vec::new(),
            extra: Map::new(),
        }
    }

    fn apply_patch(&mut self, patch: SessionPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(starts_at) = patch.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(room) = patch.room {
            self.room = room;
        }
        if let Some(speakers) = patch.speakers {
            self.speakers = speakers;
        }
    }
}

impl Collection for Session {
    const NAME: &'static str = "sessions";
}

impl ParentRecord for Session {
    type Child = Speaker;

    fn children(&self) -> &[Speaker] {
        &self.speakers
    }

    fn children_mut(&mut self) -> &mut Vec<Speaker> {
        &mut self.speakers
    }
}

/// A speaker presenting in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakerDraft {
    pub name: String,
    pub bio: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakerPatch {
    pub name: Option<String>,
    pub bio: Option<Option<String>>,
    pub company: Option<Option<String>>,
}

impl Record for Speaker {
    type Draft = SpeakerDraft;
    type Patch = SpeakerPatch;

    const ID_PREFIX: &'static str = "speaker";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn from_draft(id: RecordId, draft: SpeakerDraft) -> Self {
        Self {
            id,
            name: draft.name,
            bio: draft.bio,
            company: draft.company,
            extra: Map::new(),
        }
    }

    fn apply_patch(&mut self, patch: SpeakerPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(bio) = patch.bio {
            self.bio = bio;
        }
        if let Some(company) = patch.company {
            self.company = company;
        }
    }
}
