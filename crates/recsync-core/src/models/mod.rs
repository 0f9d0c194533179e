//! Data models for recsync

mod magazine;
mod record;
mod session;

pub use magazine::{Magazine, MagazineDraft, MagazinePatch};
pub use record::{Collection, ParentRecord, Record, RecordId, Snapshot};
pub use session::{Session, SessionDraft, SessionPatch, Speaker, SpeakerDraft, SpeakerPatch};
