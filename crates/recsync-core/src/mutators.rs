//! Pure snapshot transformations.
//!
//! Every function takes the current snapshot by reference and returns a new
//! one; nothing here touches the network, the clock or shared state. The
//! caller supplies `now` and the successor is stamped with
//! [`Snapshot::next_stamp`]. A missing id is a silent no-op: the returned
//! snapshot equals the input (version included) and `affected` is `None`.

use crate::models::{ParentRecord, Record, RecordId, Snapshot};

/// Result of applying a mutator.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<R, T> {
    pub snapshot: Snapshot<R>,
    /// The created, updated or removed record; `None` when nothing matched.
    pub affected: Option<T>,
}

impl<R, T> Applied<R, T> {
    fn unchanged(snapshot: &Snapshot<R>) -> Self
    where
        R: Clone,
    {
        Self {
            snapshot: snapshot.clone(),
            affected: None,
        }
    }

    /// Whether the mutator produced a new snapshot.
    pub const fn is_changed(&self) -> bool {
        self.affected.is_some()
    }
}

/// Result of [`insert`], which always creates a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Inserted<R> {
    pub snapshot: Snapshot<R>,
    pub record: R,
}

/// Append a new record built from `draft`, assigning it a fresh id.
pub fn insert<R: Record>(snapshot: &Snapshot<R>, draft: R::Draft, now: i64) -> Inserted<R> {
    let stamp = snapshot.next_stamp(now);
    let record = R::from_draft(RecordId::generate(R::ID_PREFIX, stamp), draft);

    let mut items = snapshot.items.clone();
    items.push(record.clone());

    Inserted {
        snapshot: Snapshot {
            items,
            last_modified: stamp,
        },
        record,
    }
}

/// Overlay `patch` on the record with `id`.
pub fn patch<R: Record>(
    snapshot: &Snapshot<R>,
    id: &RecordId,
    patch: R::Patch,
    now: i64,
) -> Applied<R, R> {
    let Some(index) = position(&snapshot.items, id) else {
        return Applied::unchanged(snapshot);
    };

    let mut items = snapshot.items.clone();
    items[index].apply_patch(patch);
    let updated = items[index].clone();

    Applied {
        snapshot: Snapshot {
            items,
            last_modified: snapshot.next_stamp(now),
        },
        affected: Some(updated),
    }
}

/// Drop the record with `id`.
pub fn remove<R: Record>(snapshot: &Snapshot<R>, id: &RecordId, now: i64) -> Applied<R, R> {
    let Some(index) = position(&snapshot.items, id) else {
        return Applied::unchanged(snapshot);
    };

    let mut items = snapshot.items.clone();
    let removed = items.remove(index);

    Applied {
        snapshot: Snapshot {
            items,
            last_modified: snapshot.next_stamp(now),
        },
        affected: Some(removed),
    }
}

/// Append a child built from `draft` to the parent with `parent_id`.
pub fn insert_child<P: ParentRecord>(
    snapshot: &Snapshot<P>,
    parent_id: &RecordId,
    draft: <P::Child as Record>::Draft,
    now: i64,
) -> Applied<P, P::Child> {
    let stamp = snapshot.next_stamp(now);
    with_parent(snapshot, parent_id, stamp, |parent| {
        let child = P::Child::from_draft(
            RecordId::generate(<P::Child as Record>::ID_PREFIX, stamp),
            draft,
        );
        parent.children_mut().push(child.clone());
        Some(child)
    })
}

/// Overlay `patch` on child `child_id` of the parent with `parent_id`.
pub fn patch_child<P: ParentRecord>(
    snapshot: &Snapshot<P>,
    parent_id: &RecordId,
    child_id: &RecordId,
    patch: <P::Child as Record>::Patch,
    now: i64,
) -> Applied<P, P::Child> {
    with_parent(snapshot, parent_id, snapshot.next_stamp(now), |parent| {
        let index = position(parent.children(), child_id)?;
        let child = &mut parent.children_mut()[index];
        child.apply_patch(patch);
        Some(child.clone())
    })
}

/// Drop child `child_id` from the parent with `parent_id`.
pub fn remove_child<P: ParentRecord>(
    snapshot: &Snapshot<P>,
    parent_id: &RecordId,
    child_id: &RecordId,
    now: i64,
) -> Applied<P, P::Child> {
    with_parent(snapshot, parent_id, snapshot.next_stamp(now), |parent| {
        let index = position(parent.children(), child_id)?;
        Some(parent.children_mut().remove(index))
    })
}

fn position<R: Record>(items: &[R], id: &RecordId) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

/// Copy-on-write edit of one parent: the parent is cloned, edited, and spliced
/// into a fresh item sequence. If the parent or the child is missing the input
/// snapshot is returned unchanged.
fn with_parent<P: ParentRecord>(
    snapshot: &Snapshot<P>,
    parent_id: &RecordId,
    stamp: i64,
    edit: impl FnOnce(&mut P) -> Option<P::Child>,
) -> Applied<P, P::Child> {
    let Some(index) = position(&snapshot.items, parent_id) else {
        return Applied::unchanged(snapshot);
    };

    let mut parent = snapshot.items[index].clone();
    let Some(affected) = edit(&mut parent) else {
        return Applied::unchanged(snapshot);
    };

    let mut items = snapshot.items.clone();
    items[index] = parent;

    Applied {
        snapshot: Snapshot {
            items,
            last_modified: stamp,
        },
        affected: Some(affected),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{
        Magazine, MagazineDraft, MagazinePatch, Session, SessionDraft, SpeakerDraft, SpeakerPatch,
    };

    fn magazine_draft(title: &str) -> MagazineDraft {
        MagazineDraft {
            title: title.to_string(),
            publisher: "Acme".to_string(),
            ..MagazineDraft::default()
        }
    }

    fn seeded() -> Snapshot<Magazine> {
        let snapshot = Snapshot::<Magazine>::empty(100);
        let first = insert(&snapshot, magazine_draft("First"), 200).snapshot;
        insert(&first, magazine_draft("Second"), 300).snapshot
    }

    #[test]
    fn insert_appends_with_generated_id() {
        let applied = insert::<Magazine>(&Snapshot::empty(100), magazine_draft("A"), 1_000);

        let created = applied.record;
        assert_eq!(created.id.as_str(), "magazine-1000");
        assert_eq!(created.title, "A");
        assert_eq!(applied.snapshot.items, vec![created]);
        assert_eq!(applied.snapshot.last_modified, 1_000);
    }

    #[test]
    fn insert_preserves_creation_order() {
        let titles: Vec<_> = seeded().items.into_iter().map(|m| m.title).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn inserts_in_same_millisecond_get_distinct_ids() {
        let once = insert::<Magazine>(&Snapshot::empty(0), magazine_draft("A"), 50).snapshot;
        let twice = insert(&once, magazine_draft("B"), 50).snapshot;
        assert_ne!(twice.items[0].id, twice.items[1].id);
        assert!(twice.last_modified > once.last_modified);
    }

    #[test]
    fn patch_overlays_fields_and_keeps_others() {
        let snapshot = seeded();
        let id = snapshot.items[0].id.clone();

        let applied = patch(&snapshot, &id, MagazinePatch::title("Renamed"), 400);

        let updated = applied.affected.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.publisher, "Acme");
        assert_eq!(applied.snapshot.items[0], updated);
        assert_eq!(applied.snapshot.items[1], snapshot.items[1]);
        assert!(applied.snapshot.last_modified > snapshot.last_modified);
    }

    #[test]
    fn patch_and_remove_with_unknown_id_are_noops() {
        let snapshot = seeded();
        let missing = RecordId::from("magazine-404");

        let patched = patch(&snapshot, &missing, MagazinePatch::title("X"), 999);
        assert!(!patched.is_changed());
        assert_eq!(patched.snapshot, snapshot);

        let removed = remove(&snapshot, &missing, 999);
        assert!(!removed.is_changed());
        assert_eq!(removed.snapshot, snapshot);
    }

    #[test]
    fn insert_then_remove_restores_items() {
        let snapshot = seeded();
        let inserted = insert(&snapshot, magazine_draft("Temp"), 500);
        let id = inserted.record.id;

        let removed = remove(&inserted.snapshot, &id, 600);

        assert_eq!(removed.snapshot.items, snapshot.items);
        assert_eq!(removed.affected.unwrap().title, "Temp");
    }

    #[test]
    fn every_change_bumps_version() {
        let mut snapshot = Snapshot::<Magazine>::empty(10_000);
        // Clock behind the stored version: stamps must still increase.
        for now in [1, 2, 3] {
            let next = insert(&snapshot, magazine_draft("A"), now).snapshot;
            assert!(next.last_modified > snapshot.last_modified);
            snapshot = next;
        }
    }

    fn session_snapshot() -> (Snapshot<Session>, RecordId) {
        let applied = insert::<Session>(
            &Snapshot::empty(0),
            SessionDraft {
                title: "Keynote".to_string(),
                ..SessionDraft::default()
            },
            10,
        );
        let id = applied.record.id;
        (applied.snapshot, id)
    }

    fn speaker_draft(name: &str) -> SpeakerDraft {
        SpeakerDraft {
            name: name.to_string(),
            ..SpeakerDraft::default()
        }
    }

    #[test]
    fn insert_child_adds_speaker_to_parent_only() {
        let (snapshot, session_id) = session_snapshot();
        let other = insert(&snapshot, SessionDraft::default(), 20).snapshot;

        let applied = insert_child(&other, &session_id, speaker_draft("Ada"), 30);

        let speaker = applied.affected.unwrap();
        assert_eq!(speaker.id.as_str(), "speaker-30");
        assert_eq!(applied.snapshot.items[0].speakers, vec![speaker]);
        assert!(applied.snapshot.items[1].speakers.is_empty());
        // The input snapshot is untouched.
        assert!(other.items[0].speakers.is_empty());
    }

    #[test]
    fn patch_child_updates_nested_record() {
        let (snapshot, session_id) = session_snapshot();
        let with_speaker = insert_child(&snapshot, &session_id, speaker_draft("Ada"), 20);
        let speaker_id = with_speaker.affected.unwrap().id;

        let applied = patch_child(
            &with_speaker.snapshot,
            &session_id,
            &speaker_id,
            SpeakerPatch {
                company: Some(Some("Analytical Engines".to_string())),
                ..SpeakerPatch::default()
            },
            30,
        );

        let speaker = &applied.snapshot.items[0].speakers[0];
        assert_eq!(speaker.name, "Ada");
        assert_eq!(speaker.company.as_deref(), Some("Analytical Engines"));
        assert_eq!(applied.snapshot.last_modified, 30);
    }

    #[test]
    fn nested_mutators_ignore_missing_parent_or_child() {
        let (snapshot, session_id) = session_snapshot();
        let missing = RecordId::from("session-404");

        let no_parent = insert_child(&snapshot, &missing, speaker_draft("Ada"), 20);
        assert_eq!(no_parent.snapshot, snapshot);
        assert!(no_parent.affected.is_none());

        let no_child = remove_child(&snapshot, &session_id, &RecordId::from("speaker-1"), 20);
        assert_eq!(no_child.snapshot, snapshot);

        let no_child_patch = patch_child(
            &snapshot,
            &session_id,
            &RecordId::from("speaker-1"),
            SpeakerPatch::default(),
            20,
        );
        assert_eq!(no_child_patch.snapshot, snapshot);
    }

    #[test]
    fn remove_child_keeps_siblings_in_order() {
        let (snapshot, session_id) = session_snapshot();
        let a = insert_child(&snapshot, &session_id, speaker_draft("Ada"), 20);
        let b = insert_child(&a.snapshot, &session_id, speaker_draft("Grace"), 30);
        let c = insert_child(&b.snapshot, &session_id, speaker_draft("Linus"), 40);
        let grace = b.affected.unwrap().id;

        let applied = remove_child(&c.snapshot, &session_id, &grace, 50);

        let names: Vec<_> = applied.snapshot.items[0]
            .speakers
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Ada", "Linus"]);
    }
}
