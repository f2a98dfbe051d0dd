use crate::api::{ContentBlob, RevisionRecord};
use crate::store::ContentStore;
use crate::visibility::VisibilityGate;

/// Which revision texts have been fetched. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TextState {
    /// Nothing fetched.
    None,
    /// Only the new side was requested.
    NewOnly,
    /// Both sides were requested.
    Both,
}

/// Fetches revision content on behalf of one requester.
///
/// Text the requester cannot see is treated as unavailable, the same as a
/// storage failure.
pub struct TextLoader<'a> {
    content: &'a dyn ContentStore,
    state: TextState,
    old: Option<ContentBlob>,
    new: Option<ContentBlob>,
    complete: bool,
}

impl<'a> TextLoader<'a> {
    /// Loader reading from `content`.
    pub const fn new(content: &'a dyn ContentStore) -> Self {
        Self {
            content,
            state: TextState::None,
            old: None,
            new: None,
            complete: false,
        }
    }

    /// Current stage.
    pub const fn state(&self) -> TextState {
        self.state
    }

    /// Fetches both sides. `old` is `None` when there is no predecessor.
    ///
    /// Returns whether every required side is available. Memoised.
    pub fn load_both(
        &mut self,
        old: Option<&RevisionRecord>,
        new: &RevisionRecord,
        gate: &VisibilityGate<'_>,
    ) -> bool {
        if self.state == TextState::Both {
            return self.complete;
        }
        self.state = TextState::Both;
        let mut complete = true;
        if let Some(old) = old {
            self.old = self.fetch(old, gate);
            if self.old.is_none() {
                tracing::debug!(id = %old.id(), "old revision text unavailable");
                complete = false;
            }
        }
        if self.new.is_none() {
            self.new = self.fetch(new, gate);
        }
        if self.new.is_none() {
            tracing::debug!(id = %new.id(), "new revision text unavailable");
            complete = false;
        }
        self.complete = complete;
        complete
    }

    /// Fetches only the new side. No-op once any loading has happened.
    pub fn load_new_only(&mut self, new: &RevisionRecord, gate: &VisibilityGate<'_>) -> bool {
        if self.state == TextState::None {
            self.state = TextState::NewOnly;
            self.new = self.fetch(new, gate);
        }
        self.new.is_some()
    }

    /// Old text, if loaded.
    pub const fn old(&self) -> Option<&ContentBlob> {
        self.old.as_ref()
    }

    /// New text, if loaded.
    pub const fn new_text(&self) -> Option<&ContentBlob> {
        self.new.as_ref()
    }

    fn fetch(&self, record: &RevisionRecord, gate: &VisibilityGate<'_>) -> Option<ContentBlob> {
        if !gate.can_view(record) {
            return None;
        }
        self.content.content(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DeletionFlags, PageId, RevisionId};
    use crate::store::{MemoryRevisionStore, StaticCapabilities};
    use crate::visibility::RevisionDeletionPolicy;

    fn rev(id: u64) -> RevisionRecord {
        RevisionRecord::new(RevisionId::new(id).unwrap(), PageId(1), id as i64)
    }

    fn store() -> MemoryRevisionStore {
        let store = MemoryRevisionStore::new();
        store.insert(rev(1), Some(ContentBlob::wikitext("one"))).unwrap();
        store.insert(rev(2), Some(ContentBlob::wikitext("two"))).unwrap();
        store.insert(rev(3), None).unwrap();
        store
            .insert(
                rev(4).with_deleted(DeletionFlags::TEXT),
                Some(ContentBlob::wikitext("secret")),
            )
            .unwrap();
        store
    }

    #[test]
    fn loads_both_sides_once() {
        let store = store();
        let caps = StaticCapabilities::none();
        let gate = VisibilityGate::new(&RevisionDeletionPolicy, &caps);
        let mut text = TextLoader::new(&store);
        assert!(text.load_both(Some(&rev(1)), &rev(2), &gate));
        assert_eq!(text.state(), TextState::Both);
        assert_eq!(text.old().unwrap().text, "one");
        assert_eq!(text.new_text().unwrap().text, "two");
        assert!(text.load_new_only(&rev(3), &gate));
        assert_eq!(text.new_text().unwrap().text, "two");
    }

    #[test]
    fn storage_failure_is_absence() {
        let store = store();
        let caps = StaticCapabilities::none();
        let gate = VisibilityGate::new(&RevisionDeletionPolicy, &caps);
        let mut text = TextLoader::new(&store);
        assert!(!text.load_both(Some(&rev(3)), &rev(2), &gate));
        assert!(!text.load_both(Some(&rev(3)), &rev(2), &gate));
        assert!(text.old().is_none());
        assert_eq!(text.new_text().unwrap().text, "two");
    }

    #[test]
    fn gated_text_is_absent_without_permission() {
        let store = store();
        let caps = StaticCapabilities::none();
        let gate = VisibilityGate::new(&RevisionDeletionPolicy, &caps);
        let mut text = TextLoader::new(&store);
        assert!(!text.load_new_only(&rev(4).with_deleted(DeletionFlags::TEXT), &gate));
    }

    #[test]
    fn new_only_then_both_reuses_new_side() {
        let store = store();
        let caps = StaticCapabilities::none();
        let gate = VisibilityGate::new(&RevisionDeletionPolicy, &caps);
        let mut text = TextLoader::new(&store);
        assert!(text.load_new_only(&rev(2), &gate));
        assert_eq!(text.state(), TextState::NewOnly);
        assert!(text.load_both(None, &rev(2), &gate));
        assert_eq!(text.state(), TextState::Both);
        assert!(text.old().is_none());
    }
}
