use std::sync::Arc;

use crate::api::{NewRef, OldRef, PageId, ResolvedIds, RevisionId, RevisionRecord, RevisionSpecifier};
use crate::resolver::RevisionResolver;
use crate::store::RevisionStore;
use crate::Result;

/// How far revision loading has progressed. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdState {
    /// Nothing has been looked up yet.
    Unresolved,
    /// Relative markers have been resolved.
    IdsResolved,
    /// Records have been fetched, successfully or not.
    RevisionsLoaded,
}

/// Old side after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OldRevision {
    /// The new revision is the first of its page.
    NoPredecessor,
    /// The old id did not resolve to a record.
    Missing,
    /// Loaded record.
    Loaded(Arc<RevisionRecord>),
}

impl OldRevision {
    /// The loaded record, if any.
    pub fn record(&self) -> Option<&Arc<RevisionRecord>> {
        match self {
            Self::Loaded(record) => Some(record),
            Self::NoPredecessor | Self::Missing => None,
        }
    }
}

/// Lazily resolves and loads the revision pair for one request.
///
/// Each stage completes at most once; later calls return the memoised outcome.
pub struct RevisionLoader<'a> {
    history: &'a dyn RevisionStore,
    page: PageId,
    spec: RevisionSpecifier,
    state: IdState,
    ids: Option<ResolvedIds>,
    old: Option<OldRevision>,
    new: Option<Arc<RevisionRecord>>,
    old_tags: Vec<String>,
    new_tags: Vec<String>,
    loaded: bool,
}

impl<'a> RevisionLoader<'a> {
    /// Loader for `spec`, where a current-revision request refers to `page`.
    pub const fn new(history: &'a dyn RevisionStore, page: PageId, spec: RevisionSpecifier) -> Self {
        Self {
            history,
            page,
            spec,
            state: IdState::Unresolved,
            ids: None,
            old: None,
            new: None,
            old_tags: Vec::new(),
            new_tags: Vec::new(),
            loaded: false,
        }
    }

    /// Current stage.
    pub const fn state(&self) -> IdState {
        self.state
    }

    /// Resolves relative markers. Idempotent.
    pub fn load_ids(&mut self) -> Result<ResolvedIds> {
        if let Some(ids) = self.ids {
            return Ok(ids);
        }
        let ids = RevisionResolver::new(self.history).resolve(self.spec)?;
        self.ids = Some(ids);
        self.advance(IdState::IdsResolved);
        Ok(ids)
    }

    /// Fetches both records. Returns `false` when either side is missing.
    ///
    /// A successful load leaves both ids concrete, or the old side as
    /// [`OldRef::NoPredecessor`]. A found or not-found outcome is memoised; storage errors are not.
    pub fn load_records(&mut self) -> Result<bool> {
        if self.state == IdState::RevisionsLoaded {
            return Ok(self.loaded);
        }
        let mut ids = self.load_ids()?;

        // Storage errors leave the stage open so a later call retries.
        let new = match ids.new {
            NewRef::Id(id) => self.history.revision(id)?,
            NewRef::Current => self.history.current_revision(self.page)?,
        };
        let Some(new) = new else {
            tracing::debug!(?ids, "new revision not found");
            self.advance(IdState::RevisionsLoaded);
            return Ok(false);
        };
        ids.new = NewRef::Id(new.id());

        let old = match ids.old {
            OldRef::Id(id) => self.fetch_old(id)?,
            OldRef::NoPredecessor => OldRevision::NoPredecessor,
            OldRef::Unresolved => match self.history.previous_id(new.id())? {
                Some(previous) => {
                    ids.old = OldRef::Id(previous);
                    self.fetch_old(previous)?
                }
                None => {
                    ids.old = OldRef::NoPredecessor;
                    OldRevision::NoPredecessor
                }
            },
        };
        self.advance(IdState::RevisionsLoaded);
        self.ids = Some(ids);
        self.new_tags = self.tags_of(new.id());
        self.new = Some(new);
        let found = old != OldRevision::Missing;
        if let OldRevision::Loaded(record) = &old {
            self.old_tags = self.tags_of(record.id());
        } else if !found {
            tracing::debug!(?ids, "old revision not found");
        }
        self.old = Some(old);
        self.loaded = found;
        Ok(found)
    }

    /// Resolved ids, once [`Self::load_ids`] has succeeded.
    pub const fn ids(&self) -> Option<ResolvedIds> {
        self.ids
    }

    /// Original request specifier.
    pub const fn spec(&self) -> RevisionSpecifier {
        self.spec
    }

    /// Old side, once records have been loaded.
    pub const fn old(&self) -> Option<&OldRevision> {
        self.old.as_ref()
    }

    /// New record, once loaded.
    pub const fn new_record(&self) -> Option<&Arc<RevisionRecord>> {
        self.new.as_ref()
    }

    /// Change tags of the old revision.
    pub fn old_tags(&self) -> &[String] {
        &self.old_tags
    }

    /// Change tags of the new revision.
    pub fn new_tags(&self) -> &[String] {
        &self.new_tags
    }

    fn fetch_old(&self, id: RevisionId) -> Result<OldRevision> {
        Ok(self
            .history
            .revision(id)?
            .map_or(OldRevision::Missing, OldRevision::Loaded))
    }

    fn tags_of(&self, id: RevisionId) -> Vec<String> {
        self.history.tags(id).unwrap_or_else(|err| {
            tracing::warn!(%id, error = %err, "failed to load change tags");
            Vec::new()
        })
    }

    fn advance(&mut self, to: IdState) {
        if to > self.state {
            self.state = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::api::ContentBlob;
    use crate::store::{MemoryRevisionStore, StoreError, StoreResult};

    fn id(raw: u64) -> RevisionId {
        RevisionId::new(raw).unwrap()
    }

    fn history() -> MemoryRevisionStore {
        let store = MemoryRevisionStore::new();
        for (raw, ts) in [(100, 1), (101, 2), (102, 3)] {
            store
                .insert(
                    RevisionRecord::new(id(raw), PageId(1), ts),
                    Some(ContentBlob::wikitext(raw.to_string())),
                )
                .unwrap();
        }
        store.tag(id(102), "mobile edit").unwrap();
        store
    }

    #[test]
    fn state_moves_forward_only() {
        let store = history();
        let mut loader = RevisionLoader::new(&store, PageId(1), RevisionSpecifier::ids(100, 102));
        assert_eq!(loader.state(), IdState::Unresolved);
        loader.load_ids().unwrap();
        assert_eq!(loader.state(), IdState::IdsResolved);
        assert!(loader.load_records().unwrap());
        assert_eq!(loader.state(), IdState::RevisionsLoaded);
        loader.load_ids().unwrap();
        assert_eq!(loader.state(), IdState::RevisionsLoaded);
    }

    #[test]
    fn current_and_derived_predecessor() {
        let store = history();
        let mut loader = RevisionLoader::new(&store, PageId(1), RevisionSpecifier::ids(0, 0));
        assert!(loader.load_records().unwrap());
        let ids = loader.ids().unwrap();
        assert_eq!(ids.new, NewRef::Id(id(102)));
        assert_eq!(ids.old, OldRef::Id(id(101)));
        assert_eq!(loader.new_tags(), ["mobile edit".to_owned()]);
        assert!(loader.old_tags().is_empty());
    }

    #[test]
    fn first_revision_has_no_predecessor() {
        let store = history();
        let mut loader = RevisionLoader::new(&store, PageId(1), RevisionSpecifier::prev(100));
        assert!(loader.load_records().unwrap());
        assert_eq!(loader.old(), Some(&OldRevision::NoPredecessor));
        assert_eq!(loader.ids().unwrap().old, OldRef::NoPredecessor);
    }

    #[test]
    fn unresolved_old_on_first_revision_becomes_no_predecessor() {
        let store = history();
        let mut loader = RevisionLoader::new(&store, PageId(1), RevisionSpecifier::ids(0, 100));
        assert!(loader.load_records().unwrap());
        assert_eq!(loader.ids().unwrap().old, OldRef::NoPredecessor);
    }

    #[test]
    fn missing_sides_fail_and_stay_failed() {
        let store = history();
        let mut loader = RevisionLoader::new(&store, PageId(1), RevisionSpecifier::ids(555, 102));
        assert!(!loader.load_records().unwrap());
        assert_eq!(loader.old(), Some(&OldRevision::Missing));
        assert!(loader.new_record().is_some());
        assert!(!loader.load_records().unwrap());

        let mut loader = RevisionLoader::new(&store, PageId(1), RevisionSpecifier::ids(100, 999));
        assert!(!loader.load_records().unwrap());
        assert!(loader.new_record().is_none());
    }

    /// Delegates to a memory store, failing record lookups while `down` is set.
    struct Flaky {
        inner: MemoryRevisionStore,
        down: AtomicBool,
    }

    impl RevisionStore for Flaky {
        fn revision(&self, id: RevisionId) -> StoreResult<Option<Arc<RevisionRecord>>> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable {
                    message: "replica lagging".into(),
                });
            }
            self.inner.revision(id)
        }

        fn current_revision(&self, page: PageId) -> StoreResult<Option<Arc<RevisionRecord>>> {
            self.inner.current_revision(page)
        }

        fn previous_id(&self, id: RevisionId) -> StoreResult<Option<RevisionId>> {
            self.inner.previous_id(id)
        }

        fn next_id(&self, id: RevisionId) -> StoreResult<Option<RevisionId>> {
            self.inner.next_id(id)
        }

        fn count_revisions_between(
            &self,
            page: PageId,
            old: &RevisionRecord,
            new: &RevisionRecord,
        ) -> StoreResult<u64> {
            self.inner.count_revisions_between(page, old, new)
        }

        fn count_authors_between(
            &self,
            page: PageId,
            old: &RevisionRecord,
            new: &RevisionRecord,
            limit: u64,
        ) -> StoreResult<u64> {
            self.inner.count_authors_between(page, old, new, limit)
        }
    }

    #[test]
    fn storage_failure_is_retried_not_memoised() {
        let store = Flaky {
            inner: history(),
            down: AtomicBool::new(true),
        };
        let mut loader = RevisionLoader::new(&store, PageId(1), RevisionSpecifier::ids(100, 102));
        assert!(matches!(
            loader.load_records(),
            Err(crate::Error::Store { .. })
        ));
        assert_eq!(loader.state(), IdState::IdsResolved);
        assert!(loader.new_record().is_none());

        store.down.store(false, Ordering::SeqCst);
        assert!(loader.load_records().unwrap());
        assert_eq!(loader.state(), IdState::RevisionsLoaded);
        assert_eq!(loader.new_record().map(|record| record.id()), Some(id(102)));
    }

    #[test]
    fn empty_page_has_no_current_revision() {
        let store = history();
        let mut loader = RevisionLoader::new(&store, PageId(9), RevisionSpecifier::ids(0, 0));
        assert!(!loader.load_records().unwrap());
    }
}
