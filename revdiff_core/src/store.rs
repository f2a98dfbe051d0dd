use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::{
    ArchivedRevision, ContentBlob, PageId, Permission, RevisionId, RevisionRecord,
};

/// Errors reported by revision history storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing storage could not answer the query.
    #[error("revision store unavailable: {message}")]
    Unavailable {
        /// Detail from the storage layer.
        message: String,
    },
    /// Internal state lock was poisoned by a panicking writer.
    #[error("revision store state poisoned")]
    Poisoned,
}

/// Result alias for storage lookups.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Revision history lookups.
///
/// `Ok(None)` means the revision does not exist; `Err` means the store could
/// not answer at all.
pub trait RevisionStore: Send + Sync {
    /// Record for a concrete id.
    fn revision(&self, id: RevisionId) -> StoreResult<Option<Arc<RevisionRecord>>>;

    /// Latest revision of a page.
    fn current_revision(&self, page: PageId) -> StoreResult<Option<Arc<RevisionRecord>>>;

    /// Revision immediately before `id` on the same page.
    fn previous_id(&self, id: RevisionId) -> StoreResult<Option<RevisionId>>;

    /// Revision immediately after `id` on the same page.
    fn next_id(&self, id: RevisionId) -> StoreResult<Option<RevisionId>>;

    /// Change tags attached to a revision.
    fn tags(&self, _id: RevisionId) -> StoreResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Archived copy of a revision that no longer exists in live history.
    fn archived(&self, _id: RevisionId) -> StoreResult<Option<ArchivedRevision>> {
        Ok(None)
    }

    /// Revisions of `page` strictly between `old` and `new`.
    fn count_revisions_between(
        &self,
        page: PageId,
        old: &RevisionRecord,
        new: &RevisionRecord,
    ) -> StoreResult<u64>;

    /// Distinct authors of revisions of `page` strictly between `old` and
    /// `new`, counting no further than `limit`.
    fn count_authors_between(
        &self,
        page: PageId,
        old: &RevisionRecord,
        new: &RevisionRecord,
        limit: u64,
    ) -> StoreResult<u64>;
}

/// Revision content lookups. Absent means the content could not be fetched.
pub trait ContentStore: Send + Sync {
    /// Content of a revision.
    fn content(&self, record: &RevisionRecord) -> Option<ContentBlob>;
}

/// What the requester is allowed to do.
pub trait Capabilities: Send + Sync {
    /// Whether the requester holds `permission`, optionally for a specific record.
    fn requester_can(&self, permission: Permission, record: Option<&RevisionRecord>) -> bool;
}

/// Fixed set of granted permissions, regardless of record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCapabilities {
    granted: HashSet<Permission>,
}

impl StaticCapabilities {
    /// Requester without any elevated permission.
    pub fn none() -> Self {
        Self::default()
    }

    /// Requester holding the given permissions.
    pub fn with(granted: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }
}

impl Capabilities for StaticCapabilities {
    fn requester_can(&self, permission: Permission, _record: Option<&RevisionRecord>) -> bool {
        self.granted.contains(&permission)
    }
}

#[derive(Debug)]
struct StoredRevision {
    record: Arc<RevisionRecord>,
    content: Option<ContentBlob>,
}

#[derive(Debug, Default)]
struct MemoryState {
    revisions: BTreeMap<RevisionId, StoredRevision>,
    archive: HashMap<RevisionId, ArchivedRevision>,
    tags: HashMap<RevisionId, Vec<String>>,
}

impl MemoryState {
    /// Page history ordered by timestamp, ties broken by id.
    fn history(&self, page: PageId) -> Vec<&Arc<RevisionRecord>> {
        let mut history: Vec<_> = self
            .revisions
            .values()
            .map(|stored| &stored.record)
            .filter(|record| record.page() == page)
            .collect();
        history.sort_by_key(|record| (record.timestamp(), record.id()));
        history
    }

    fn neighbour(&self, id: RevisionId, offset: isize) -> Option<RevisionId> {
        let record = &self.revisions.get(&id)?.record;
        let history = self.history(record.page());
        let index = history.iter().position(|r| r.id() == id)?;
        let target = index.checked_add_signed(offset)?;
        history.get(target).map(|r| r.id())
    }

    fn between(
        &self,
        page: PageId,
        old: &RevisionRecord,
        new: &RevisionRecord,
    ) -> Vec<&Arc<RevisionRecord>> {
        let lower = (old.timestamp(), old.id());
        let upper = (new.timestamp(), new.id());
        self.history(page)
            .into_iter()
            .filter(|r| {
                let key = (r.timestamp(), r.id());
                key > lower && key < upper
            })
            .collect()
    }
}

/// In-process revision history and content, used by tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryRevisionStore {
    state: Mutex<MemoryState>,
}

impl MemoryRevisionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a revision. `None` content simulates a fetch failure.
    pub fn insert(&self, record: RevisionRecord, content: Option<ContentBlob>) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.revisions.insert(
            record.id(),
            StoredRevision {
                record: Arc::new(record),
                content,
            },
        );
        Ok(())
    }

    /// Removes a revision from live history and keeps an archived marker.
    pub fn archive(&self, id: RevisionId, archived: ArchivedRevision) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.revisions.remove(&id);
        state.archive.insert(id, archived);
        Ok(())
    }

    /// Attaches a change tag.
    pub fn tag(&self, id: RevisionId, tag: impl Into<String>) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.tags.entry(id).or_default().push(tag.into());
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn revision(&self, id: RevisionId) -> StoreResult<Option<Arc<RevisionRecord>>> {
        let state = self.lock()?;
        Ok(state.revisions.get(&id).map(|stored| Arc::clone(&stored.record)))
    }

    fn current_revision(&self, page: PageId) -> StoreResult<Option<Arc<RevisionRecord>>> {
        let state = self.lock()?;
        Ok(state.history(page).last().map(|record| Arc::clone(record)))
    }

    fn previous_id(&self, id: RevisionId) -> StoreResult<Option<RevisionId>> {
        Ok(self.lock()?.neighbour(id, -1))
    }

    fn next_id(&self, id: RevisionId) -> StoreResult<Option<RevisionId>> {
        Ok(self.lock()?.neighbour(id, 1))
    }

    fn tags(&self, id: RevisionId) -> StoreResult<Vec<String>> {
        Ok(self.lock()?.tags.get(&id).cloned().unwrap_or_default())
    }

    fn archived(&self, id: RevisionId) -> StoreResult<Option<ArchivedRevision>> {
        Ok(self.lock()?.archive.get(&id).copied())
    }

    fn count_revisions_between(
        &self,
        page: PageId,
        old: &RevisionRecord,
        new: &RevisionRecord,
    ) -> StoreResult<u64> {
        let state = self.lock()?;
        Ok(state.between(page, old, new).len() as u64)
    }

    fn count_authors_between(
        &self,
        page: PageId,
        old: &RevisionRecord,
        new: &RevisionRecord,
        limit: u64,
    ) -> StoreResult<u64> {
        let state = self.lock()?;
        let authors: HashSet<&str> = state
            .between(page, old, new)
            .into_iter()
            .filter_map(|r| r.author())
            .collect();
        Ok((authors.len() as u64).min(limit))
    }
}

impl ContentStore for MemoryRevisionStore {
    fn content(&self, record: &RevisionRecord) -> Option<ContentBlob> {
        let state = self.lock().ok()?;
        state.revisions.get(&record.id())?.content.clone()
    }
}
