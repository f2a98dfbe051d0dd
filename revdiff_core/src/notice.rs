use crate::api::{MultiEditNotice, RevisionRecord};
use crate::store::RevisionStore;
use crate::Result;

/// Author limit used when none is configured.
pub const DEFAULT_AUTHOR_LIMIT: u64 = 100;

/// Counts edits made between two revisions of the same page.
///
/// The pair is ordered by timestamp first, so swapped arguments give the same
/// answer. Returns `None` for cross-page pairs or when nothing happened in
/// between. Authors are clamped at `author_limit`.
pub fn count_between(
    history: &dyn RevisionStore,
    old: &RevisionRecord,
    new: &RevisionRecord,
    author_limit: u64,
) -> Result<Option<MultiEditNotice>> {
    if old.page() != new.page() {
        return Ok(None);
    }
    let (old, new) = if old.timestamp() > new.timestamp() {
        (new, old)
    } else {
        (old, new)
    };
    let page = new.page();
    let edits = history.count_revisions_between(page, old, new)?;
    if edits == 0 {
        return Ok(None);
    }
    let authors = history.count_authors_between(page, old, new, author_limit.saturating_add(1))?;
    let many_authors = authors > author_limit;
    Ok(Some(MultiEditNotice {
        edits,
        authors: authors.min(author_limit),
        many_authors,
    }))
}
