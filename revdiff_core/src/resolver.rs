use crate::api::{NewRef, NewSpec, OldRef, ResolvedIds, RevisionId, RevisionSpecifier};
use crate::store::RevisionStore;
use crate::Result;

/// Turns relative specifiers into concrete ids using page history.
///
/// A `prev` of the first revision yields [`OldRef::NoPredecessor`]; a `next`
/// of the latest revision falls back to the page's current revision.
pub struct RevisionResolver<'a> {
    history: &'a dyn RevisionStore,
}

impl<'a> RevisionResolver<'a> {
    /// Resolver backed by the given history.
    pub fn new(history: &'a dyn RevisionStore) -> Self {
        Self { history }
    }

    /// Resolves a specifier. Only history lookups can fail.
    pub fn resolve(&self, spec: RevisionSpecifier) -> Result<ResolvedIds> {
        let ids = match spec.new {
            NewSpec::Prev => ResolvedIds {
                old: match RevisionId::new(spec.old) {
                    Some(id) => self
                        .history
                        .previous_id(id)?
                        .map_or(OldRef::NoPredecessor, OldRef::Id),
                    None => OldRef::Unresolved,
                },
                new: NewRef::from_raw(spec.old),
            },
            NewSpec::Next => ResolvedIds {
                old: OldRef::from_raw(spec.old),
                new: match RevisionId::new(spec.old) {
                    Some(id) => self.history.next_id(id)?.map_or(NewRef::Current, NewRef::Id),
                    None => NewRef::Current,
                },
            },
            NewSpec::Id(new) => ResolvedIds {
                old: OldRef::from_raw(spec.old),
                new: NewRef::from_raw(new),
            },
        };
        tracing::debug!(?spec, ?ids, "resolved revision specifier");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ContentBlob, PageId, RevisionRecord};
    use crate::store::MemoryRevisionStore;

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
        store
    }

    #[test]
    fn explicit_ids_pass_through() {
        let store = history();
        let ids = RevisionResolver::new(&store)
            .resolve(RevisionSpecifier::ids(100, 102))
            .unwrap();
        assert_eq!(ids.old, OldRef::Id(id(100)));
        assert_eq!(ids.new, NewRef::Id(id(102)));
    }

    #[test]
    fn zero_new_means_current() {
        let store = history();
        let ids = RevisionResolver::new(&store)
            .resolve(RevisionSpecifier::ids(0, 0))
            .unwrap();
        assert_eq!(ids.old, OldRef::Unresolved);
        assert_eq!(ids.new, NewRef::Current);
    }

    #[test]
    fn prev_looks_up_predecessor() {
        let store = history();
        let resolver = RevisionResolver::new(&store);
        let ids = resolver.resolve(RevisionSpecifier::prev(101)).unwrap();
        assert_eq!(ids.old, OldRef::Id(id(100)));
        assert_eq!(ids.new, NewRef::Id(id(101)));

        let first = resolver.resolve(RevisionSpecifier::prev(100)).unwrap();
        assert_eq!(first.old, OldRef::NoPredecessor);
        assert_eq!(first.new, NewRef::Id(id(100)));
    }

    #[test]
    fn prev_of_zero_defers_to_loading() {
        let store = history();
        let ids = RevisionResolver::new(&store)
            .resolve(RevisionSpecifier::prev(0))
            .unwrap();
        assert_eq!(ids.old, OldRef::Unresolved);
        assert_eq!(ids.new, NewRef::Current);
    }

    #[test]
    fn next_looks_up_successor() {
        let store = history();
        let resolver = RevisionResolver::new(&store);
        let ids = resolver.resolve(RevisionSpecifier::next(101)).unwrap();
        assert_eq!(ids.old, OldRef::Id(id(101)));
        assert_eq!(ids.new, NewRef::Id(id(102)));

        let last = resolver.resolve(RevisionSpecifier::next(102)).unwrap();
        assert_eq!(last.old, OldRef::Id(id(102)));
        assert_eq!(last.new, NewRef::Current);
    }
}
