use std::collections::BTreeSet;

use proptest::prelude::*;
use revdiff_core::backends::BackendChain;
use revdiff_core::config::EngineConfig;
use revdiff_core::loader::RevisionLoader;
use revdiff_core::resolver::RevisionResolver;
use revdiff_core::store::MemoryRevisionStore;
use revdiff_core::{
    ContentBlob, NewRef, OldRef, PageId, RevisionId, RevisionRecord, RevisionSpecifier,
};

/// Distinct revision ids in shuffled history order.
fn history() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::btree_set(1_u64..10_000, 1..12)
        .prop_map(|ids: BTreeSet<u64>| ids.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

fn store_for(history: &[u64]) -> MemoryRevisionStore {
    let store = MemoryRevisionStore::new();
    for (ts, raw) in history.iter().enumerate() {
        let id = RevisionId::new(*raw).expect("non-zero id");
        store
            .insert(
                RevisionRecord::new(id, PageId(1), i64::try_from(ts).expect("small index")),
                Some(ContentBlob::wikitext(raw.to_string())),
            )
            .expect("insert");
    }
    store
}

fn id(raw: u64) -> RevisionId {
    RevisionId::new(raw).expect("non-zero id")
}

proptest! {
    #[test]
    fn prev_pairs_each_revision_with_its_predecessor(history in history()) {
        let store = store_for(&history);
        let resolver = RevisionResolver::new(&store);
        for (index, raw) in history.iter().enumerate() {
            let ids = resolver.resolve(RevisionSpecifier::prev(*raw)).expect("resolve");
            prop_assert_eq!(ids.new, NewRef::Id(id(*raw)));
            let expected = match index.checked_sub(1) {
                Some(previous) => OldRef::Id(id(history[previous])),
                None => OldRef::NoPredecessor,
            };
            prop_assert_eq!(ids.old, expected);
        }
    }

    #[test]
    fn next_pairs_each_revision_with_its_successor(history in history()) {
        let store = store_for(&history);
        let resolver = RevisionResolver::new(&store);
        for (index, raw) in history.iter().enumerate() {
            let ids = resolver.resolve(RevisionSpecifier::next(*raw)).expect("resolve");
            prop_assert_eq!(ids.old, OldRef::Id(id(*raw)));
            let expected = history
                .get(index + 1)
                .map_or(NewRef::Current, |next| NewRef::Id(id(*next)));
            prop_assert_eq!(ids.new, expected);
        }
    }

    #[test]
    fn current_marker_loads_latest_revision(history in history()) {
        let store = store_for(&history);
        let latest = *history.last().expect("non-empty history");
        let mut loader = RevisionLoader::new(&store, PageId(1), RevisionSpecifier::next(latest));
        prop_assert!(loader.load_records().expect("load"));
        prop_assert_eq!(loader.ids().expect("resolved").new, NewRef::Id(id(latest)));
    }

    #[test]
    fn identity_diff_is_empty(text in "[a-z \\r\\n]{0,64}") {
        let chain = EngineConfig::default().backend_chain();
        prop_assert_eq!(chain.compute(&text, &text), "");
    }

    #[test]
    fn crlf_and_lf_texts_are_identical(lines in prop::collection::vec("[a-z ]{0,8}", 0..8)) {
        let chain = BackendChain::builtin_only();
        prop_assert_eq!(chain.compute(&lines.join("\r\n"), &lines.join("\n")), "");
    }
}
