use std::collections::BTreeMap;
use std::io::Cursor;

use proptest::prelude::*;

use super::*;
use crate::lookup::{Entry, InputEntries, Lookup, LookupResult, SuggestError};

fn options(exact_first: bool) -> ExactOptions {
    ExactOptions {
        exact_first,
        sort: SortOptions::default(),
    }
}

fn built(entries: &[(&str, i64)], exact_first: bool) -> WeightedExactLookup {
    let mut lookup = WeightedExactLookup::with_options(options(exact_first));
    let mut input: InputEntries = entries.iter().copied().collect();
    lookup.build(&mut input).unwrap();
    lookup
}

fn apples(exact_first: bool) -> WeightedExactLookup {
    built(
        &[("apple", 50), ("app", 10), ("application", 80), ("apply", 80)],
        exact_first,
    )
}

fn pairs(results: &[LookupResult]) -> Vec<(&str, i64)> {
    results.iter().map(|r| (r.key.as_str(), r.value)).collect()
}

/// Matching terms ranked by weight, then bytes.
fn brute_force(terms: &BTreeMap<String, i64>, prefix: &str, num: usize) -> Vec<(String, i64)> {
    let mut matching: Vec<(String, i64)> = terms
        .iter()
        .filter(|(t, _)| t.starts_with(prefix))
        .map(|(t, w)| (t.clone(), *w))
        .collect();
    matching.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    matching.truncate(num);
    matching
}

#[test]
fn ranks_by_real_weight() {
    let lookup = apples(false);
    let res = lookup.lookup("app", None, false, 3).unwrap();
    assert_eq!(pairs(&res), [("application", 80), ("apply", 80), ("apple", 50)]);

    let res = lookup.lookup("app", None, false, 10).unwrap();
    assert_eq!(
        pairs(&res),
        [("application", 80), ("apply", 80), ("apple", 50), ("app", 10)]
    );
}

#[test]
fn exact_first_leads() {
    let lookup = apples(true);
    let res = lookup.lookup("app", None, false, 3).unwrap();
    assert_eq!(pairs(&res), [("app", 10), ("application", 80), ("apply", 80)]);

    let res = lookup.lookup("app", None, false, 1).unwrap();
    assert_eq!(pairs(&res), [("app", 10)]);

    // A non-final prefix has nothing to promote.
    let res = lookup.lookup("appl", None, false, 2).unwrap();
    assert_eq!(pairs(&res), [("application", 80), ("apply", 80)]);
}

#[test]
fn get_decodes_weight() {
    let lookup = apples(true);
    assert_eq!(lookup.get("apple"), Some(50));
    assert_eq!(lookup.get("app"), Some(10));
    assert_eq!(lookup.get("appl"), None);
    assert_eq!(lookup.get(""), None);
    assert_eq!(lookup.count(), 4);
}

#[test]
fn extreme_weights() {
    let lookup = built(&[("max", MAX_WEIGHT), ("min", 0), ("mid", 1 << 20)], false);
    let res = lookup.lookup("m", None, false, 3).unwrap();
    assert_eq!(pairs(&res), [("max", MAX_WEIGHT), ("mid", 1 << 20), ("min", 0)]);
}

#[test]
fn duplicate_terms_keep_first_occurrence() {
    let lookup = built(&[("kiwi", 3), ("kiwi", 30), ("kale", 10), ("kiwi", 7)], false);
    assert_eq!(lookup.get("kiwi"), Some(3));
    assert_eq!(lookup.count(), 2);
    let res = lookup.lookup("k", None, false, 5).unwrap();
    assert_eq!(pairs(&res), [("kale", 10), ("kiwi", 3)]);

    let lookup = built(&[("kiwi", 30), ("kiwi", 3)], false);
    assert_eq!(lookup.get("kiwi"), Some(30));
}

#[test]
fn first_occurrence_wins_among_many_duplicates() {
    let mut lookup = WeightedExactLookup::with_options(options(false));
    let mut entries: Vec<(String, i64)> = (0..300).map(|i| (format!("t{:03}", i % 100), i)).collect();
    entries.push(("t000".to_string(), MAX_WEIGHT));
    let mut input: InputEntries = entries.iter().map(|(t, w)| (t.as_str(), *w)).collect();
    lookup.build(&mut input).unwrap();
    assert_eq!(lookup.count(), 100);
    assert_eq!(lookup.get("t000"), Some(0));
    assert_eq!(lookup.get("t099"), Some(99));
}

#[test]
fn terms_with_zero_bytes() {
    let lookup = built(&[("a\0b", 5), ("a", 4), ("a\0", 6)], false);
    let res = lookup.lookup("a", None, false, 5).unwrap();
    assert_eq!(pairs(&res), [("a\0", 6), ("a\0b", 5), ("a", 4)]);
}

#[test]
fn degenerate_queries_are_empty() {
    let lookup = apples(true);
    assert!(lookup.lookup("", None, false, 5).unwrap().is_empty());
    assert!(lookup.lookup("app", None, false, 0).unwrap().is_empty());
    assert!(lookup.lookup("banana", None, false, 5).unwrap().is_empty());

    let unbuilt = WeightedExactLookup::with_options(options(true));
    assert!(unbuilt.lookup("app", None, false, 5).unwrap().is_empty());
    assert_eq!(unbuilt.get("app"), None);
    assert_eq!(unbuilt.size_in_bytes(), 0);
}

#[test]
fn unsupported_modes() {
    let lookup = apples(true);
    assert!(matches!(
        lookup.lookup("app", None, true, 3),
        Err(SuggestError::Unsupported(_))
    ));
    let contexts = vec![b"ctx".to_vec()];
    assert!(matches!(
        lookup.lookup("app", Some(contexts.as_slice()), false, 3),
        Err(SuggestError::Unsupported(_))
    ));
}

#[test]
fn unsupported_input_keeps_previous_build() {
    let mut lookup = apples(true);

    let mut negative: InputEntries = [("fig", -5)].into_iter().collect();
    assert!(matches!(lookup.build(&mut negative), Err(SuggestError::Unsupported(_))));

    let mut contexts = InputEntries::new([Entry::new("fig", 5).with_contexts(vec![b"c".to_vec()])]);
    assert!(matches!(lookup.build(&mut contexts), Err(SuggestError::Unsupported(_))));

    assert_eq!(lookup.get("apply"), Some(80));
}

#[test]
fn store_load_round_trip() {
    let original = apples(true);
    let mut buf = Vec::new();
    assert!(original.store(&mut buf).unwrap());

    let mut restored = WeightedExactLookup::with_options(options(true));
    assert!(restored.load(&mut Cursor::new(&buf)).unwrap());
    assert_eq!(restored.count(), original.count());
    for key in ["a", "app", "appl", "apply"] {
        assert_eq!(
            restored.lookup(key, None, false, 3).unwrap(),
            original.lookup(key, None, false, 3).unwrap()
        );
    }

    // A bucketed store is not an exact store.
    let mut bucketed_like = buf.clone();
    bucketed_like[..4].copy_from_slice(b"SGBK");
    assert!(matches!(
        restored.load(&mut Cursor::new(&bucketed_like)),
        Err(SuggestError::InvalidMagic(_))
    ));
}

#[test]
fn store_without_build_writes_nothing() {
    let lookup = WeightedExactLookup::with_options(options(true));
    let mut buf = Vec::new();
    assert!(!lookup.store(&mut buf).unwrap());
    assert!(buf.is_empty());
}

#[test]
fn save_open_round_trip() {
    let original = apples(false);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("apples.sgex");
    assert!(original.save(&path).unwrap());

    let opened = WeightedExactLookup::open(&path, options(false)).unwrap();
    assert_eq!(
        opened.lookup("app", None, false, 4).unwrap(),
        original.lookup("app", None, false, 4).unwrap()
    );
    assert_eq!(opened.get("apple"), Some(50));
}

#[test]
fn search_respects_allow_empty() {
    let lookup = apples(false);
    let automaton = lookup.automaton().unwrap();
    let (node, cost) = automaton.descend(automaton.root(), b"app").unwrap();
    let with_empty = search::top_n(automaton, node, cost, 10, true);
    assert!(with_empty.iter().any(|p| p.suffix.is_empty()));
    let without = search::top_n(automaton, node, cost, 10, false);
    assert_eq!(without.len(), 3);
    assert!(without.iter().all(|p| !p.suffix.is_empty()));
    assert!(search::top_n(automaton, node, cost, 0, true).is_empty());
}

fn weighted_terms() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-c]{1,6}", 0i64..50, 1..80)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn duplicates_resolve_to_first_occurrence(
        entries in prop::collection::vec(("[a-b]{1,3}", 0i64..50), 1..60),
    ) {
        let mut first: BTreeMap<String, i64> = BTreeMap::new();
        for (term, weight) in &entries {
            first.entry(term.clone()).or_insert(*weight);
        }
        let borrowed: Vec<(&str, i64)> = entries.iter().map(|(t, w)| (t.as_str(), *w)).collect();
        let lookup = built(&borrowed, false);
        prop_assert_eq!(lookup.count(), first.len() as u64);
        for (term, weight) in &first {
            prop_assert_eq!(lookup.get(term), Some(*weight));
        }
        let got: Vec<(String, i64)> = lookup
            .lookup("a", None, false, 5)
            .unwrap()
            .into_iter()
            .map(|r| (r.key, r.value))
            .collect();
        prop_assert_eq!(got, brute_force(&first, "a", 5));
    }

    #[test]
    fn top_n_matches_brute_force(
        terms in weighted_terms(),
        prefix in "[a-c]{1,3}",
        num in 1usize..10,
    ) {
        let entries: Vec<(&str, i64)> = terms.iter().map(|(t, w)| (t.as_str(), *w)).collect();
        let lookup = built(&entries, false);
        let got: Vec<(String, i64)> = lookup
            .lookup(&prefix, None, false, num)
            .unwrap()
            .into_iter()
            .map(|r| (r.key, r.value))
            .collect();
        prop_assert_eq!(got, brute_force(&terms, &prefix, num));
    }

    #[test]
    fn exact_first_puts_key_first(
        terms in weighted_terms(),
        num in 1usize..10,
    ) {
        let entries: Vec<(&str, i64)> = terms.iter().map(|(t, w)| (t.as_str(), *w)).collect();
        let lookup = built(&entries, true);
        for (term, weight) in terms.iter().take(5) {
            let res = lookup.lookup(term, None, false, num).unwrap();
            prop_assert_eq!(&res[0].key, term);
            prop_assert_eq!(res[0].value, *weight);
            let mut rest = brute_force(&terms, term, terms.len());
            rest.retain(|(t, _)| t != term);
            rest.truncate(num - 1);
            let tail: Vec<(String, i64)> = res[1..].iter().map(|r| (r.key.clone(), r.value)).collect();
            prop_assert_eq!(tail, rest);
        }
    }
}
