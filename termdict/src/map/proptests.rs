use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::{
    Handle, Heap, HeapSettings, Key, MapError, MapView, Term, Value, create, get, is_map,
    put, put_entry,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyChoice {
    Int(i64),
    Atom(String),
}

impl KeyChoice {
    fn term(&self) -> Term {
        match self {
            KeyChoice::Int(n) => Term::Int(*n),
            KeyChoice::Atom(name) => Term::Atom(name.clone()),
        }
    }

    fn key(&self, heap: &Heap) -> Key {
        match self {
            KeyChoice::Int(n) => Key::Int(*n),
            KeyChoice::Atom(name) => Key::Atom(heap.atoms().intern(name)),
        }
    }
}

fn key_strategy() -> impl Strategy<Value = KeyChoice> {
    prop_oneof![
        (-40i64..40).prop_map(KeyChoice::Int),
        "[a-f][a-z]{0,2}".prop_map(KeyChoice::Atom),
    ]
}

/// Distinct keys in a shuffled order.
fn entries_strategy(max: usize) -> impl Strategy<Value = Vec<(KeyChoice, i64)>> {
    prop::collection::btree_map(key_strategy(), -100i64..100, 0..max)
        .prop_flat_map(|entries| Just(entries.into_iter().collect::<Vec<_>>()).prop_shuffle())
}

fn entry_list(entries: &[(KeyChoice, i64)]) -> Term {
    let items = entries
        .iter()
        .map(|(key, value)| Term::Compound("-".into(), vec![key.term(), Term::Int(*value)]))
        .collect();
    Term::List(items, None)
}

fn build(heap: &mut Heap, entries: &[(KeyChoice, i64)]) -> Result<Handle, MapError> {
    let data = entry_list(entries).load(heap)?;
    create(heap, data, None)
}

fn model(heap: &Heap, entries: &[(KeyChoice, i64)]) -> BTreeMap<Key, i64> {
    entries
        .iter()
        .map(|(key, value)| (key.key(heap), *value))
        .collect()
}

fn contents(heap: &Heap, map: Handle) -> Vec<(Key, i64)> {
    MapView::new(heap, heap.get(map))
        .expect("result is a map")
        .entries()
        .map(|(key, value)| {
            (
                Key::from_value(key).expect("key slot holds a key"),
                value.as_i64().expect("values are integers"),
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn construction_sorts_and_finds_every_key(
        entries in entries_strategy(24),
        lookups in prop::collection::vec(key_strategy(), 0..8),
    ) {
        let mut heap = Heap::new(HeapSettings::default());
        let map = build(&mut heap, &entries).unwrap();
        prop_assert!(is_map(&heap, map));

        let expected = model(&heap, &entries);
        let got = contents(&heap, map);
        prop_assert_eq!(&got, &expected.clone().into_iter().collect::<Vec<_>>());

        for choice in lookups {
            let key = choice.key(&heap);
            let found = get(&heap, map, key.to_value().unwrap()).unwrap();
            prop_assert_eq!(found.and_then(Value::as_i64), expected.get(&key).copied());
        }
    }

    #[test]
    fn duplicate_keys_are_rejected(
        entries in entries_strategy(12).prop_filter("need an entry", |e| !e.is_empty()),
        pick in any::<prop::sample::Index>(),
        value in -100i64..100,
    ) {
        let mut heap = Heap::new(HeapSettings::default());
        let mut with_duplicate = entries.clone();
        let (key, _) = pick.get(&entries).clone();
        with_duplicate.push((key, value));
        let handles = heap.handle_count();
        let err = build(&mut heap, &with_duplicate).unwrap_err();
        prop_assert!(matches!(err, MapError::Shape { expected: "map-data", .. }), "{err:?}");
        // only the loaded data list is left behind
        prop_assert_eq!(heap.handle_count(), handles + 1);
    }

    #[test]
    fn put_is_a_union_with_incoming_winning(
        base in entries_strategy(16),
        incoming in entries_strategy(16),
    ) {
        let mut heap = Heap::new(HeapSettings::default());
        let m = build(&mut heap, &base).unwrap();
        let n = build(&mut heap, &incoming).unwrap();
        let merged = put(&mut heap, m, n).unwrap();

        let mut expected = model(&heap, &base);
        expected.extend(model(&heap, &incoming));
        prop_assert_eq!(contents(&heap, merged), expected.into_iter().collect::<Vec<_>>());
        // inputs are unchanged
        prop_assert_eq!(contents(&heap, m), model(&heap, &base).into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn putting_existing_entries_returns_the_same_map(
        entries in entries_strategy(16),
        mask in prop::collection::vec(any::<bool>(), 16),
    ) {
        let mut heap = Heap::new(HeapSettings::default());
        let m = build(&mut heap, &entries).unwrap();
        let subset: Vec<_> = entries
            .iter()
            .zip(mask)
            .filter_map(|(entry, keep)| keep.then(|| entry.clone()))
            .collect();
        let n = build(&mut heap, &subset).unwrap();

        let used = heap.used();
        let result = put(&mut heap, m, n).unwrap();
        prop_assert_eq!(heap.get(result), heap.get(m));
        prop_assert_eq!(heap.used(), used);
    }

    #[test]
    fn put_is_idempotent(
        base in entries_strategy(16),
        incoming in entries_strategy(16),
    ) {
        let mut heap = Heap::new(HeapSettings::default());
        let m = build(&mut heap, &base).unwrap();
        let n = build(&mut heap, &incoming).unwrap();
        let once = put(&mut heap, m, n).unwrap();
        let twice = put(&mut heap, once, n).unwrap();
        prop_assert_eq!(heap.get(twice), heap.get(once));
    }

    #[test]
    fn results_do_not_depend_on_heap_size(
        entries in entries_strategy(20),
        updates in prop::collection::vec((key_strategy(), -100i64..100), 0..20),
    ) {
        let large = Heap::new(HeapSettings::default());
        let atoms = large.atoms().clone();
        let mut runs = Vec::new();
        for settings in [
            HeapSettings::default(),
            HeapSettings { initial_slots: 8, max_slots: 1 << 20 },
        ] {
            let mut heap = Heap::with_atoms(settings, atoms.clone());
            let mut map = build(&mut heap, &entries).unwrap();
            for (key, value) in &updates {
                let key = key.key(&heap).to_value().unwrap();
                let value = heap.new_handle(Value::from_i64(*value));
                map = put_entry(&mut heap, map, key, value).unwrap();
            }
            runs.push((heap.render(heap.get(map)), heap.stats().retries));
        }
        prop_assert_eq!(&runs[0].0, &runs[1].0);
        if !entries.is_empty() {
            prop_assert!(runs[1].1 > 0, "tiny heap never retried");
        }
    }
}
