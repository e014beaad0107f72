//! Persistent ordered maps.
//!
//! A map is an immutable heap object holding a class and key/value pairs
//! sorted by raw key order. Every operation that changes a map returns a new
//! one; untouched keys and values are shared with the input.
//!
//! Operations that allocate take and return [`Handle`]s and run under
//! [`with_retry`], so a caller never sees a reference that a reclamation
//! during the operation could have moved. Each result is a new root; a
//! caller chaining updates releases the old ones with [`Heap::escape`].

pub(crate) mod build;
mod enumerate;
mod layout;
mod lookup;
mod merge;

#[cfg(test)]
mod proptests;

pub use enumerate::{Entries, Enumerator};
pub use layout::{MapView, is_valid_map};

use crate::{Handle, Heap, Interrupt, MapError, Value, equal, with_retry};

pub(crate) fn type_error(heap: &Heap, expected: &'static str, culprit: Value) -> MapError {
    MapError::Type {
        expected,
        culprit: heap.render(culprit),
    }
}

pub(crate) fn shape_error(expected: &'static str, culprit: String) -> MapError {
    MapError::Shape { expected, culprit }
}

/// `value` as a valid map, or a type error naming it.
fn expect_map<'h>(heap: &'h Heap, value: Value) -> Result<MapView<'h>, MapError> {
    MapView::new(heap, value).ok_or_else(|| type_error(heap, "map", value))
}

/// Map operand of `put`: maps as they are, lists built into maps.
fn operand(heap: &mut Heap, value: Value) -> Result<Value, Interrupt> {
    if MapView::new(heap, value).is_some() {
        Ok(value)
    } else if heap.is_list(value) {
        build::from_list(heap, value, Value::UNBOUND)
    } else {
        Err(type_error(heap, "map", value).into())
    }
}

pub fn is_map(heap: &Heap, term: Handle) -> bool {
    is_valid_map(heap, heap.get(term))
}

/// True when `term` is a map whose class equals `class`. An unbound class on
/// either side matches.
///
/// Classes are compared with [`equal`], not unified: an unbound value inside
/// a compound class only matches another unbound value, so `point(_)` does
/// not match a map classed `point(1)`.
pub fn is_map_of_class(heap: &Heap, term: Handle, class: Value) -> bool {
    MapView::new(heap, heap.get(term)).is_some_and(|view| {
        let own = view.class();
        own.is_unbound() || class.is_unbound() || equal(heap, own, class)
    })
}

/// Class of `map`, `None` when it has none.
pub fn class_of(heap: &Heap, map: Handle) -> Result<Option<Value>, MapError> {
    let view = expect_map(heap, heap.get(map))?;
    let class = view.class();
    Ok((!class.is_unbound()).then_some(class))
}

/// Value stored under `key`.
pub fn get(heap: &Heap, map: Handle, key: Value) -> Result<Option<Value>, MapError> {
    let view = expect_map(heap, heap.get(map))?;
    if !key.is_key() {
        return Err(type_error(heap, "map-key", key));
    }
    Ok(view.lookup(key))
}

/// Every entry of `other` put into `map`, with `other` winning on shared
/// keys.
///
/// Either operand may also be a list of entries, which is built into a map
/// first. When every entry of `other` is already in `map` with an equal value
/// the result holds `map` itself.
pub fn put(heap: &mut Heap, map: Handle, other: Handle) -> Result<Handle, MapError> {
    with_retry(heap, |heap| {
        let (map, other) = (heap.get(map), heap.get(other));
        let base = operand(heap, map)?;
        let incoming = operand(heap, other)?;
        let result = merge::put_map(heap, base, incoming)?;
        Ok(heap.new_handle(result))
    })
}

/// `map` with `key` bound to the value behind `value`.
pub fn put_entry(
    heap: &mut Heap,
    map: Handle,
    key: Value,
    value: Handle,
) -> Result<Handle, MapError> {
    with_retry(heap, |heap| {
        let map = heap.get(map);
        let base = operand(heap, map)?;
        if !key.is_key() {
            return Err(type_error(heap, "map-key", key).into());
        }
        let incoming = [key, heap.get(value)];
        let result = merge::put_slots(heap, base, &incoming)?;
        Ok(heap.new_handle(result))
    })
}

/// Build a map from `data`, a list of `K-V`, `K=V`, `K:V` or `Label(V)`
/// entries, or an existing map.
///
/// A map passes through unchanged unless `class` names a different class, in
/// which case a copy with that class is made.
pub fn create(
    heap: &mut Heap,
    data: Handle,
    class: Option<Handle>,
) -> Result<Handle, MapError> {
    with_retry(heap, |heap| {
        let class = class.map(|class| heap.get(class));
        let data = heap.get(data);
        let result = build::coerce(heap, data, class)?;
        Ok(heap.new_handle(result))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Atom, HeapSettings};

    fn int(n: i64) -> Value {
        Value::from_i64(n)
    }

    fn atom(heap: &Heap, name: &str) -> Value {
        Value::from_atom(heap.atoms().intern(name))
    }

    /// Handle to a list of `key-value` entries.
    fn entry_list(heap: &mut Heap, pairs: &[(Value, Value)]) -> Handle {
        let items: Vec<Value> = pairs
            .iter()
            .map(|&(k, v)| heap.alloc_compound(Atom::MINUS, &[k, v]).unwrap())
            .collect();
        let list = heap.alloc_list(&items).unwrap();
        heap.new_handle(list)
    }

    fn map_of(heap: &mut Heap, pairs: &[(Value, Value)]) -> Handle {
        let data = entry_list(heap, pairs);
        create(heap, data, None).unwrap()
    }

    fn entries(heap: &Heap, map: Handle) -> Vec<(Value, Value)> {
        MapView::new(heap, heap.get(map)).unwrap().entries().collect()
    }

    // ── create ────────────────────────────────────────────────────────

    #[test]
    fn create_mixed_keys() {
        let mut heap = Heap::new(HeapSettings::default());
        let (a, b) = (atom(&heap, "a"), atom(&heap, "b"));
        let m = map_of(&mut heap, &[(b, int(2)), (int(1), int(1)), (a, int(3))]);
        assert!(is_map(&heap, m));
        assert_eq!(
            entries(&heap, m),
            vec![(int(1), int(1)), (a, int(3)), (b, int(2))]
        );
        assert_eq!(class_of(&heap, m).unwrap(), None);
    }

    #[test]
    fn create_with_class() {
        let mut heap = Heap::new(HeapSettings::default());
        let data = entry_list(&mut heap, &[(int(1), int(1))]);
        let class = atom(&heap, "point");
        let class_handle = heap.new_handle(class);
        let m = create(&mut heap, data, Some(class_handle)).unwrap();
        assert_eq!(class_of(&heap, m).unwrap(), Some(class));
        assert!(is_map_of_class(&heap, m, class));
        assert!(is_map_of_class(&heap, m, Value::UNBOUND));
        assert!(!is_map_of_class(&heap, m, atom(&heap, "line")));
    }

    #[test]
    fn class_match_is_structural() {
        let mut heap = Heap::new(HeapSettings::default());
        let point = heap.atoms().intern("point");
        let open = heap.alloc_compound(point, &[Value::UNBOUND]).unwrap();
        let open = heap.new_handle(open);
        let data = entry_list(&mut heap, &[(int(1), int(1))]);
        let m = create(&mut heap, data, Some(open)).unwrap();

        let same = heap.alloc_compound(point, &[Value::UNBOUND]).unwrap();
        assert!(is_map_of_class(&heap, m, same));
        let bound = heap.alloc_compound(point, &[int(1)]).unwrap();
        assert!(!is_map_of_class(&heap, m, bound));
    }

    #[test]
    fn create_rejects_duplicates_and_leaves_no_handles() {
        let mut heap = Heap::new(HeapSettings::default());
        let a = atom(&heap, "a");
        let data = entry_list(&mut heap, &[(a, int(1)), (a, int(2))]);
        let handles = heap.handle_count();
        let err = create(&mut heap, data, None).unwrap_err();
        assert_eq!(err.to_string(), "invalid map-data: duplicate key a");
        assert_eq!(heap.handle_count(), handles);
    }

    #[test]
    fn create_rejects_non_lists() {
        let mut heap = Heap::new(HeapSettings::default());
        let data = heap.new_handle(int(3));
        assert!(matches!(
            create(&mut heap, data, None),
            Err(MapError::Type { expected: "map-data", .. })
        ));
    }

    // ── get ───────────────────────────────────────────────────────────

    #[test]
    fn get_present_and_absent() {
        let mut heap = Heap::new(HeapSettings::default());
        let a = atom(&heap, "a");
        let m = map_of(&mut heap, &[(a, int(1))]);
        assert_eq!(get(&heap, m, a).unwrap(), Some(int(1)));
        assert_eq!(get(&heap, m, int(0)).unwrap(), None);
    }

    #[test]
    fn get_type_errors() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = map_of(&mut heap, &[]);
        assert_eq!(
            get(&heap, m, Value::UNBOUND),
            Err(MapError::Type {
                expected: "map-key",
                culprit: "_".into()
            })
        );
        let not_map = heap.new_handle(int(1));
        assert_eq!(
            get(&heap, not_map, int(1)),
            Err(MapError::Type {
                expected: "map",
                culprit: "1".into()
            })
        );
        assert!(class_of(&heap, not_map).is_err());
    }

    // ── put ───────────────────────────────────────────────────────────

    #[test]
    fn put_merges_with_incoming_winning() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = map_of(&mut heap, &[(int(1), int(10)), (int(2), int(20))]);
        let n = map_of(&mut heap, &[(int(2), int(99)), (int(3), int(30))]);
        let r = put(&mut heap, m, n).unwrap();
        assert_eq!(
            entries(&heap, r),
            vec![(int(1), int(10)), (int(2), int(99)), (int(3), int(30))]
        );
    }

    #[test]
    fn put_no_op_returns_same_map() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = map_of(&mut heap, &[(int(1), int(10)), (int(2), int(20))]);
        let n = map_of(&mut heap, &[(int(2), int(20))]);
        let used = heap.used();
        let r = put(&mut heap, m, n).unwrap();
        assert_eq!(heap.get(r), heap.get(m));
        assert_eq!(heap.used(), used);
    }

    #[test]
    fn put_accepts_list_operands() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = map_of(&mut heap, &[(int(1), int(10))]);
        let list = entry_list(&mut heap, &[(int(2), int(20))]);
        let r = put(&mut heap, m, list).unwrap();
        assert_eq!(
            entries(&heap, r),
            vec![(int(1), int(10)), (int(2), int(20))]
        );
    }

    #[test]
    fn put_rejects_non_maps() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = map_of(&mut heap, &[]);
        let bad = heap.new_handle(int(5));
        assert!(matches!(
            put(&mut heap, m, bad),
            Err(MapError::Type { expected: "map", .. })
        ));
        assert!(matches!(
            put(&mut heap, bad, m),
            Err(MapError::Type { expected: "map", .. })
        ));
    }

    #[test]
    fn put_entry_adds_and_replaces() {
        let mut heap = Heap::new(HeapSettings::default());
        let a = atom(&heap, "a");
        let m = map_of(&mut heap, &[(a, int(1))]);
        let two = heap.new_handle(int(2));
        let r = put_entry(&mut heap, m, a, two).unwrap();
        assert_eq!(get(&heap, r, a).unwrap(), Some(int(2)));
        let r2 = put_entry(&mut heap, r, int(0), two).unwrap();
        assert_eq!(entries(&heap, r2), vec![(int(0), int(2)), (a, int(2))]);
        // input untouched
        assert_eq!(get(&heap, m, a).unwrap(), Some(int(1)));
    }

    #[test]
    fn put_entry_rejects_non_keys() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = map_of(&mut heap, &[]);
        let v = heap.new_handle(int(1));
        assert!(matches!(
            put_entry(&mut heap, m, Value::UNBOUND, v),
            Err(MapError::Type { expected: "map-key", .. })
        ));
    }

    // ── retry ─────────────────────────────────────────────────────────

    #[test]
    fn operations_survive_reclamation() {
        let mut heap = Heap::new(HeapSettings {
            initial_slots: 16,
            max_slots: 1 << 20,
        });
        let mut m = map_of(&mut heap, &[]);
        for n in 0..200 {
            let v = heap.new_handle(int(n * 2));
            m = put_entry(&mut heap, m, int(n), v).unwrap();
        }
        assert!(heap.stats().reclaims > 0);
        assert!(heap.stats().retries > 0);
        let view = MapView::new(&heap, heap.get(m)).unwrap();
        assert_eq!(view.len(), 200);
        for n in 0..200 {
            assert_eq!(view.lookup(int(n)), Some(int(n * 2)));
        }
    }

    #[test]
    fn escaped_update_chain_fits_a_tight_heap() {
        let mut heap = Heap::new(HeapSettings {
            initial_slots: 64,
            max_slots: 4096,
        });
        let base = heap.handle_count();
        let mark = heap.mark();
        let m = map_of(&mut heap, &[]);
        let mut m = heap.escape(mark, m);
        for n in 0..100 {
            let v = heap.new_handle(int(n * 3));
            let next = put_entry(&mut heap, m, int(n), v).unwrap();
            m = heap.escape(mark, next);
            assert_eq!(heap.handle_count(), base + 1);
        }
        assert!(heap.stats().reclaims > 0);
        let view = MapView::new(&heap, heap.get(m)).unwrap();
        assert_eq!(view.len(), 100);
        for n in 0..100 {
            assert_eq!(view.lookup(int(n)), Some(int(n * 3)));
        }
    }

    #[test]
    fn out_of_memory_is_reported() {
        let mut heap = Heap::new(HeapSettings {
            initial_slots: 8,
            max_slots: 8,
        });
        let m = heap.alloc_list(&[]).unwrap();
        let m = heap.new_handle(m);
        let v = heap.new_handle(int(0));
        let mut result = put_entry(&mut heap, m, int(0), v);
        for n in 1..4 {
            let Ok(next) = result else { break };
            result = put_entry(&mut heap, next, int(n), v);
        }
        assert!(matches!(result, Err(MapError::OutOfMemory { limit: 8, .. })));
    }
}
