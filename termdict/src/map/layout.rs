//! In-heap layout of a map and its validity check.
//!
//! ```text
//! [Header: Map, arity = 1 + 2N] [class] [key_0] [value_0] ... [key_{N-1}] [value_{N-1}]
//! ```
//!
//! A header alone does not make a map. The arity must be odd and the keys
//! must be keys in strictly increasing raw order; anything else carrying the
//! map tag is rejected every time it is checked.

use core::cmp::Ordering;

use crate::{Header, Heap, ObjectType, Value, compare_keys};

/// A map object read in place.
#[derive(Clone, Copy)]
pub struct MapView<'h> {
    /// `[class, key_0, value_0, ...]`
    body: &'h [Value],
}

impl<'h> MapView<'h> {
    /// View anything carrying the map tag, without checking its shape.
    pub(crate) fn from_tag(heap: &'h Heap, value: Value) -> Option<Self> {
        let (header, body) = heap.object(value)?;
        (header.object_type() == ObjectType::Map).then_some(Self { body })
    }

    /// View `value` if it is a valid map.
    pub fn new(heap: &'h Heap, value: Value) -> Option<Self> {
        Self::from_tag(heap, value).filter(MapView::is_well_formed)
    }

    fn is_well_formed(&self) -> bool {
        self.body.len() % 2 == 1 && first_misordered(self.entry_slots()).is_none()
    }

    #[inline(always)]
    pub fn class(&self) -> Value {
        self.body[0]
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.body.len() / 2
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn key(&self, index: usize) -> Value {
        self.body[1 + 2 * index]
    }

    #[inline(always)]
    pub fn value(&self, index: usize) -> Value {
        self.body[2 + 2 * index]
    }

    #[inline(always)]
    pub fn entry(&self, index: usize) -> (Value, Value) {
        (self.key(index), self.value(index))
    }

    /// `[key_0, value_0, key_1, value_1, ...]`
    #[inline(always)]
    pub fn entry_slots(&self) -> &'h [Value] {
        &self.body[1..]
    }

    pub fn entries(&self) -> impl Iterator<Item = (Value, Value)> + 'h {
        self.entry_slots()
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
    }
}

impl core::fmt::Debug for MapView<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MapView")
            .field("class", &self.class())
            .field("len", &self.len())
            .finish()
    }
}

/// Index of the first pair in `slots` whose key is not a key or is not
/// strictly greater than the key before it.
pub(crate) fn first_misordered(slots: &[Value]) -> Option<usize> {
    let mut previous: Option<Value> = None;
    for (index, pair) in slots.chunks_exact(2).enumerate() {
        let key = pair[0];
        if !key.is_key() {
            return Some(index);
        }
        if let Some(prev) = previous {
            if compare_keys(prev, key) != Ordering::Less {
                return Some(index);
            }
        }
        previous = Some(key);
    }
    None
}

/// True when `value` is a map: map tag, odd arity, strictly ordered keys.
/// O(N) on every call.
pub fn is_valid_map(heap: &Heap, value: Value) -> bool {
    MapView::new(heap, value).is_some()
}

/// Write a map with `class` and already sorted `slots` into the heap.
pub(crate) fn write_map(
    heap: &mut Heap,
    class: Value,
    slots: &[Value],
) -> Result<Value, crate::InsufficientSpace> {
    debug_assert!(slots.len() % 2 == 0);
    let region = heap.reserve(2 + slots.len())?;
    let out = heap.region_mut(&region);
    out[0] = Header::map(slots.len() / 2).value();
    out[1] = class;
    out[2..].copy_from_slice(slots);
    Ok(heap.reference(&region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Atom, HeapSettings};

    fn int(n: i64) -> Value {
        Value::from_i64(n)
    }

    fn raw_map(heap: &mut Heap, arity: u32, body: &[Value]) -> Value {
        heap.alloc_object(Header::new(ObjectType::Map, arity), body)
            .unwrap()
    }

    #[test]
    fn empty_map_is_valid() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = write_map(&mut heap, Value::UNBOUND, &[]).unwrap();
        assert!(is_valid_map(&heap, m));
        let view = MapView::new(&heap, m).unwrap();
        assert!(view.is_empty());
        assert!(view.class().is_unbound());
    }

    #[test]
    fn sorted_map_is_valid() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = write_map(
            &mut heap,
            Value::from_atom(Atom::NIL),
            &[int(1), int(10), int(2), int(20)],
        )
        .unwrap();
        let view = MapView::new(&heap, m).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.entry(1), (int(2), int(20)));
        assert_eq!(view.class(), Value::from_atom(Atom::NIL));
        assert_eq!(
            view.entries().collect::<Vec<_>>(),
            vec![(int(1), int(10)), (int(2), int(20))]
        );
    }

    #[test]
    fn unsorted_map_tag_is_not_a_map() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = raw_map(
            &mut heap,
            5,
            &[Value::UNBOUND, int(2), int(20), int(1), int(10)],
        );
        assert!(MapView::from_tag(&heap, m).is_some());
        assert!(!is_valid_map(&heap, m));
    }

    #[test]
    fn equal_adjacent_keys_are_invalid() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = raw_map(
            &mut heap,
            5,
            &[Value::UNBOUND, int(1), int(10), int(1), int(10)],
        );
        assert!(!is_valid_map(&heap, m));
    }

    #[test]
    fn even_arity_is_invalid() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = raw_map(&mut heap, 2, &[Value::UNBOUND, int(1)]);
        assert!(!is_valid_map(&heap, m));
    }

    #[test]
    fn non_key_in_key_slot_is_invalid() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = raw_map(&mut heap, 3, &[Value::UNBOUND, Value::UNBOUND, int(1)]);
        assert!(!is_valid_map(&heap, m));
    }

    #[test]
    fn other_values_are_not_maps() {
        let mut heap = Heap::new(HeapSettings::default());
        let f = heap.atoms().intern("map");
        let compound = heap
            .alloc_compound(f, &[Value::UNBOUND, int(1), int(2)])
            .unwrap();
        assert!(!is_valid_map(&heap, compound));
        assert!(!is_valid_map(&heap, int(3)));
        assert!(!is_valid_map(&heap, Value::from_atom(f)));
    }

    #[test]
    fn first_misordered_finds_the_offending_pair() {
        let slots = [int(1), int(0), int(3), int(0), int(3), int(0)];
        assert_eq!(first_misordered(&slots), Some(2));
        assert_eq!(first_misordered(&slots[..4]), None);
    }
}
