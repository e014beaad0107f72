use core::cmp::Ordering;

use crate::{MapView, Value, compare_keys};

impl<'h> MapView<'h> {
    /// Index of `key`, or the index it would be inserted at.
    ///
    /// Binary search over the key slots only; values are never compared.
    pub fn position(&self, key: Value) -> Result<usize, usize> {
        debug_assert!(key.is_key(), "lookup with a non-key: {key:?}");
        let mut low = 0;
        let mut high = self.len();
        while low < high {
            let mid = low + (high - low) / 2;
            match compare_keys(self.key(mid), key) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Ok(mid),
            }
        }
        Err(low)
    }

    /// Value stored under `key`.
    #[inline]
    pub fn lookup(&self, key: Value) -> Option<Value> {
        self.position(key).ok().map(|index| self.value(index))
    }

    #[inline]
    pub fn contains_key(&self, key: Value) -> bool {
        self.position(key).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use crate::map::layout::write_map;
    use crate::{Heap, HeapSettings, MapView, Value};

    fn int(n: i64) -> Value {
        Value::from_i64(n)
    }

    fn map_of(heap: &mut Heap, keys: &[i64]) -> Value {
        let slots: Vec<Value> = keys
            .iter()
            .flat_map(|&k| [int(k), int(k * 100)])
            .collect();
        write_map(heap, Value::UNBOUND, &slots).unwrap()
    }

    #[test]
    fn finds_every_key() {
        let mut heap = Heap::new(HeapSettings::default());
        let keys: Vec<i64> = (0..37).map(|k| k * 3 - 20).collect();
        let m = map_of(&mut heap, &keys);
        let view = MapView::new(&heap, m).unwrap();
        for &k in &keys {
            assert_eq!(view.lookup(int(k)), Some(int(k * 100)), "key {k}");
        }
    }

    #[test]
    fn misses_absent_keys() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = map_of(&mut heap, &[2, 4, 6]);
        let view = MapView::new(&heap, m).unwrap();
        for k in [1, 3, 5, 7, -100] {
            assert_eq!(view.lookup(int(k)), None);
        }
        let atom = Value::from_atom(heap.atoms().intern("x"));
        assert_eq!(view.lookup(atom), None);
    }

    #[test]
    fn insertion_positions() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = map_of(&mut heap, &[2, 4, 6]);
        let view = MapView::new(&heap, m).unwrap();
        assert_eq!(view.position(int(1)), Err(0));
        assert_eq!(view.position(int(4)), Ok(1));
        assert_eq!(view.position(int(5)), Err(2));
        assert_eq!(view.position(int(7)), Err(3));
    }

    #[test]
    fn empty_map_has_nothing() {
        let mut heap = Heap::new(HeapSettings::default());
        let m = map_of(&mut heap, &[]);
        let view = MapView::new(&heap, m).unwrap();
        assert_eq!(view.lookup(int(0)), None);
        assert!(!view.contains_key(int(0)));
    }
}
