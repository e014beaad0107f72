//! Resumable enumeration of map entries.

use crate::map::layout::MapView;
use crate::map::type_error;
use crate::{Handle, Heap, MapError, Value, equal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Key given: at most one entry.
    Point(Value),
    /// Key unbound: every entry from `next` on.
    Open { next: usize },
    Done,
}

/// Walks the entries of a map one at a time.
///
/// The enumerator keeps the map behind a [`Handle`] and its position as an
/// entry index, so it may be suspended across allocations and reclamation.
/// Each step re-reads the map from the handle.
#[derive(Debug, Clone)]
pub struct Enumerator {
    map: Handle,
    cursor: Cursor,
    value: Option<Handle>,
}

impl Enumerator {
    /// Enumerate `key` in `map`, or every entry when `key` is unbound.
    pub fn new(heap: &Heap, map: Handle, key: Value) -> Result<Self, MapError> {
        let term = heap.get(map);
        if MapView::new(heap, term).is_none() {
            return Err(type_error(heap, "map", term));
        }
        let cursor = if key.is_unbound() {
            Cursor::Open { next: 0 }
        } else if key.is_key() {
            Cursor::Point(key)
        } else {
            return Err(type_error(heap, "map-key", key));
        };
        Ok(Self {
            map,
            cursor,
            value: None,
        })
    }

    /// Only yield entries whose value is equal to the value behind `value`.
    /// An unbound value matches everything.
    pub fn with_value(mut self, value: Handle) -> Self {
        self.value = Some(value);
        self
    }

    fn accepts(&self, heap: &Heap, value: Value) -> bool {
        match self.value {
            Some(wanted) => {
                let wanted = heap.get(wanted);
                wanted.is_unbound() || equal(heap, wanted, value)
            }
            None => true,
        }
    }

    /// Next matching entry.
    ///
    /// Once a rewind has dropped the map or value handle the enumeration is
    /// exhausted. Handles created after such a rewind reuse the dropped
    /// slots, so callers should still rewind only past finished enumerators.
    pub fn next(&mut self, heap: &Heap) -> Option<(Value, Value)> {
        let rooted = self.value.is_none_or(|value| heap.try_get(value).is_some());
        let map = heap.try_get(self.map).filter(|_| rooted);
        let Some(view) = map.and_then(|map| MapView::from_tag(heap, map)) else {
            self.cursor = Cursor::Done;
            return None;
        };
        match self.cursor {
            Cursor::Point(key) => {
                self.cursor = Cursor::Done;
                let value = view.lookup(key)?;
                self.accepts(heap, value).then_some((key, value))
            }
            Cursor::Open { next } => {
                for index in next..view.len() {
                    let (key, value) = view.entry(index);
                    if self.accepts(heap, value) {
                        self.cursor = if index + 1 < view.len() {
                            Cursor::Open { next: index + 1 }
                        } else {
                            Cursor::Done
                        };
                        return Some((key, value));
                    }
                }
                self.cursor = Cursor::Done;
                None
            }
            Cursor::Done => None,
        }
    }

    /// True once nothing more can be yielded. After the last entry this is
    /// already true, so callers need not keep the enumerator around.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Done
    }

    /// Index of the next entry an open enumeration will look at.
    pub fn position(&self) -> Option<usize> {
        match self.cursor {
            Cursor::Open { next } => Some(next),
            _ => None,
        }
    }

    /// Borrowing iterator over the remaining entries.
    pub fn iter<'a, 'h>(&'a mut self, heap: &'h Heap) -> Entries<'a, 'h> {
        Entries { inner: self, heap }
    }
}

pub struct Entries<'a, 'h> {
    inner: &'a mut Enumerator,
    heap: &'h Heap,
}

impl Iterator for Entries<'_, '_> {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next(self.heap)
    }
}
