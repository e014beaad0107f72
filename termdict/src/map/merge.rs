//! Sorted merge of two maps.

use core::cmp::Ordering;

use log::trace;

use crate::map::layout::{MapView, write_map};
use crate::{Heap, Interrupt, Value, compare_keys, equal};

enum Merge {
    /// Every incoming entry is already present with an equal value.
    Unchanged,
    Changed(Vec<Value>),
}

/// Merge sorted `incoming` slots over sorted `base` slots. On equal keys the
/// incoming pair wins.
fn merge_slots(heap: &Heap, base: &[Value], incoming: &[Value]) -> Merge {
    let mut merged = Vec::with_capacity(base.len() + incoming.len());
    let mut modified = false;
    let (mut i, mut j) = (0, 0);
    while i < base.len() && j < incoming.len() {
        let (base_key, base_value) = (base[i], base[i + 1]);
        let (new_key, new_value) = (incoming[j], incoming[j + 1]);
        match compare_keys(base_key, new_key) {
            Ordering::Less => {
                merged.extend([base_key, base_value]);
                i += 2;
            }
            Ordering::Greater => {
                merged.extend([new_key, new_value]);
                modified = true;
                j += 2;
            }
            Ordering::Equal => {
                merged.extend([new_key, new_value]);
                modified = modified || !equal(heap, base_value, new_value);
                i += 2;
                j += 2;
            }
        }
    }
    if j < incoming.len() {
        modified = true;
    }
    if !modified {
        return Merge::Unchanged;
    }
    merged.extend_from_slice(&base[i..]);
    merged.extend_from_slice(&incoming[j..]);
    Merge::Changed(merged)
}

/// Put the sorted key/value `incoming` slots into `base`.
///
/// Returns `base` itself, without allocating, when nothing would change.
/// Otherwise the result has the class of `base`.
pub(crate) fn put_slots(
    heap: &mut Heap,
    base: Value,
    incoming: &[Value],
) -> Result<Value, Interrupt> {
    let (class, merged) = {
        let view = MapView::from_tag(heap, base).expect("caller validated the map");
        match merge_slots(heap, view.entry_slots(), incoming) {
            Merge::Unchanged => {
                trace!("put of {} entries changes nothing", incoming.len() / 2);
                return Ok(base);
            }
            Merge::Changed(merged) => (view.class(), merged),
        }
    };
    Ok(write_map(heap, class, &merged)?)
}

/// Put every entry of the map `other` into `base`.
pub(crate) fn put_map(
    heap: &mut Heap,
    base: Value,
    other: Value,
) -> Result<Value, Interrupt> {
    let incoming = MapView::from_tag(heap, other)
        .expect("caller validated the map")
        .entry_slots()
        .to_vec();
    put_slots(heap, base, &incoming)
}
