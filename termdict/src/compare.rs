use crate::{Heap, Value};

/// Structural equality of two values.
///
/// Immediates compare by their word, heap objects by header and then slot by
/// slot. Two unbound values are equal. Runs with an explicit work list so deep
/// terms do not grow the Rust stack.
pub fn equal(heap: &Heap, a: Value, b: Value) -> bool {
    let mut pending = vec![(a, b)];
    while let Some((a, b)) = pending.pop() {
        if a == b {
            continue;
        }
        match (heap.object(a), heap.object(b)) {
            (Some((ha, body_a)), Some((hb, body_b))) => {
                if ha != hb {
                    return false;
                }
                pending.extend(body_a.iter().copied().zip(body_b.iter().copied()));
            }
            _ => return false,
        }
    }
    true
}
