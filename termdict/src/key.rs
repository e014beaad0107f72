//! Map keys and the raw order used to store them.
//!
//! The raw order exists for binary search and merging only. Integers sort by
//! value, atoms by interning order, and every integer sorts before every
//! atom. Atom order depends on interning history, so it is neither
//! alphabetical nor stable across runs.

use core::cmp::Ordering;

use crate::{Atom, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Atom(Atom),
}

impl Key {
    #[inline]
    pub fn from_value(value: Value) -> Option<Key> {
        if let Some(n) = value.as_i64() {
            Some(Key::Int(n))
        } else {
            value.as_atom().map(Key::Atom)
        }
    }

    /// The key word, or `None` for an integer outside the fixnum range.
    #[inline]
    pub fn to_value(self) -> Option<Value> {
        match self {
            Key::Int(n) => Value::try_from_i64(n),
            Key::Atom(atom) => Some(Value::from_atom(atom)),
        }
    }
}

impl From<Atom> for Key {
    fn from(atom: Atom) -> Self {
        Key::Atom(atom)
    }
}

/// Rank of a key word within the raw order; only meaningful for keys.
#[inline(always)]
fn rank(value: Value) -> (u8, i64) {
    if let Some(n) = value.as_i64() {
        (0, n)
    } else {
        debug_assert!(value.is_atom(), "not a key: {value:?}");
        (1, (value.raw() >> 3) as i64)
    }
}

/// Compare two key words in raw order.
///
/// Both values must be keys. This agrees with `Key::cmp` on the decoded keys.
#[inline]
pub fn compare_keys(a: Value, b: Value) -> Ordering {
    rank(a).cmp(&rank(b))
}
