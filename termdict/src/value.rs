use crate::Atom;

/// Tag constants.
const FIXNUM_MASK: u64 = 0b1;
const TAG_MASK: u64 = 0b111;
const TAG_BITS: u32 = 3;
const REF_TAG: u64 = 0b001;
const HEADER_TAG: u64 = 0b011;
const ATOM_TAG: u64 = 0b101;
const UNBOUND_TAG: u64 = 0b111;

/// Smallest and largest integers that fit a fixnum.
pub const FIXNUM_MIN: i64 = i64::MIN >> 1;
pub const FIXNUM_MAX: i64 = i64::MAX >> 1;

/// A tagged 64-bit heap word.
///
/// Encoding:
/// - **Fixnum**:    `...XXXXX0`: 63-bit signed integer (low bit 0).
/// - **Reference**: `...XXX001`: slot offset of an object header in the heap.
/// - **Header**:    `...XXX011`: only valid as the first slot of a heap object.
/// - **Atom**:      `...XXX101`: interned symbol identifier.
/// - **Unbound**:   `000...111`: a logically unbound variable.
///
/// References are offsets, not pointers: they stay meaningful only until the
/// next reclamation of the heap they point into.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(u64);

impl Value {
    pub const UNBOUND: Value = Value(UNBOUND_TAG);

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    // ── Fixnum ─────────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_fixnum(self) -> bool {
        self.0 & FIXNUM_MASK == 0
    }

    /// Callers must have range-checked `n`; see [`Value::try_from_i64`].
    #[inline(always)]
    pub(crate) fn from_i64(n: i64) -> Self {
        debug_assert!(
            (FIXNUM_MIN..=FIXNUM_MAX).contains(&n),
            "fixnum overflow: {n}"
        );
        Self((n << 1) as u64)
    }

    /// Fixnum for `n`, or `None` outside `FIXNUM_MIN..=FIXNUM_MAX`.
    #[inline]
    pub fn try_from_i64(n: i64) -> Option<Self> {
        (FIXNUM_MIN..=FIXNUM_MAX)
            .contains(&n)
            .then(|| Self::from_i64(n))
    }

    #[inline(always)]
    pub fn as_i64(self) -> Option<i64> {
        self.is_fixnum().then_some((self.0 as i64) >> 1)
    }

    // ── Reference ──────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_ref(self) -> bool {
        self.0 & TAG_MASK == REF_TAG
    }

    #[inline(always)]
    pub(crate) fn from_offset(offset: usize) -> Self {
        Self(((offset as u64) << TAG_BITS) | REF_TAG)
    }

    /// Slot offset of the referenced object.
    #[inline(always)]
    pub(crate) fn offset(self) -> Option<usize> {
        self.is_ref().then_some((self.0 >> TAG_BITS) as usize)
    }

    // ── Header ─────────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_header(self) -> bool {
        self.0 & TAG_MASK == HEADER_TAG
    }

    #[inline(always)]
    pub(crate) const fn header_payload(self) -> u64 {
        self.0 >> TAG_BITS
    }

    #[inline(always)]
    pub(crate) const fn from_header_payload(payload: u64) -> Self {
        Self((payload << TAG_BITS) | HEADER_TAG)
    }

    // ── Atom ───────────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_atom(self) -> bool {
        self.0 & TAG_MASK == ATOM_TAG
    }

    #[inline(always)]
    pub fn from_atom(atom: Atom) -> Self {
        Self(((atom.index() as u64) << TAG_BITS) | ATOM_TAG)
    }

    #[inline(always)]
    pub fn as_atom(self) -> Option<Atom> {
        self.is_atom()
            .then(|| Atom::from_index((self.0 >> TAG_BITS) as u32))
    }

    // ── Unbound ────────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_unbound(self) -> bool {
        self.0 == UNBOUND_TAG
    }

    /// Atoms and fixnums are the only values allowed as map keys.
    #[inline(always)]
    pub const fn is_key(self) -> bool {
        self.is_fixnum() || self.is_atom()
    }

    /// Values that carry no heap reference and survive reclamation as-is.
    #[inline(always)]
    pub const fn is_immediate(self) -> bool {
        !self.is_ref()
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(n) = self.as_i64() {
            write!(f, "Fixnum({n})")
        } else if let Some(offset) = self.offset() {
            write!(f, "Ref(@{offset})")
        } else if let Some(atom) = self.as_atom() {
            write!(f, "Atom(#{})", atom.index())
        } else if self.is_unbound() {
            write!(f, "Unbound")
        } else {
            write!(f, "Header(0x{:016x})", self.0)
        }
    }
}

impl From<Atom> for Value {
    fn from(atom: Atom) -> Self {
        Value::from_atom(atom)
    }
}
