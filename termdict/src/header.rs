use crate::Value;

/// Object type stored in the low bits of a header's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectType {
    /// `[header] [name: atom] [arg_0] ... [arg_{arity-1}]`
    Compound = 0,
    /// `[header] [class] [key_0] [value_0] ... [key_{n-1}] [value_{n-1}]`
    Map = 1,
}

impl ObjectType {
    pub const COUNT: u64 = Self::Map as u64 + 1;
}

const TYPE_BITS: u32 = 4;
const TYPE_MASK: u64 = (1 << TYPE_BITS) - 1;
pub const MAX_ARITY: u32 = u32::MAX;

/// The first slot of every heap object.
///
/// ```text
/// bits 0..3:   tag = 0b011
/// bits 3..7:   object type
/// bits 7..39:  arity
/// ```
///
/// For a compound the arity is its argument count. For a map the arity is
/// the class slot plus two slots per entry, so a map header whose arity is
/// even is malformed.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Header(Value);

impl Header {
    #[inline(always)]
    pub fn new(object_type: ObjectType, arity: u32) -> Self {
        let payload = ((arity as u64) << TYPE_BITS) | object_type as u64;
        Self(Value::from_header_payload(payload))
    }

    #[inline(always)]
    pub fn map(entries: usize) -> Self {
        Self::new(ObjectType::Map, (1 + 2 * entries) as u32)
    }

    #[inline]
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_header() {
            return None;
        }
        let raw_type = value.header_payload() & TYPE_MASK;
        (raw_type < ObjectType::COUNT).then_some(Self(value))
    }

    #[inline(always)]
    pub fn value(self) -> Value {
        self.0
    }

    #[inline(always)]
    pub fn object_type(self) -> ObjectType {
        match self.0.header_payload() & TYPE_MASK {
            0 => ObjectType::Compound,
            _ => ObjectType::Map,
        }
    }

    #[inline(always)]
    pub fn arity(self) -> u32 {
        (self.0.header_payload() >> TYPE_BITS) as u32
    }

    /// Number of slots after the header.
    #[inline(always)]
    pub fn body_len(self) -> usize {
        match self.object_type() {
            ObjectType::Compound => 1 + self.arity() as usize,
            ObjectType::Map => self.arity() as usize,
        }
    }

    /// Number of slots including the header.
    #[inline(always)]
    pub fn object_len(self) -> usize {
        1 + self.body_len()
    }
}

impl core::fmt::Debug for Header {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Header")
            .field("type", &self.object_type())
            .field("arity", &self.arity())
            .finish()
    }
}
