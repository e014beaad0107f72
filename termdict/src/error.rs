use crate::heap::{InsufficientSpace, OutOfMemory};

/// Errors reported by map operations.
///
/// No operation that returns an error leaves a partially built map
/// reachable from a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// An operand of the wrong kind: not a key, not a map, or an entry that
    /// matches none of the accepted shapes.
    Type {
        expected: &'static str,
        culprit: String,
    },
    /// Well-typed construction input that cannot form a map, such as a key
    /// that occurs twice.
    Shape {
        expected: &'static str,
        culprit: String,
    },
    /// The heap could not grow enough to finish the operation.
    OutOfMemory { requested: usize, limit: usize },
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::Type { expected, culprit } => {
                write!(f, "type error: expected {expected}, found {culprit}")
            }
            MapError::Shape { expected, culprit } => {
                write!(f, "invalid {expected}: {culprit}")
            }
            MapError::OutOfMemory { requested, limit } => write!(
                f,
                "out of memory: {requested} slots needed, heap limit is {limit}"
            ),
        }
    }
}

impl std::error::Error for MapError {}

impl From<OutOfMemory> for MapError {
    fn from(oom: OutOfMemory) -> Self {
        MapError::OutOfMemory {
            requested: oom.requested,
            limit: oom.limit,
        }
    }
}

/// Why a single attempt at an allocating operation stopped.
///
/// `NoSpace` never reaches callers: [`with_retry`](crate::with_retry)
/// reclaims and runs the attempt again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    NoSpace(InsufficientSpace),
    Fail(MapError),
}

impl From<InsufficientSpace> for Interrupt {
    fn from(err: InsufficientSpace) -> Self {
        Interrupt::NoSpace(err)
    }
}

impl From<MapError> for Interrupt {
    fn from(err: MapError) -> Self {
        Interrupt::Fail(err)
    }
}
