mod atoms;
mod compare;
mod error;
mod format;
mod header;
mod heap;
mod key;
pub mod map;
mod reader;
mod term;
mod value;

pub use atoms::{Atom, AtomTable};
pub use compare::equal;
pub use error::{Interrupt, MapError};
pub use header::{Header, MAX_ARITY, ObjectType};
pub use heap::{
    Handle, HandleMark, Heap, HeapSettings, HeapStats, InsufficientSpace, OutOfMemory, Region,
    with_retry,
};
pub use key::{Key, compare_keys};
pub use map::{
    Entries, Enumerator, MapView, class_of, create, get, is_map, is_map_of_class, is_valid_map,
    put, put_entry,
};
pub use reader::{ReadError, ReadTermError, Term, parse, read_term};
pub use term::Compound;
pub use value::{FIXNUM_MAX, FIXNUM_MIN, Value};
