use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

/// An interned symbol.
///
/// Identifiers are handed out in interning order, so comparing two atoms
/// tells you which one was interned first and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

impl Atom {
    pub const NIL: Atom = Atom(0);
    pub const CONS: Atom = Atom(1);
    pub const MINUS: Atom = Atom(2);
    pub const EQUALS: Atom = Atom(3);
    pub const COLON: Atom = Atom(4);

    #[inline(always)]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub(crate) const fn from_index(index: u32) -> Self {
        Self(index)
    }
}

/// Names interned before anything else; their position is their identifier.
const WELL_KNOWN: [(Atom, &str); 5] = [
    (Atom::NIL, "[]"),
    (Atom::CONS, "[|]"),
    (Atom::MINUS, "-"),
    (Atom::EQUALS, "="),
    (Atom::COLON, ":"),
];

struct AtomTableImpl {
    names: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, Atom, ahash::RandomState>,
}

/// Process-wide symbol table. Cloning shares the same table.
#[derive(Clone)]
pub struct AtomTable(Arc<RwLock<AtomTableImpl>>);

impl AtomTableImpl {
    fn new() -> Self {
        let mut table = Self {
            names: Vec::new(),
            ids: HashMap::default(),
        };
        for (expected, name) in WELL_KNOWN {
            let atom = table.get_or_add(name);
            debug_assert_eq!(atom, expected);
        }
        table
    }

    fn get_or_add(&mut self, name: &str) -> Atom {
        if let Some(&atom) = self.ids.get(name) {
            return atom;
        }
        let atom = Atom(self.names.len() as u32);
        let interned = Arc::<str>::from(name);
        self.names.push(interned.clone());
        self.ids.insert(interned, atom);
        atom
    }
}

impl AtomTable {
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(AtomTableImpl::new())))
    }

    pub fn intern(&self, name: &str) -> Atom {
        if let Some(atom) = self.lookup(name) {
            return atom;
        }
        self.0.write().get_or_add(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Atom> {
        self.0.read().ids.get(name).copied()
    }

    pub fn name(&self, atom: Atom) -> Option<Arc<str>> {
        self.0.read().names.get(atom.0 as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.read().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for AtomTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AtomTable").field("len", &self.len()).finish()
    }
}
