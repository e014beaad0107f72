//! Compound terms and lists on the heap.

use crate::{Atom, Header, Heap, InsufficientSpace, ObjectType, Value};

/// Name and arguments of a compound term.
#[derive(Debug, Clone, Copy)]
pub struct Compound<'h> {
    pub name: Atom,
    pub args: &'h [Value],
}

impl<'h> Compound<'h> {
    #[inline(always)]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    #[inline(always)]
    pub fn is(&self, name: Atom, arity: usize) -> bool {
        self.name == name && self.args.len() == arity
    }
}

impl Heap {
    pub fn alloc_compound(
        &mut self,
        name: Atom,
        args: &[Value],
    ) -> Result<Value, InsufficientSpace> {
        let region = self.reserve(2 + args.len())?;
        let slots = self.region_mut(&region);
        slots[0] = Header::new(ObjectType::Compound, args.len() as u32).value();
        slots[1] = Value::from_atom(name);
        slots[2..].copy_from_slice(args);
        Ok(self.reference(&region))
    }

    /// Allocate `[items...]` as `'[|]'/2` cells ending in `[]`.
    pub fn alloc_list(
        &mut self,
        items: &[Value],
    ) -> Result<Value, InsufficientSpace> {
        self.alloc_list_with_tail(items, Value::from_atom(Atom::NIL))
    }

    pub fn alloc_list_with_tail(
        &mut self,
        items: &[Value],
        tail: Value,
    ) -> Result<Value, InsufficientSpace> {
        // one reservation so a list is never half built
        let region = self.reserve(4 * items.len())?;
        if items.is_empty() {
            return Ok(tail);
        }
        for (i, &item) in items.iter().enumerate() {
            let next = if i + 1 < items.len() {
                self.reference_into(&region, 4 * (i + 1))
            } else {
                tail
            };
            let cell = &mut self.region_mut(&region)[4 * i..4 * i + 4];
            cell[0] = Header::new(ObjectType::Compound, 2).value();
            cell[1] = Value::from_atom(Atom::CONS);
            cell[2] = item;
            cell[3] = next;
        }
        Ok(self.reference(&region))
    }

    /// View `value` as a compound term.
    pub fn compound(&self, value: Value) -> Option<Compound<'_>> {
        let (header, body) = self.object(value)?;
        if header.object_type() != ObjectType::Compound {
            return None;
        }
        Some(Compound {
            name: body[0].as_atom()?,
            args: &body[1..],
        })
    }

    /// Elements of a proper list, or `None` for anything else.
    pub fn list_items(&self, list: Value) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        let mut cursor = list;
        loop {
            if cursor.as_atom() == Some(Atom::NIL) {
                return Some(items);
            }
            let cell = self.compound(cursor)?;
            if !cell.is(Atom::CONS, 2) {
                return None;
            }
            items.push(cell.args[0]);
            cursor = cell.args[1];
        }
    }

    #[inline]
    pub fn is_list(&self, value: Value) -> bool {
        value.as_atom() == Some(Atom::NIL)
            || self
                .compound(value)
                .is_some_and(|cell| cell.is(Atom::CONS, 2))
    }
}
