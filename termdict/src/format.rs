use std::fmt::Write;

use crate::{Atom, Heap, ObjectType, Value};

/// Nesting deeper than this prints as `...`.
const MAX_DEPTH: usize = 64;

fn is_plain_atom(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_infix(name: Atom) -> bool {
    matches!(name, Atom::MINUS | Atom::EQUALS | Atom::COLON)
}

impl Heap {
    /// Text of `value` in the syntax [`parse`](crate::parse) reads.
    pub fn render(&self, value: Value) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value, 0);
        out
    }

    fn write_atom(&self, out: &mut String, atom: Atom) {
        let Some(name) = self.atoms().name(atom) else {
            let _ = write!(out, "<atom {}>", atom.index());
            return;
        };
        if atom == Atom::NIL || is_plain_atom(&name) {
            out.push_str(&name);
        } else {
            out.push('\'');
            for c in name.chars() {
                if c == '\'' {
                    out.push('\'');
                }
                out.push(c);
            }
            out.push('\'');
        }
    }

    fn write_value(&self, out: &mut String, value: Value, depth: usize) {
        if depth > MAX_DEPTH {
            out.push_str("...");
            return;
        }
        if let Some(n) = value.as_i64() {
            let _ = write!(out, "{n}");
            return;
        }
        if let Some(atom) = value.as_atom() {
            self.write_atom(out, atom);
            return;
        }
        if value.is_unbound() {
            out.push('_');
            return;
        }
        let Some((header, body)) = self.object(value) else {
            let _ = write!(out, "<{value:?}>");
            return;
        };
        match header.object_type() {
            ObjectType::Compound => self.write_compound(out, value, depth),
            ObjectType::Map => self.write_map(out, body, depth),
        }
    }

    fn write_compound(&self, out: &mut String, value: Value, depth: usize) {
        let Some(term) = self.compound(value) else {
            out.push_str("<compound>");
            return;
        };
        if term.is(Atom::CONS, 2) {
            self.write_list(out, value, depth);
            return;
        }
        if term.arity() == 2 && is_infix(term.name) {
            self.write_operand(out, term.args[0], depth + 1);
            self.write_atom_bare(out, term.name);
            self.write_operand(out, term.args[1], depth + 1);
            return;
        }
        self.write_atom(out, term.name);
        out.push('(');
        for (i, &arg) in term.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_value(out, arg, depth + 1);
        }
        out.push(')');
    }

    fn write_atom_bare(&self, out: &mut String, atom: Atom) {
        if let Some(name) = self.atoms().name(atom) {
            out.push_str(&name);
        }
    }

    /// Operands that are themselves infix terms get parentheses.
    fn write_operand(&self, out: &mut String, value: Value, depth: usize) {
        let nested = self
            .compound(value)
            .is_some_and(|term| term.arity() == 2 && is_infix(term.name));
        if nested {
            out.push('(');
            self.write_value(out, value, depth);
            out.push(')');
        } else {
            self.write_value(out, value, depth);
        }
    }

    fn write_list(&self, out: &mut String, list: Value, depth: usize) {
        out.push('[');
        let mut cursor = list;
        let mut first = true;
        loop {
            match self.compound(cursor) {
                Some(cell) if cell.is(Atom::CONS, 2) => {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    self.write_value(out, cell.args[0], depth + 1);
                    cursor = cell.args[1];
                }
                _ => break,
            }
        }
        if cursor.as_atom() != Some(Atom::NIL) {
            out.push('|');
            self.write_value(out, cursor, depth + 1);
        }
        out.push(']');
    }

    /// `Class{k:v, ...}`, or `_{...}` without a class.
    fn write_map(&self, out: &mut String, body: &[Value], depth: usize) {
        let class = body[0];
        if class.is_unbound() {
            out.push('_');
        } else {
            self.write_value(out, class, depth + 1);
        }
        out.push('{');
        for (i, pair) in body[1..].chunks_exact(2).enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_value(out, pair[0], depth + 1);
            out.push(':');
            self.write_value(out, pair[1], depth + 1);
        }
        out.push('}');
    }
}
