//! Reading terms from text.
//!
//! ```text
//! term    := primary [ ("-" | "=" | ":") primary ]
//! primary := integer | atom [ "(" term {"," term} ")" ] | variable
//!          | "[" [ term {"," term} [ "|" term ] ] "]" | "(" term ")"
//!          | (atom | variable) "{" [ key ":" term {"," key ":" term} ] "}"
//! ```
//!
//! Infix operators do not associate; `a-b-c` must be written `(a-b)-c`.
//! Every variable reads as an unbound value. Text is parsed into a [`Term`]
//! first, which is then loaded into a heap.

use std::fmt;

use crate::map::build;
use crate::{Atom, FIXNUM_MAX, FIXNUM_MIN, Handle, Heap, Interrupt, MapError, Value, with_retry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadError {
    pub message: String,
    /// Byte offset into the source.
    pub offset: usize,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syntax error at byte {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for ReadError {}

/// A parsed term, independent of any heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Int(i64),
    Atom(String),
    Var,
    Compound(String, Vec<Term>),
    List(Vec<Term>, Option<Box<Term>>),
    Dict {
        class: Option<Box<Term>>,
        entries: Vec<(Term, Term)>,
    },
}

impl Term {
    /// Allocate this term, building dict literals as maps.
    pub fn load(&self, heap: &mut Heap) -> Result<Handle, MapError> {
        with_retry(heap, |heap| {
            let value = self.alloc(heap)?;
            Ok(heap.new_handle(value))
        })
    }

    fn alloc(&self, heap: &mut Heap) -> Result<Value, Interrupt> {
        let value = match self {
            Term::Int(n) => Value::from_i64(*n),
            Term::Atom(name) => Value::from_atom(heap.atoms().intern(name)),
            Term::Var => Value::UNBOUND,
            Term::Compound(name, args) => {
                let name = heap.atoms().intern(name);
                let args = args
                    .iter()
                    .map(|arg| arg.alloc(heap))
                    .collect::<Result<Vec<_>, _>>()?;
                heap.alloc_compound(name, &args)?
            }
            Term::List(items, tail) => {
                let items = items
                    .iter()
                    .map(|item| item.alloc(heap))
                    .collect::<Result<Vec<_>, _>>()?;
                let tail = match tail {
                    Some(tail) => tail.alloc(heap)?,
                    None => Value::from_atom(Atom::NIL),
                };
                heap.alloc_list_with_tail(&items, tail)?
            }
            Term::Dict { class, entries } => {
                let class = match class {
                    Some(class) => class.alloc(heap)?,
                    None => Value::UNBOUND,
                };
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = key.alloc(heap)?;
                    let value = value.alloc(heap)?;
                    pairs.push(heap.alloc_compound(Atom::COLON, &[key, value])?);
                }
                let list = heap.alloc_list(&pairs)?;
                build::from_list(heap, list, class)?
            }
        };
        Ok(value)
    }
}

/// Parse exactly one term from `source`.
pub fn parse(source: &str) -> Result<Term, ReadError> {
    let mut parser = Parser::new(source);
    let term = parser.term()?;
    parser.skip_whitespace();
    if !parser.is_done() {
        return Err(parser.error("unexpected text after term"));
    }
    Ok(term)
}

struct Parser<'a> {
    code: &'a [u8],
    source: &'a str,
    offset: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            code: source.as_bytes(),
            source,
            offset: 0,
        }
    }

    #[inline]
    fn is_done(&self) -> bool {
        self.offset == self.code.len()
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.code.get(self.offset).copied()
    }

    #[inline]
    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.offset += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> ReadError {
        ReadError {
            message: message.into(),
            offset: self.offset,
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ReadError> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.offset += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    /// Consume `byte` if it comes next, after whitespace.
    fn eat(&mut self, byte: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.offset += 1;
            true
        } else {
            false
        }
    }

    fn term(&mut self) -> Result<Term, ReadError> {
        let left = self.primary()?;
        self.skip_whitespace();
        let op = match self.peek() {
            Some(b'-') => "-",
            Some(b'=') => "=",
            Some(b':') => ":",
            _ => return Ok(left),
        };
        self.offset += 1;
        let right = self.primary()?;
        Ok(Term::Compound(op.to_string(), vec![left, right]))
    }

    fn primary(&mut self) -> Result<Term, ReadError> {
        self.skip_whitespace();
        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of input"));
        };
        match c {
            b'0'..=b'9' => self.integer(),
            b'-' if self
                .code
                .get(self.offset + 1)
                .is_some_and(u8::is_ascii_digit) =>
            {
                self.integer()
            }
            b'a'..=b'z' => {
                let name = self.word().to_string();
                self.after_atom(name)
            }
            b'\'' => {
                let name = self.quoted()?;
                self.after_atom(name)
            }
            b'A'..=b'Z' | b'_' => {
                self.word();
                if self.peek() == Some(b'{') {
                    return self.dict(None);
                }
                Ok(Term::Var)
            }
            b'[' => self.list(),
            b'(' => {
                self.offset += 1;
                let inner = self.term()?;
                self.expect(b')')?;
                Ok(inner)
            }
            _ => Err(self.error(format!("unexpected '{}'", c as char))),
        }
    }

    fn integer(&mut self) -> Result<Term, ReadError> {
        let start = self.offset;
        if self.peek() == Some(b'-') {
            self.offset += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.offset += 1;
        }
        let text = &self.source[start..self.offset];
        match text.parse::<i64>() {
            Ok(n) if (FIXNUM_MIN..=FIXNUM_MAX).contains(&n) => Ok(Term::Int(n)),
            _ => Err(ReadError {
                message: format!("integer {text} out of range"),
                offset: start,
            }),
        }
    }

    fn word(&mut self) -> &'a str {
        let start = self.offset;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.offset += 1;
        }
        &self.source[start..self.offset]
    }

    fn quoted(&mut self) -> Result<String, ReadError> {
        let start = self.offset;
        self.offset += 1;
        let mut name = String::new();
        loop {
            let Some(c) = self.source[self.offset..].chars().next() else {
                return Err(ReadError {
                    message: "unterminated quoted atom".into(),
                    offset: start,
                });
            };
            self.offset += c.len_utf8();
            if c == '\'' {
                if self.peek() == Some(b'\'') {
                    self.offset += 1;
                    name.push('\'');
                } else {
                    return Ok(name);
                }
            } else {
                name.push(c);
            }
        }
    }

    /// Arguments or dict body directly after an atom.
    fn after_atom(&mut self, name: String) -> Result<Term, ReadError> {
        match self.peek() {
            Some(b'(') => {
                self.offset += 1;
                let mut args = vec![self.term()?];
                while self.eat(b',') {
                    args.push(self.term()?);
                }
                self.expect(b')')?;
                Ok(Term::Compound(name, args))
            }
            Some(b'{') => self.dict(Some(Box::new(Term::Atom(name)))),
            _ => Ok(Term::Atom(name)),
        }
    }

    fn list(&mut self) -> Result<Term, ReadError> {
        self.offset += 1;
        if self.eat(b']') {
            return Ok(Term::Atom("[]".into()));
        }
        let mut items = vec![self.term()?];
        while self.eat(b',') {
            items.push(self.term()?);
        }
        let tail = if self.eat(b'|') {
            Some(Box::new(self.term()?))
        } else {
            None
        };
        self.expect(b']')?;
        Ok(Term::List(items, tail))
    }

    fn dict(&mut self, class: Option<Box<Term>>) -> Result<Term, ReadError> {
        self.offset += 1;
        let mut entries = Vec::new();
        if self.eat(b'}') {
            return Ok(Term::Dict { class, entries });
        }
        loop {
            let key_offset = self.offset;
            let key = self.primary()?;
            if !matches!(key, Term::Int(_) | Term::Atom(_)) {
                return Err(ReadError {
                    message: "dict key must be an integer or an atom".into(),
                    offset: key_offset,
                });
            }
            self.expect(b':')?;
            let value = self.term()?;
            entries.push((key, value));
            if !self.eat(b',') {
                break;
            }
        }
        self.expect(b'}')?;
        Ok(Term::Dict { class, entries })
    }
}

/// Parse `source` and load it into `heap`.
pub fn read_term(heap: &mut Heap, source: &str) -> Result<Handle, ReadTermError> {
    let term = parse(source)?;
    Ok(term.load(heap)?)
}

/// Failure of [`read_term`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTermError {
    Syntax(ReadError),
    Map(MapError),
}

impl fmt::Display for ReadTermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadTermError::Syntax(err) => err.fmt(f),
            ReadTermError::Map(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ReadTermError {}

impl From<ReadError> for ReadTermError {
    fn from(err: ReadError) -> Self {
        ReadTermError::Syntax(err)
    }
}

impl From<MapError> for ReadTermError {
    fn from(err: MapError) -> Self {
        ReadTermError::Map(err)
    }
}
