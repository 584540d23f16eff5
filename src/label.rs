//! Symbolic labels and data-segment declarations. A `Label` is just an
//! interned name; label resolution to addresses lives in `symboltable`.

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

/**
  A named symbolic reference. Labels are created by the assembler front end,
  interned, and never mutated; branch and jump instructions hold them until
  the symbol table resolves them to addresses.
*/
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Label {
  pub name: DefaultAtom,
}

impl Label {
  pub fn new(name: &str) -> Label {
    Label { name: DefaultAtom::from(name) }
  }
}

impl Display for Label {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name)
  }
}

/// The payload of a data-segment directive.
#[derive(Clone, PartialEq, Debug)]
pub enum DeclData {
  Word(Vec<i32>),
  Half(Vec<i32>),
  Byte(Vec<i32>),
  Float(Vec<f32>),
  Double(Vec<f64>),
  Ascii(String),
  Asciiz(String),
  Space(u32),
}

/**
  A labeled data-segment declaration, e.g. `msg: .asciiz "hi"`. The
  `directive` keeps the storage keyword with the leading `.` stripped and is
  always non-empty. Declarations are created once during parsing and owned by
  the program's data-segment table; this core only images them into memory.
*/
#[derive(Clone, PartialEq, Debug)]
pub struct Declaration {
  pub label:     Label,
  pub directive: DefaultAtom,
  pub data:      DeclData,
}

impl Declaration {
  pub fn new(label: Label, directive: &str, data: DeclData) -> Declaration {
    debug_assert!(!directive.is_empty());
    Declaration {
      label,
      directive: DefaultAtom::from(directive),
      data,
    }
  }

  /// Number of bytes this declaration occupies in the data segment.
  pub fn byte_len(&self) -> usize {
    match &self.data {
      DeclData::Word(values)   => 4 * values.len(),
      DeclData::Half(values)   => 2 * values.len(),
      DeclData::Byte(values)   => values.len(),
      DeclData::Float(values)  => 4 * values.len(),
      DeclData::Double(values) => 8 * values.len(),
      DeclData::Ascii(text)    => text.len(),
      DeclData::Asciiz(text)   => text.len() + 1,
      DeclData::Space(n)       => *n as usize,
    }
  }

  /// Encodes the payload as little-endian bytes, ready to copy into the data
  /// segment.
  pub fn to_bytes(&self) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(self.byte_len());
    match &self.data {

      DeclData::Word(values) => {
        for v in values {
          bytes.extend_from_slice(&v.to_le_bytes());
        }
      }

      DeclData::Half(values) => {
        for v in values {
          bytes.extend_from_slice(&(*v as i16).to_le_bytes());
        }
      }

      DeclData::Byte(values) => {
        for v in values {
          bytes.push(*v as u8);
        }
      }

      DeclData::Float(values) => {
        for v in values {
          bytes.extend_from_slice(&v.to_bits().to_le_bytes());
        }
      }

      DeclData::Double(values) => {
        for v in values {
          bytes.extend_from_slice(&v.to_bits().to_le_bytes());
        }
      }

      DeclData::Ascii(text) => {
        bytes.extend_from_slice(text.as_bytes());
      }

      DeclData::Asciiz(text) => {
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
      }

      DeclData::Space(n) => {
        bytes.resize(*n as usize, 0);
      }

    }
    bytes
  }
}

impl Display for Declaration {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}: .{}", self.label, self.directive)
  }
}
