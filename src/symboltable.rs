//! The resolved symbol table handed to the engine by the assembler: a
//! bidirectional mapping between label names and code/data addresses. The
//! reverse direction exists for the host debugger, which wants to print the
//! label a branch target lands on. Really just a convenience wrapper around
//! a `BiMap`.

use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::label::Label;

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
  table: BiMap<DefaultAtom, u32>,
}

impl SymbolTable {
  pub fn new() -> SymbolTable {
    SymbolTable { table: BiMap::new() }
  }

  /// The address a label resolves to, if it was defined.
  pub fn get_address(&self, label: &Label) -> Option<u32> {
    self.table.get_by_left(&label.name).copied()
  }

  /// The label defined at an address, if any.
  pub fn get_symbol(&self, address: u32) -> Option<Label> {
    self.table
        .get_by_right(&address)
        .map(|name| Label { name: name.clone() })
  }

  pub fn insert(&mut self, label: Label, address: u32)
    -> Result<(), (DefaultAtom, u32)>
  {
    self.table.insert_no_overwrite(label.name, address)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookups_go_both_ways() {
    let mut symbols = SymbolTable::new();
    symbols.insert(Label::new("loop"), 0x0040_0008).unwrap();
    assert_eq!(symbols.get_address(&Label::new("loop")), Some(0x0040_0008));
    assert_eq!(symbols.get_symbol(0x0040_0008), Some(Label::new("loop")));
    assert_eq!(symbols.get_address(&Label::new("missing")), None);
  }

  #[test]
  fn duplicate_definitions_are_rejected() {
    let mut symbols = SymbolTable::new();
    symbols.insert(Label::new("loop"), 8).unwrap();
    assert!(symbols.insert(Label::new("loop"), 16).is_err());
  }
}
