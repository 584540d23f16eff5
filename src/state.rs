/*!

  Machine state for the MIPS32 core: the general and floating register files,
  the hi/lo multiply/divide registers, the eight floating condition flags, the
  program counter, and one mapped little-endian memory region for the data
  segment. The state is exclusively owned and mutated by the execution
  engine; everything here is plain storage with width-typed access.

*/

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::change::MemWidth;
use crate::error::ExecutionError;
use crate::label::{Declaration, Label};
use crate::register::{Fpr, Gpr};

/// Byte size of one encoded instruction; the pc advances by this much unless
/// a control transfer overrides it.
pub const INSTRUCTION_SIZE: u32 = 4;

/// Conventional base of the text segment.
pub const TEXT_BASE: u32 = 0x0040_0000;
/// Conventional base of the data segment.
pub const DATA_BASE: u32 = 0x1000_0000;

/**
  One contiguous mapped memory region, little-endian. Accesses outside the
  region, or misaligned for their width, fail with `AddressError`; nothing is
  silently grown, unlike a heap store, because the valid address range is
  part of the machine contract.
*/
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Memory {
  base  : u32,
  bytes : Vec<u8>,
}

impl Memory {
  pub fn new(base: u32, size: usize) -> Memory {
    Memory { base, bytes: vec![0; size] }
  }

  pub fn base(&self) -> u32 {
    self.base
  }

  pub fn size(&self) -> usize {
    self.bytes.len()
  }

  fn offset(&self, addr: u32, width: MemWidth, pc: u32)
    -> Result<usize, ExecutionError>
  {
    let span = width.bytes();
    let aligned = addr % span == 0;
    // Widened to u64 so addresses near the top of the space cannot wrap
    // around the bound.
    match addr.checked_sub(self.base) {
      Some(offset)
        if aligned && offset as u64 + span as u64 <= self.bytes.len() as u64 =>
      {
        Ok(offset as usize)
      }
      _ => Err(ExecutionError::AddressError { addr, pc }),
    }
  }

  /// Reads `width` bytes at `addr`, zero-extended into a word. Callers that
  /// need sign extension apply it themselves.
  pub fn read(&self, addr: u32, width: MemWidth, pc: u32)
    -> Result<u32, ExecutionError>
  {
    let offset = self.offset(addr, width, pc)?;
    let mut value = 0u32;
    for i in (0..width.bytes() as usize).rev() {
      value = (value << 8) | self.bytes[offset + i] as u32;
    }
    Ok(value)
  }

  /// Overwrites `width` bytes at `addr` with the low bytes of `val`.
  pub fn write(&mut self, addr: u32, val: u32, width: MemWidth, pc: u32)
    -> Result<(), ExecutionError>
  {
    let offset = self.offset(addr, width, pc)?;
    for i in 0..width.bytes() as usize {
      self.bytes[offset + i] = (val >> (8 * i)) as u8;
    }
    Ok(())
  }

  /// Raw image copy, used when loading a data segment. Out-of-range is still
  /// an `AddressError`.
  pub fn load_bytes(&mut self, addr: u32, data: &[u8])
    -> Result<(), ExecutionError>
  {
    let start = self.offset(addr, MemWidth::Byte, 0)?;
    let end = start + data.len();
    if end > self.bytes.len() {
      return Err(ExecutionError::AddressError {
        addr: addr.wrapping_add(data.len() as u32),
        pc: 0,
      });
    }
    self.bytes[start..end].copy_from_slice(data);
    Ok(())
  }
}

/// The complete architectural state the engine executes against.
#[derive(Clone, PartialEq, Debug)]
pub struct Machine {
  gpr       : [u32; 32],
  fpr       : [u32; 32],
  pub hi    : u32,
  pub lo    : u32,
  flags     : [bool; 8],
  pub pc    : u32,
  pub memory: Memory,
}

impl Machine {
  pub fn new(data_base: u32, data_size: usize) -> Machine {
    Machine {
      gpr    : [0; 32],
      fpr    : [0; 32],
      hi     : 0,
      lo     : 0,
      flags  : [false; 8],
      pc     : TEXT_BASE,
      memory : Memory::new(data_base, data_size),
    }
  }

  // region Register access

  pub fn gpr(&self, reg: Gpr) -> u32 {
    self.gpr[reg.idx()]
  }

  /// Writes a general register. `$zero` is hardwired and silently ignores
  /// writes.
  pub fn set_gpr(&mut self, reg: Gpr, value: u32) {
    if reg != Gpr::Zero {
      self.gpr[reg.idx()] = value;
    }
  }

  pub fn fpr(&self, reg: Fpr) -> u32 {
    self.fpr[reg.idx()]
  }

  pub fn set_fpr(&mut self, reg: Fpr, value: u32) {
    self.fpr[reg.idx()] = value;
  }

  /// A single-precision view of a floating register.
  pub fn fpr_single(&self, reg: Fpr) -> f32 {
    f32::from_bits(self.fpr(reg))
  }

  pub fn set_fpr_single(&mut self, reg: Fpr, value: f32) {
    self.set_fpr(reg, value.to_bits());
  }

  /// The double-precision view of an even/odd pair; the even register holds
  /// the low word.
  pub fn fpr_double(&self, even: Fpr) -> f64 {
    let odd = even.pair().unwrap_or(even);
    let bits = ((self.fpr(odd) as u64) << 32) | self.fpr(even) as u64;
    f64::from_bits(bits)
  }

  pub fn set_fpr_double(&mut self, even: Fpr, value: f64) {
    let odd = even.pair().unwrap_or(even);
    let bits = value.to_bits();
    self.set_fpr(even, bits as u32);
    self.set_fpr(odd, (bits >> 32) as u32);
  }

  pub fn flag(&self, flag: u8) -> bool {
    self.flags[flag as usize & 7]
  }

  pub fn set_flag(&mut self, flag: u8, value: bool) {
    self.flags[flag as usize & 7] = value;
  }

  // endregion

  /**
    Images a data-segment table into memory starting at the memory base, each
    declaration aligned to its natural boundary, and returns the resolved
    address of every label for the symbol table.
  */
  pub fn load_data(&mut self, declarations: &[Declaration])
    -> Result<Vec<(Label, u32)>, ExecutionError>
  {
    let mut resolved = Vec::with_capacity(declarations.len());
    let mut cursor = self.memory.base();
    for decl in declarations {
      let align = match decl.directive.as_ref() {
        "word" | "float"  => 4,
        "double"          => 8,
        "half"            => 2,
        _                 => 1,
      };
      cursor = (cursor + align - 1) / align * align;
      self.memory.load_bytes(cursor, &decl.to_bytes())?;
      resolved.push((decl.label.clone(), cursor));
      cursor += decl.byte_len() as u32;
    }
    Ok(resolved)
  }

  fn make_register_table<I>(rows: I) -> Table
    where I: Iterator<Item = (String, u32)>
  {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);
    for (name, value) in rows {
      table.add_row(row![r->format!("{} =", name), format!("{:#010x}", value)]);
    }
    table
  }
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    use std::convert::TryFrom;

    let gpr_table = Machine::make_register_table(
      (0..32u8).map(|i| {
        let reg = Gpr::try_from(i).unwrap();
        (reg.to_string(), self.gpr(reg))
      })
    );
    let fpr_table = Machine::make_register_table(
      (0..32u8).map(|i| {
        let reg = Fpr::try_from(i).unwrap();
        (reg.to_string(), self.fpr(reg))
      })
    );

    let mut combined_table = table!([gpr_table, fpr_table]);
    combined_table.set_titles(row![ub->"General", ub->"Floating"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let flags: String = (0..8u8)
      .map(|i| if self.flag(i) { '1' } else { '0' })
      .collect();

    write!(
      f,
      "pc: {:#010x}  hi: {:#010x}  lo: {:#010x}  flags: {}\n{}",
      self.pc, self.hi, self.lo, flags, combined_table
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memory_width_round_trips() {
    let mut memory = Memory::new(DATA_BASE, 64);
    memory.write(DATA_BASE + 4, 0xdead_beef, MemWidth::Word, 0).unwrap();
    assert_eq!(memory.read(DATA_BASE + 4, MemWidth::Word, 0).unwrap(), 0xdead_beef);
    // Little-endian byte order.
    assert_eq!(memory.read(DATA_BASE + 4, MemWidth::Byte, 0).unwrap(), 0xef);
    assert_eq!(memory.read(DATA_BASE + 6, MemWidth::Half, 0).unwrap(), 0xdead);
  }

  #[test]
  fn memory_rejects_bad_accesses() {
    let mut memory = Memory::new(DATA_BASE, 64);
    // Out of range.
    assert!(memory.read(DATA_BASE + 64, MemWidth::Word, 0).is_err());
    assert!(memory.read(DATA_BASE - 4, MemWidth::Word, 0).is_err());
    // Misaligned.
    assert!(memory.write(DATA_BASE + 2, 1, MemWidth::Word, 0).is_err());
    assert!(memory.read(DATA_BASE + 1, MemWidth::Half, 0).is_err());
    // Last valid word.
    assert!(memory.write(DATA_BASE + 60, 1, MemWidth::Word, 0).is_ok());
  }

  #[test]
  fn addresses_near_the_top_do_not_wrap() {
    let memory = Memory::new(DATA_BASE, 64);
    assert_eq!(
      memory.read(0xffff_ffff, MemWidth::Byte, 0),
      Err(ExecutionError::AddressError { addr: 0xffff_ffff, pc: 0 })
    );
    assert!(memory.read(0xffff_fffc, MemWidth::Word, 0).is_err());
  }

  #[test]
  fn zero_register_is_hardwired() {
    let mut machine = Machine::new(DATA_BASE, 64);
    machine.set_gpr(Gpr::Zero, 99);
    assert_eq!(machine.gpr(Gpr::Zero), 0);
    machine.set_gpr(Gpr::T0, 99);
    assert_eq!(machine.gpr(Gpr::T0), 99);
  }

  #[test]
  fn double_views_split_across_pair() {
    let mut machine = Machine::new(DATA_BASE, 64);
    machine.set_fpr_double(Fpr::F2, 2.5f64);
    assert_eq!(machine.fpr_double(Fpr::F2), 2.5f64);
    let bits = 2.5f64.to_bits();
    assert_eq!(machine.fpr(Fpr::F2), bits as u32);
    assert_eq!(machine.fpr(Fpr::F3), (bits >> 32) as u32);
  }

  #[test]
  fn load_data_resolves_labels() {
    use crate::label::DeclData;

    let mut machine = Machine::new(DATA_BASE, 128);
    let decls = vec![
      Declaration::new(Label::new("msg"), "asciiz", DeclData::Asciiz("ab".into())),
      Declaration::new(Label::new("nums"), "word", DeclData::Word(vec![7, 8])),
    ];
    let resolved = machine.load_data(&decls).unwrap();
    assert_eq!(resolved[0].1, DATA_BASE);
    // Word data aligned past the 3-byte string.
    assert_eq!(resolved[1].1, DATA_BASE + 4);
    assert_eq!(machine.memory.read(DATA_BASE + 4, MemWidth::Word, 0).unwrap(), 7);
  }
}
