/*!

  The state-change log model. Each variant is an immutable snapshot of one
  atomic mutation the engine is about to perform, holding the PRE-mutation
  value plus the program counter at which the change occurred. Re-applying a
  step's entries in reverse order restores the machine to its prior state,
  which is what makes step-back debugging possible.

  These are pure data records; nothing here mutates anything.

*/

use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumString};

use crate::instruction::RegName;

/// Width of a memory access: word, halfword, or byte.
#[derive(StrumDisplay, EnumString, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum MemWidth {
  #[strum(serialize = "w")] Word,
  #[strum(serialize = "h")] Half,
  #[strum(serialize = "b")] Byte,
}

impl MemWidth {
  /// Number of bytes affected by an access of this width.
  pub fn bytes(self) -> u32 {
    match self {
      MemWidth::Word => 4,
      MemWidth::Half => 2,
      MemWidth::Byte => 1,
    }
  }
}

/// One reversible mutation, recorded immediately before the overwrite.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum StateChange {
  /// A floating condition flag was overwritten; `value` is its prior state.
  Flag { flag: u8, value: bool, pc: u32 },

  /// The multiply/divide special registers were overwritten; one entry
  /// covers the hi/lo pair jointly.
  M { hi: u32, lo: u32, pc: u32 },

  /// A memory cell was overwritten; `val` holds the prior bytes at `addr`,
  /// `width` matches the access actually performed.
  Mem { addr: u32, val: u32, width: MemWidth, pc: u32 },

  /// A register was overwritten. `is_double` marks one half of a
  /// double-precision floating write, which always logs as two entries.
  Reg { reg: RegName, val: u32, pc: u32, is_double: bool },
}

impl StateChange {
  pub fn flag(flag: u8, value: bool, pc: u32) -> StateChange {
    StateChange::Flag { flag, value, pc }
  }

  pub fn m(hi: u32, lo: u32, pc: u32) -> StateChange {
    StateChange::M { hi, lo, pc }
  }

  pub fn mem(addr: u32, val: u32, width: MemWidth, pc: u32) -> StateChange {
    StateChange::Mem { addr, val, width, pc }
  }

  pub fn reg(reg: RegName, val: u32, pc: u32) -> StateChange {
    StateChange::Reg { reg, val, pc, is_double: false }
  }

  pub fn reg_double(reg: RegName, val: u32, pc: u32) -> StateChange {
    StateChange::Reg { reg, val, pc, is_double: true }
  }

  /// The program counter at which this change was made.
  pub fn pc(&self) -> u32 {
    match self {
      | StateChange::Flag { pc, .. }
      | StateChange::M    { pc, .. }
      | StateChange::Mem  { pc, .. }
      | StateChange::Reg  { pc, .. } => *pc,
    }
  }
}

impl Display for StateChange {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      StateChange::Flag { flag, value, pc } => {
        write!(f, "[{:#010x}] flag {} was {}", pc, flag, value)
      }

      StateChange::M { hi, lo, pc } => {
        write!(f, "[{:#010x}] hi/lo were {:#x}/{:#x}", pc, hi, lo)
      }

      StateChange::Mem { addr, val, width, pc } => {
        write!(f, "[{:#010x}] mem[{:#010x}].{} was {:#x}", pc, addr, width, val)
      }

      StateChange::Reg { reg, val, pc, is_double } => {
        match is_double {
          true  => write!(f, "[{:#010x}] {} was {:#x} (double half)", pc, reg, val),
          false => write!(f, "[{:#010x}] {} was {:#x}", pc, reg, val),
        }
      }

    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::instruction::atom;
  use std::str::FromStr;

  #[test]
  fn width_letters_round_trip() {
    assert_eq!(MemWidth::Word.to_string(), "w");
    assert_eq!(MemWidth::from_str("h").unwrap(), MemWidth::Half);
    assert_eq!(MemWidth::Byte.bytes(), 1);
  }

  #[test]
  fn constructors_carry_pc() {
    let change = StateChange::reg(atom("$t0"), 7, 0x0040_0004);
    assert_eq!(change.pc(), 0x0040_0004);
    assert_eq!(
      change,
      StateChange::Reg {
        reg: atom("$t0"), val: 7, pc: 0x0040_0004, is_double: false
      }
    );
  }
}
