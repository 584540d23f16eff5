//! Register-name model for the MIPS32 core: the 32 general-purpose registers,
//! the 32 floating-point registers, and conversions between their textual
//! names, their numeric encodings, and their storage indices.

use std::convert::TryFrom;
use std::str::FromStr;

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/**
  The general-purpose register file. Variant order is the hardware register
  number, so `Gpr::T0 as u8 == 8`. Each register parses from both its symbolic
  name and its numeric alias (`$t0` or `$8`) and displays as the symbolic name.
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq, Ord, PartialOrd, Debug, Hash
)]
#[repr(u8)]
pub enum Gpr {
  #[strum(to_string = "$zero", serialize = "$0")]  Zero,
  #[strum(to_string = "$at",   serialize = "$1")]  At,
  #[strum(to_string = "$v0",   serialize = "$2")]  V0,
  #[strum(to_string = "$v1",   serialize = "$3")]  V1,
  #[strum(to_string = "$a0",   serialize = "$4")]  A0,
  #[strum(to_string = "$a1",   serialize = "$5")]  A1,
  #[strum(to_string = "$a2",   serialize = "$6")]  A2,
  #[strum(to_string = "$a3",   serialize = "$7")]  A3,
  #[strum(to_string = "$t0",   serialize = "$8")]  T0,
  #[strum(to_string = "$t1",   serialize = "$9")]  T1,
  #[strum(to_string = "$t2",   serialize = "$10")] T2,
  #[strum(to_string = "$t3",   serialize = "$11")] T3,
  #[strum(to_string = "$t4",   serialize = "$12")] T4,
  #[strum(to_string = "$t5",   serialize = "$13")] T5,
  #[strum(to_string = "$t6",   serialize = "$14")] T6,
  #[strum(to_string = "$t7",   serialize = "$15")] T7,
  #[strum(to_string = "$s0",   serialize = "$16")] S0,
  #[strum(to_string = "$s1",   serialize = "$17")] S1,
  #[strum(to_string = "$s2",   serialize = "$18")] S2,
  #[strum(to_string = "$s3",   serialize = "$19")] S3,
  #[strum(to_string = "$s4",   serialize = "$20")] S4,
  #[strum(to_string = "$s5",   serialize = "$21")] S5,
  #[strum(to_string = "$s6",   serialize = "$22")] S6,
  #[strum(to_string = "$s7",   serialize = "$23")] S7,
  #[strum(to_string = "$t8",   serialize = "$24")] T8,
  #[strum(to_string = "$t9",   serialize = "$25")] T9,
  #[strum(to_string = "$k0",   serialize = "$26")] K0,
  #[strum(to_string = "$k1",   serialize = "$27")] K1,
  #[strum(to_string = "$gp",   serialize = "$28")] Gp,
  #[strum(to_string = "$sp",   serialize = "$29")] Sp,
  #[strum(to_string = "$fp",   serialize = "$30", serialize = "$s8")] Fp,
  #[strum(to_string = "$ra",   serialize = "$31")] Ra,
}

/// The floating-point (coprocessor 1) register file, `$f0`..`$f31`. A double
/// precision value occupies an even/odd pair with the even register holding
/// the low word.
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq, Ord, PartialOrd, Debug, Hash
)]
#[repr(u8)]
pub enum Fpr {
  #[strum(serialize = "$f0")]  F0,
  #[strum(serialize = "$f1")]  F1,
  #[strum(serialize = "$f2")]  F2,
  #[strum(serialize = "$f3")]  F3,
  #[strum(serialize = "$f4")]  F4,
  #[strum(serialize = "$f5")]  F5,
  #[strum(serialize = "$f6")]  F6,
  #[strum(serialize = "$f7")]  F7,
  #[strum(serialize = "$f8")]  F8,
  #[strum(serialize = "$f9")]  F9,
  #[strum(serialize = "$f10")] F10,
  #[strum(serialize = "$f11")] F11,
  #[strum(serialize = "$f12")] F12,
  #[strum(serialize = "$f13")] F13,
  #[strum(serialize = "$f14")] F14,
  #[strum(serialize = "$f15")] F15,
  #[strum(serialize = "$f16")] F16,
  #[strum(serialize = "$f17")] F17,
  #[strum(serialize = "$f18")] F18,
  #[strum(serialize = "$f19")] F19,
  #[strum(serialize = "$f20")] F20,
  #[strum(serialize = "$f21")] F21,
  #[strum(serialize = "$f22")] F22,
  #[strum(serialize = "$f23")] F23,
  #[strum(serialize = "$f24")] F24,
  #[strum(serialize = "$f25")] F25,
  #[strum(serialize = "$f26")] F26,
  #[strum(serialize = "$f27")] F27,
  #[strum(serialize = "$f28")] F28,
  #[strum(serialize = "$f29")] F29,
  #[strum(serialize = "$f30")] F30,
  #[strum(serialize = "$f31")] F31,
}

impl Gpr {
  /// Index into the general register vector.
  pub fn idx(self) -> usize {
    Into::<u8>::into(self) as usize
  }

  pub fn name(self) -> &'static str {
    self.into()
  }
}

impl Fpr {
  /// Index into the floating register vector.
  pub fn idx(self) -> usize {
    Into::<u8>::into(self) as usize
  }

  pub fn name(self) -> &'static str {
    self.into()
  }

  /// Whether this register can anchor a double-precision pair.
  pub fn is_even(self) -> bool {
    self.idx() % 2 == 0
  }

  /// The odd partner of an even register. `None` for odd registers, which
  /// cannot anchor a double.
  pub fn pair(self) -> Option<Fpr> {
    match self.is_even() {
      true  => Fpr::try_from(self.idx() as u8 + 1).ok(),
      false => None
    }
  }
}

/// An `Either` type over the two register files, for operands whose bank is
/// only known from their textual name.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Register {
  Gpr(Gpr),
  Fpr(Fpr),
}

impl FromStr for Register {
  type Err = strum::ParseError;

  fn from_str(name: &str) -> Result<Register, Self::Err> {
    // Floating names all begin with `$f`, but `$fp` is a GPR.
    if name.starts_with("$f") && name != "$fp" {
      Fpr::from_str(name).map(Register::Fpr)
    } else {
      Gpr::from_str(name).map(Register::Gpr)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gpr_names_round_trip() {
    assert_eq!(Gpr::T0.to_string(), "$t0");
    assert_eq!(Gpr::from_str("$t0").unwrap(), Gpr::T0);
    assert_eq!(Gpr::from_str("$8").unwrap(), Gpr::T0);
    assert_eq!(Gpr::from_str("$s8").unwrap(), Gpr::Fp);
    assert_eq!(Gpr::try_from(31u8).unwrap(), Gpr::Ra);
    assert!(Gpr::from_str("$t10").is_err());
  }

  #[test]
  fn fpr_pairing() {
    assert_eq!(Fpr::F0.pair(), Some(Fpr::F1));
    assert_eq!(Fpr::F1.pair(), None);
    assert_eq!(Fpr::F30.pair(), Some(Fpr::F31));
  }

  #[test]
  fn register_bank_resolution() {
    assert_eq!(Register::from_str("$f2").unwrap(), Register::Fpr(Fpr::F2));
    assert_eq!(Register::from_str("$fp").unwrap(), Register::Gpr(Gpr::Fp));
    assert_eq!(Register::from_str("$v0").unwrap(), Register::Gpr(Gpr::V0));
  }
}
