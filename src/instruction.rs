/*!

  The instruction model: a tagged enum describing every decoded MIPS
  instruction form with enough structure to (a) pretty-print it back to
  conventional assembly text and (b) let the execution engine pattern-match on
  variant and mnemonic to select semantics.

  Mnemonics and register operands are interned strings. This core performs no
  mnemonic validation; the assembler front end owns that. The single
  construction-time check is the floating condition-flag range (`0..=7`) on
  `Compare`, `BranchFloat`, and `MoveCond`, whose constructors return
  `Result` so the assembler must handle the invalid-flag case explicitly.

*/

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

use crate::error::ConstructionError;
use crate::label::Label;

/// Interned instruction mnemonic, e.g. `addiu` or `c.eq.s`.
pub type Mnemonic = DefaultAtom;
/// Interned register-name operand, e.g. `$t0` or `$f12`.
pub type RegName = DefaultAtom;

pub(crate) fn atom(name: &str) -> DefaultAtom {
  DefaultAtom::from(name)
}

/// A source operand: either a register name or an immediate value.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Operand {
  Reg(RegName),
  Imm(i64),
}

impl Display for Operand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Operand::Reg(name)  => write!(f, "{}", name),
      Operand::Imm(value) => write!(f, "{}", value),
    }
  }
}

// region Variant payloads

/**
  Register-format instructions. Three shapes share this struct:

    * `{rd, rs, rt}` — three-register arithmetic/logic (`add`, `slt`, ...)
      and floating arithmetic (`add.s`, `div.d`, ...);
    * `{rs, rt}` — two-source ops with implicit hi/lo destinations
      (`mult`, `div`, ...), `rd` absent;
    * `{rd?, rs}` — `jr`/`jalr`, `rt` never populated, `jalr`'s link
      register defaulting to `$ra` when `rd` is absent.
*/
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct RType {
  pub operation : Mnemonic,
  pub rd        : Option<RegName>,
  pub rs        : RegName,
  pub rt        : Option<RegName>,
}

impl RType {
  pub fn three(operation: &str, rd: &str, rs: &str, rt: &str) -> RType {
    RType {
      operation: atom(operation),
      rd: Some(atom(rd)),
      rs: atom(rs),
      rt: Some(atom(rt)),
    }
  }

  /// `mult`/`div` shape: two sources, implicit hi/lo destination.
  pub fn two_source(operation: &str, rs: &str, rt: &str) -> RType {
    RType {
      operation: atom(operation),
      rd: None,
      rs: atom(rs),
      rt: Some(atom(rt)),
    }
  }

  /// Two-register form: float moves (`mov.s`, `mfc1`, ...).
  pub fn two(operation: &str, rd: &str, rs: &str) -> RType {
    RType {
      operation: atom(operation),
      rd: Some(atom(rd)),
      rs: atom(rs),
      rt: None,
    }
  }

  /// `jr`/`jalr` shape: `rt` is never populated.
  pub fn jump(operation: &str, rd: Option<&str>, rs: &str) -> RType {
    RType {
      operation: atom(operation),
      rd: rd.map(atom),
      rs: atom(rs),
      rt: None,
    }
  }
}

impl Display for RType {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.operation.as_ref() {

      // The `rd, ` prefix is elided for `jr`; `jalr` elides a `$ra` link.
      "jr" => write!(f, "jr {}", self.rs),

      "jalr" => {
        match &self.rd {
          Some(rd) if rd.as_ref() != "$ra" => write!(f, "jalr {}, {}", rd, self.rs),
          _                                => write!(f, "jalr {}", self.rs),
        }
      }

      // `mtc1 $t0, $f0` lists the general-register source first.
      "mtc1" => {
        match &self.rd {
          Some(rd) => write!(f, "mtc1 {}, {}", self.rs, rd),
          None     => write!(f, "mtc1 {}", self.rs),
        }
      }

      _ => {
        match (&self.rd, &self.rt) {
          (Some(rd), Some(rt)) => write!(f, "{} {}, {}, {}", self.operation, rd, self.rs, rt),
          (None,     Some(rt)) => write!(f, "{} {}, {}", self.operation, self.rs, rt),
          (Some(rd), None)     => write!(f, "{} {}, {}", self.operation, rd, self.rs),
          (None,     None)     => write!(f, "{} {}", self.operation, self.rs),
        }
      }

    }
  }
}

/**
  The hi/lo move family, `mfhi`/`mflo`/`mthi`/`mtlo`. The mnemonic encodes the
  direction: an `'f'` means the named special register is the source and
  `reg` the destination, otherwise the reverse. The special-register side is
  derived from the mnemonic suffix.
*/
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Move {
  pub operation : Mnemonic,
  pub reg       : RegName,
}

impl Move {
  pub fn new(operation: &str, reg: &str) -> Move {
    Move { operation: atom(operation), reg: atom(reg) }
  }

  fn suffix(&self) -> RegName {
    // "mfhi" -> "hi", "mtlo" -> "lo"
    atom(self.operation.as_ref().get(2..).unwrap_or(""))
  }

  /// Destination side: `reg` for move-from, the hi/lo suffix for move-to.
  pub fn rd(&self) -> RegName {
    match self.operation.contains('f') {
      true  => self.reg.clone(),
      false => self.suffix(),
    }
  }

  /// Source side, the mirror of `rd`.
  pub fn rs(&self) -> RegName {
    match self.operation.contains('f') {
      true  => self.suffix(),
      false => self.reg.clone(),
    }
  }
}

impl Display for Move {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.operation, self.reg)
  }
}

/// Two-register-plus-immediate instructions (`addi`, `ori`, `sll`, ...).
/// The immediate is absent for some specializations that reuse this shape.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct IType {
  pub operation : Mnemonic,
  pub rt        : RegName,
  pub rs        : RegName,
  pub imm       : Option<i32>,
}

impl IType {
  pub fn new(operation: &str, rt: &str, rs: &str, imm: i32) -> IType {
    IType {
      operation: atom(operation),
      rt: atom(rt),
      rs: atom(rs),
      imm: Some(imm),
    }
  }
}

/// Immediates of the bitwise immediate ops conventionally print in hex.
fn is_bitwise(operation: &str) -> bool {
  matches!(operation, "or" | "ori" | "and" | "andi" | "xor" | "xori")
}

impl Display for IType {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.imm {
      Some(imm) if is_bitwise(&self.operation) => {
        write!(f, "{} {}, {}, {:#x}", self.operation, self.rt, self.rs, imm)
      }
      Some(imm) => write!(f, "{} {}, {}, {}", self.operation, self.rt, self.rs, imm),
      None      => write!(f, "{} {}, {}", self.operation, self.rt, self.rs),
    }
  }
}

fn check_flag(flag: i64) -> Result<u8, ConstructionError> {
  match (0..=7).contains(&flag) {
    true  => Ok(flag as u8),
    false => Err(ConstructionError::InvalidArgument(flag)),
  }
}

/// Floating comparison (`c.eq.s`, `c.lt.d`, ...) writing condition flag
/// `flag`. Construction fails unless `0 <= flag <= 7`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Compare {
  pub operation : Mnemonic,
  pub rt        : RegName,
  pub rs        : RegName,
  pub flag      : u8,
}

impl Compare {
  pub fn new(operation: &str, rt: &str, rs: &str, flag: i64)
    -> Result<Compare, ConstructionError>
  {
    Ok(Compare {
      operation: atom(operation),
      rt: atom(rt),
      rs: atom(rs),
      flag: check_flag(flag)?,
    })
  }
}

impl Display for Compare {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.flag {
      0 => write!(f, "{} {}, {}", self.operation, self.rt, self.rs),
      n => write!(f, "{} {}, {}, {}", self.operation, n, self.rt, self.rs),
    }
  }
}

/// Format conversion (`cvt.s.w`, `cvt.w.d`, ...), `rs` converted into `rt`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Convert {
  pub operation : Mnemonic,
  pub rt        : RegName,
  pub rs        : RegName,
}

impl Convert {
  pub fn new(operation: &str, rt: &str, rs: &str) -> Convert {
    Convert { operation: atom(operation), rt: atom(rt), rs: atom(rs) }
  }
}

impl Display for Convert {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}, {}", self.operation, self.rt, self.rs)
  }
}

/// Conditional branch. The zero-compare family (mnemonic contains `'z'`)
/// tests `rs` alone and carries no `rt`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Branch {
  pub operation : Mnemonic,
  pub rs        : RegName,
  pub rt        : Option<RegName>,
  pub label     : Label,
}

impl Branch {
  pub fn new(operation: &str, rs: &str, rt: &str, label: Label) -> Branch {
    Branch {
      operation: atom(operation),
      rs: atom(rs),
      rt: Some(atom(rt)),
      label,
    }
  }

  pub fn zero(operation: &str, rs: &str, label: Label) -> Branch {
    Branch { operation: atom(operation), rs: atom(rs), rt: None, label }
  }
}

impl Display for Branch {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match &self.rt {
      Some(rt) => write!(f, "{} {}, {}, {}", self.operation, self.rs, rt, self.label),
      None     => write!(f, "{} {}, {}", self.operation, self.rs, self.label),
    }
  }
}

/// Branch on floating condition flag, `bc1t`/`bc1f`. Same flag validity
/// constraint as `Compare`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct BranchFloat {
  pub operation : Mnemonic,
  pub label     : Label,
  pub flag      : u8,
}

impl BranchFloat {
  pub fn new(operation: &str, label: Label, flag: i64)
    -> Result<BranchFloat, ConstructionError>
  {
    Ok(BranchFloat {
      operation: atom(operation),
      label,
      flag: check_flag(flag)?,
    })
  }
}

impl Display for BranchFloat {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.flag {
      0 => write!(f, "{} {}", self.operation, self.label),
      n => write!(f, "{} {}, {}", self.operation, n, self.label),
    }
  }
}

/// `li`/`lui`. The immediate always renders in hex.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LoadImm {
  pub operation : Mnemonic,
  pub reg       : RegName,
  pub imm       : i64,
}

impl LoadImm {
  pub fn new(operation: &str, reg: &str, imm: i64) -> LoadImm {
    LoadImm { operation: atom(operation), reg: atom(reg), imm }
  }
}

impl Display for LoadImm {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}, {:#x}", self.operation, self.reg, self.imm as i32 as u32)
  }
}

/// Memory access, both loads and stores: `reg, imm(addr)`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LoadMem {
  pub operation : Mnemonic,
  pub reg       : RegName,
  pub addr      : RegName,
  pub imm       : i32,
}

impl LoadMem {
  pub fn new(operation: &str, reg: &str, addr: &str, imm: i32) -> LoadMem {
    LoadMem {
      operation: atom(operation),
      reg: atom(reg),
      addr: atom(addr),
      imm,
    }
  }
}

impl Display for LoadMem {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}, {}({})", self.operation, self.reg, self.imm, self.addr)
  }
}

/// Conditional move on a condition flag, `movf`/`movt` and the `.s`/`.d`
/// forms. Structurally a register pair plus a validated flag, like `Compare`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MoveCond {
  pub operation : Mnemonic,
  pub rt        : RegName,
  pub rs        : RegName,
  pub flag      : u8,
}

impl MoveCond {
  pub fn new(operation: &str, rt: &str, rs: &str, flag: i64)
    -> Result<MoveCond, ConstructionError>
  {
    Ok(MoveCond {
      operation: atom(operation),
      rt: atom(rt),
      rs: atom(rs),
      flag: check_flag(flag)?,
    })
  }
}

impl Display for MoveCond {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}, {}, {}", self.operation, self.rt, self.rs, self.flag)
  }
}

/// Unconditional jump to a label, `j`/`jal`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct JType {
  pub operation : Mnemonic,
  pub label     : Label,
}

impl JType {
  pub fn new(operation: &str, label: Label) -> JType {
    JType { operation: atom(operation), label }
  }
}

impl Display for JType {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.operation, self.label)
  }
}

/// Expansion placeholder bundling the real instructions a pseudo-op expands
/// to. The assembler flattens these before execution; one reaching the engine
/// is a decode error.
#[derive(Clone, PartialEq, Debug)]
pub struct Pseudo {
  pub operation : Mnemonic,
  pub instrs    : Vec<Instruction>,
}

impl Pseudo {
  pub fn new(operation: &str, instrs: Vec<Instruction>) -> Pseudo {
    Pseudo { operation: atom(operation), instrs }
  }
}

impl Display for Pseudo {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:", self.operation)?;
    for instr in &self.instrs {
      write!(f, " {};", instr)?;
    }
    Ok(())
  }
}

// endregion

/// A decoded instruction.
#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
  /// Debugger trap; no register effects.
  Breakpoint { code: u32 },
  Nop,
  /// Semantics delegated to the execution environment.
  Syscall,
  RType(RType),
  /// Floating moves (`mov.s`, `mov.d`, `mfc1`, `mtc1`), sharing the RType
  /// shape.
  MoveFloat(RType),
  Move(Move),
  IType(IType),
  Compare(Compare),
  Convert(Convert),
  Branch(Branch),
  BranchFloat(BranchFloat),
  LoadImm(LoadImm),
  LoadMem(LoadMem),
  MoveCond(MoveCond),
  JType(JType),
  Pseudo(Pseudo),
}

impl Instruction {
  pub fn breakpoint() -> Instruction {
    Instruction::Breakpoint { code: 0 }
  }

  pub fn operation(&self) -> &str {
    match self {
      Instruction::Breakpoint { .. } => "break",
      Instruction::Nop               => "nop",
      Instruction::Syscall           => "syscall",
      Instruction::RType(i)          => &i.operation,
      Instruction::MoveFloat(i)      => &i.operation,
      Instruction::Move(i)           => &i.operation,
      Instruction::IType(i)          => &i.operation,
      Instruction::Compare(i)        => &i.operation,
      Instruction::Convert(i)        => &i.operation,
      Instruction::Branch(i)         => &i.operation,
      Instruction::BranchFloat(i)    => &i.operation,
      Instruction::LoadImm(i)        => &i.operation,
      Instruction::LoadMem(i)        => &i.operation,
      Instruction::MoveCond(i)       => &i.operation,
      Instruction::JType(i)          => &i.operation,
      Instruction::Pseudo(i)         => &i.operation,
    }
  }

  /**
    Destination register names (the target label name for branches and
    jumps). Pure and total: absent fields are skipped, never surfaced as
    placeholders.
  */
  pub fn get_dest(&self) -> Vec<RegName> {
    match self {

      | Instruction::Breakpoint { .. }
      | Instruction::Nop
      | Instruction::Syscall => vec![],

      | Instruction::RType(i)
      | Instruction::MoveFloat(i) => i.rd.iter().cloned().collect(),

      Instruction::Move(i)    => vec![i.rd()],
      Instruction::IType(i)   => vec![i.rt.clone()],
      Instruction::Compare(i) => vec![i.rt.clone()],
      Instruction::Convert(i) => vec![i.rt.clone()],

      Instruction::Branch(i)      => vec![i.label.name.clone()],
      Instruction::BranchFloat(i) => vec![i.label.name.clone()],
      Instruction::JType(i)       => vec![i.label.name.clone()],

      Instruction::LoadImm(i)  => vec![i.reg.clone()],
      Instruction::LoadMem(i)  => vec![i.reg.clone()],
      Instruction::MoveCond(i) => vec![i.rt.clone()],

      Instruction::Pseudo(i) => {
        i.instrs.iter().flat_map(|instr| instr.get_dest()).collect()
      }

    }
  }

  /// Source operands: register names and immediates, absent fields skipped.
  pub fn get_src(&self) -> Vec<Operand> {
    match self {

      | Instruction::Breakpoint { .. }
      | Instruction::Nop
      | Instruction::Syscall
      | Instruction::JType(_) => vec![],

      | Instruction::RType(i)
      | Instruction::MoveFloat(i) => {
        let mut src = vec![Operand::Reg(i.rs.clone())];
        if let Some(rt) = &i.rt {
          src.push(Operand::Reg(rt.clone()));
        }
        src
      }

      Instruction::Move(i) => vec![Operand::Reg(i.rs())],

      Instruction::IType(i) => {
        let mut src = vec![Operand::Reg(i.rs.clone())];
        if let Some(imm) = i.imm {
          src.push(Operand::Imm(imm as i64));
        }
        src
      }

      Instruction::Compare(i)  => vec![Operand::Reg(i.rs.clone())],
      Instruction::Convert(i)  => vec![Operand::Reg(i.rs.clone())],
      Instruction::MoveCond(i) => vec![Operand::Reg(i.rs.clone())],

      Instruction::Branch(i) => {
        // The zero-compare family tests `rs` alone.
        match (&i.rt, i.operation.contains('z')) {
          (Some(rt), false) => {
            vec![Operand::Reg(i.rs.clone()), Operand::Reg(rt.clone())]
          }
          _ => vec![Operand::Reg(i.rs.clone())],
        }
      }

      Instruction::BranchFloat(i) => vec![Operand::Imm(i.flag as i64)],

      Instruction::LoadImm(i) => vec![Operand::Imm(i.imm)],

      Instruction::LoadMem(i) => {
        vec![Operand::Reg(i.addr.clone()), Operand::Imm(i.imm as i64)]
      }

      Instruction::Pseudo(i) => {
        i.instrs.iter().flat_map(|instr| instr.get_src()).collect()
      }

    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Breakpoint { code } => {
        match code {
          0 => write!(f, "break"),
          n => write!(f, "break {}", n),
        }
      }

      Instruction::Nop     => write!(f, "nop"),
      Instruction::Syscall => write!(f, "syscall"),

      Instruction::RType(i)       => write!(f, "{}", i),
      Instruction::MoveFloat(i)   => write!(f, "{}", i),
      Instruction::Move(i)        => write!(f, "{}", i),
      Instruction::IType(i)       => write!(f, "{}", i),
      Instruction::Compare(i)     => write!(f, "{}", i),
      Instruction::Convert(i)     => write!(f, "{}", i),
      Instruction::Branch(i)      => write!(f, "{}", i),
      Instruction::BranchFloat(i) => write!(f, "{}", i),
      Instruction::LoadImm(i)     => write!(f, "{}", i),
      Instruction::LoadMem(i)     => write!(f, "{}", i),
      Instruction::MoveCond(i)    => write!(f, "{}", i),
      Instruction::JType(i)       => write!(f, "{}", i),
      Instruction::Pseudo(i)      => write!(f, "{}", i),

    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flag_validity_bounds() {
    for flag in -2i64..=9 {
      let valid = (0..=7).contains(&flag);
      assert_eq!(Compare::new("c.eq.s", "$f0", "$f1", flag).is_ok(), valid);
      assert_eq!(
        BranchFloat::new("bc1t", Label::new("out"), flag).is_ok(), valid
      );
      assert_eq!(MoveCond::new("movt", "$t0", "$t1", flag).is_ok(), valid);
    }
    assert_eq!(
      Compare::new("c.eq.s", "$f0", "$f1", 9),
      Err(ConstructionError::InvalidArgument(9))
    );
  }

  #[test]
  fn jr_and_jalr_display() {
    let jr = Instruction::RType(RType::jump("jr", None, "$ra"));
    assert_eq!(jr.to_string(), "jr $ra");

    let jalr = Instruction::RType(RType::jump("jalr", Some("$ra"), "$t0"));
    assert_eq!(jalr.to_string(), "jalr $t0");

    let jalr = Instruction::RType(RType::jump("jalr", Some("$t3"), "$t0"));
    assert_eq!(jalr.to_string(), "jalr $t3, $t0");
  }

  #[test]
  fn load_imm_displays_hex() {
    let li = Instruction::LoadImm(LoadImm::new("li", "$t0", 255));
    assert_eq!(li.to_string(), "li $t0, 0xff");

    let lui = Instruction::LoadImm(LoadImm::new("lui", "$t0", -1));
    assert_eq!(lui.to_string(), "lui $t0, 0xffffffff");
  }

  #[test]
  fn bitwise_immediates_display_hex() {
    let ori = Instruction::IType(IType::new("ori", "$t0", "$t1", 0xbeef));
    assert_eq!(ori.to_string(), "ori $t0, $t1, 0xbeef");

    let addi = Instruction::IType(IType::new("addi", "$t0", "$t1", 12));
    assert_eq!(addi.to_string(), "addi $t0, $t1, 12");
  }

  #[test]
  fn memory_and_branch_display() {
    let lw = Instruction::LoadMem(LoadMem::new("lw", "$t0", "$t1", 4));
    assert_eq!(lw.to_string(), "lw $t0, 4($t1)");

    let beq = Instruction::Branch(
      Branch::new("beq", "$t0", "$t1", Label::new("loop"))
    );
    assert_eq!(beq.to_string(), "beq $t0, $t1, loop");

    let bltz = Instruction::Branch(
      Branch::zero("bltz", "$t0", Label::new("done"))
    );
    assert_eq!(bltz.to_string(), "bltz $t0, done");
  }

  #[test]
  fn float_move_display() {
    let movs = Instruction::MoveFloat(RType::two("mov.s", "$f0", "$f2"));
    assert_eq!(movs.to_string(), "mov.s $f0, $f2");

    let mtc1 = Instruction::MoveFloat(RType::two("mtc1", "$f0", "$t0"));
    assert_eq!(mtc1.to_string(), "mtc1 $t0, $f0");
  }

  #[test]
  fn dest_and_src_are_total() {
    let jr = Instruction::RType(RType::jump("jr", None, "$ra"));
    assert!(jr.get_dest().is_empty());
    assert_eq!(jr.get_src(), vec![Operand::Reg(atom("$ra"))]);

    let jalr = Instruction::RType(RType::jump("jalr", Some("$ra"), "$t0"));
    assert_eq!(jalr.get_dest(), vec![atom("$ra")]);

    let mult = Instruction::RType(RType::two_source("mult", "$t0", "$t1"));
    assert!(mult.get_dest().is_empty());
    assert_eq!(mult.get_src().len(), 2);

    let bgez = Instruction::Branch(
      Branch::new("bgez", "$t0", "$zero", Label::new("loop"))
    );
    // Zero-compare branch: `rs` alone even with `rt` set.
    assert_eq!(bgez.get_src(), vec![Operand::Reg(atom("$t0"))]);
    assert_eq!(bgez.get_dest(), vec![atom("loop")]);

    let bc1t = Instruction::BranchFloat(
      BranchFloat::new("bc1t", Label::new("yes"), 3).unwrap()
    );
    assert_eq!(bc1t.get_src(), vec![Operand::Imm(3)]);
  }

  #[test]
  fn move_derives_hi_lo_side_from_mnemonic() {
    let mfhi = Move::new("mfhi", "$t0");
    assert_eq!(mfhi.rd().as_ref(), "$t0");
    assert_eq!(mfhi.rs().as_ref(), "hi");

    let mtlo = Move::new("mtlo", "$t4");
    assert_eq!(mtlo.rd().as_ref(), "lo");
    assert_eq!(mtlo.rs().as_ref(), "$t4");

    assert_eq!(Instruction::Move(mfhi).to_string(), "mfhi $t0");
  }

  #[test]
  fn move_accessors_tolerate_short_mnemonics() {
    let stub = Move::new("m", "$t0");
    assert_eq!(stub.rs().as_ref(), "$t0");
    assert_eq!(stub.rd().as_ref(), "");
    assert!(Instruction::Move(stub).get_dest().len() == 1);
  }

  #[test]
  fn pseudo_aggregates_children() {
    let expansion = Instruction::Pseudo(Pseudo::new("la", vec![
      Instruction::LoadImm(LoadImm::new("lui", "$at", 0x1000)),
      Instruction::IType(IType::new("ori", "$a0", "$at", 0)),
    ]));
    assert_eq!(expansion.get_dest(), vec![atom("$at"), atom("$a0")]);
  }
}
