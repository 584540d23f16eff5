/*!

  The execution engine: a fetch-decode-execute-retire loop over the decoded
  instruction stream, applying one instruction at a time to the machine state
  and recording a reversible state-change log for step-back debugging.

  The loop is strictly in-order and stateless between instructions; there is
  no pipelining or speculation. Each retired instruction leaves one history
  frame holding the pc it executed at plus the pre-mutation snapshots of
  everything it overwrote. `undo_one` pops the newest frame and re-applies
  its entries in reverse, restoring the machine exactly.

  Instruction semantics follow MIPS32: checked arithmetic traps on overflow
  where the mnemonic demands it, bitwise immediates zero-extend, arithmetic
  immediates sign-extend, and `$zero` silently ignores writes.

*/

use std::str::FromStr;

use log::trace;
use smallvec::SmallVec;

use crate::change::{MemWidth, StateChange};
use crate::error::ExecutionError;
use crate::instruction::{
  Branch, BranchFloat, Compare, Convert, IType, Instruction, JType, LoadImm,
  LoadMem, Move, MoveCond, RType, RegName,
};
use crate::label::Label;
use crate::register::{Fpr, Gpr, Register};
use crate::state::{Machine, INSTRUCTION_SIZE, TEXT_BASE};
use crate::symboltable::SymbolTable;

/// The change list of one instruction. Most instructions log zero or one
/// entries; double-precision writes log two.
pub type ChangeList = SmallVec<[StateChange; 2]>;

/// One retired instruction: the pc it executed at and what it overwrote.
/// A frame exists even for instructions that log nothing (branches), since
/// undoing them must still restore the pc.
#[derive(Clone, Debug)]
pub struct Frame {
  pub pc      : u32,
  pub changes : ChangeList,
}

/// What one call to `execute_one` accomplished, as seen by the host.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum StepOutcome {
  /// An ordinary instruction retired.
  Retired,
  /// A `break` retired; control returns to the host debugger.
  Breakpoint { code: u32 },
  /// The syscall hook requested program exit.
  Exited,
  /// The pc ran past the last instruction.
  Finished,
}

/// Engine status. `Halted` is terminal: entered on exit, on running off the
/// end of the program, or on an unrecoverable error.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Status {
  Ready,
  Halted,
}

/// What the syscall hook asks the engine to do after it runs.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum SyscallAction {
  Continue,
  Exit,
}

/// The hook's report back to the engine: register values to inject (e.g.
/// console input into `$v0`) plus the follow-on action. The engine applies
/// and logs the writes itself, staying the only mutator of machine state.
pub struct SyscallResult {
  pub writes : Vec<(RegName, u32)>,
  pub action : SyscallAction,
}

impl SyscallResult {
  pub fn resume() -> SyscallResult {
    SyscallResult { writes: vec![], action: SyscallAction::Continue }
  }
}

/// Host environment callback invoked whenever a `syscall` retires. The
/// machine is read-only here; services decide what to do from `$v0` etc.
pub trait SyscallHandler {
  fn on_syscall(&mut self, machine: &Machine) -> SyscallResult;
}

/// Default hook: every syscall is a no-op.
pub struct NullSyscalls;

impl SyscallHandler for NullSyscalls {
  fn on_syscall(&mut self, _machine: &Machine) -> SyscallResult {
    SyscallResult::resume()
  }
}

/**
  A fully-expanded program: the linear instruction sequence indexed by
  address. The assembler guarantees no residual pseudo-instructions; one
  reaching execution is reported as a decode error, not expanded here.
*/
#[derive(Clone, Debug)]
pub struct Program {
  base   : u32,
  instrs : Vec<Instruction>,
}

impl Program {
  pub fn new(instrs: Vec<Instruction>) -> Program {
    Program { base: TEXT_BASE, instrs }
  }

  pub fn with_base(base: u32, instrs: Vec<Instruction>) -> Program {
    Program { base, instrs }
  }

  pub fn base(&self) -> u32 {
    self.base
  }

  /// Address one past the last instruction.
  pub fn end(&self) -> u32 {
    self.base + self.instrs.len() as u32 * INSTRUCTION_SIZE
  }

  /// The instruction at `pc`, or `None` if `pc` does not address one.
  pub fn fetch(&self, pc: u32) -> Option<&Instruction> {
    if pc < self.base || pc % INSTRUCTION_SIZE != 0 {
      return None;
    }
    self.instrs.get(((pc - self.base) / INSTRUCTION_SIZE) as usize)
  }

  /// The address of the instruction at `index`, for building symbol tables.
  pub fn address_of(&self, index: usize) -> u32 {
    self.base + index as u32 * INSTRUCTION_SIZE
  }
}

fn decode_err(what: impl Into<String>, pc: u32) -> ExecutionError {
  ExecutionError::DecodeError { what: what.into(), pc }
}

fn resolve_gpr(name: &str, pc: u32) -> Result<Gpr, ExecutionError> {
  Gpr::from_str(name)
      .map_err(|_| decode_err(format!("not a general register: {}", name), pc))
}

fn resolve_fpr(name: &str, pc: u32) -> Result<Fpr, ExecutionError> {
  Fpr::from_str(name)
      .map_err(|_| decode_err(format!("not a floating register: {}", name), pc))
}

/// An even register anchoring a double-precision pair.
fn resolve_fpr_even(name: &str, pc: u32) -> Result<Fpr, ExecutionError> {
  let reg = resolve_fpr(name, pc)?;
  match reg.is_even() {
    true  => Ok(reg),
    false => Err(decode_err(format!("odd register {} in double context", name), pc)),
  }
}

/// The interpreter: machine state, program, resolved symbols, the undo
/// history, and the host's syscall hook.
pub struct Interpreter {
  program  : Program,
  symbols  : SymbolTable,
  machine  : Machine,
  history  : Vec<Frame>,
  status   : Status,
  syscalls : Box<dyn SyscallHandler>,
}

impl Interpreter {
  pub fn new(program: Program, symbols: SymbolTable, machine: Machine) -> Interpreter {
    let mut machine = machine;
    machine.pc = program.base();
    Interpreter {
      program,
      symbols,
      machine,
      history  : vec![],
      status   : Status::Ready,
      syscalls : Box::new(NullSyscalls),
    }
  }

  pub fn with_syscalls(mut self, hook: Box<dyn SyscallHandler>) -> Interpreter {
    self.syscalls = hook;
    self
  }

  // region Host-facing surface

  /// Read-only view of the machine for display purposes.
  pub fn machine(&self) -> &Machine {
    &self.machine
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  /// The retired-instruction history, oldest first.
  pub fn history(&self) -> &[Frame] {
    &self.history
  }

  /**
    Advances exactly one instruction: fetch at the pc, decode by variant,
    execute the family semantics while logging pre-mutation snapshots, then
    retire by committing the next pc and pushing the history frame.

    Errors halt the engine and propagate; trap disposition is the host's
    decision.
  */
  pub fn execute_one(&mut self) -> Result<StepOutcome, ExecutionError> {
    if self.status == Status::Halted {
      return Ok(StepOutcome::Finished);
    }

    // FETCH
    let pc = self.machine.pc;
    let instr = match self.program.fetch(pc) {
      Some(instr) => instr.clone(),
      None if pc == self.program.end() => {
        self.status = Status::Halted;
        return Ok(StepOutcome::Finished);
      }
      None => {
        self.status = Status::Halted;
        return Err(ExecutionError::AddressError { addr: pc, pc });
      }
    };
    trace!("[{:#010x}] {}", pc, instr);

    // DECODE + EXECUTE
    let mut changes = ChangeList::new();
    let executed = self.execute_instruction(&instr, pc, &mut changes);
    let (outcome, next_pc) = match executed {
      Ok(result) => result,
      Err(error) => {
        // An instruction may have committed part of its effects before the
        // trap (the first half of a double-word store, say). Roll those back
        // so a trap never leaves mutations the history cannot account for.
        self.apply_reverse(&changes);
        self.status = Status::Halted;
        return Err(error);
      }
    };

    // RETIRE
    self.machine.pc = next_pc.unwrap_or(pc + INSTRUCTION_SIZE);
    self.history.push(Frame { pc, changes });
    if outcome == StepOutcome::Exited {
      self.status = Status::Halted;
    }
    #[cfg(feature = "trace_execution")] println!("{}", self.machine);
    Ok(outcome)
  }

  /**
    Reverses exactly one instruction by re-applying the most recent frame's
    entries newest-first, then restoring that frame's pc. Returns the pc now
    current, or `None` when there is no history left. Undoing also leaves
    `Halted` status behind.
  */
  pub fn undo_one(&mut self) -> Option<u32> {
    let frame = self.history.pop()?;
    self.apply_reverse(&frame.changes);
    self.machine.pc = frame.pc;
    self.status = Status::Ready;
    Some(frame.pc)
  }

  /// Re-applies logged entries newest-first, restoring the machine to its
  /// state before they were recorded.
  fn apply_reverse(&mut self, changes: &[StateChange]) {
    for change in changes.iter().rev() {
      match change {

        StateChange::Reg { reg, val, .. } => {
          match Register::from_str(reg) {
            Ok(Register::Gpr(gpr)) => self.machine.set_gpr(gpr, *val),
            Ok(Register::Fpr(fpr)) => self.machine.set_fpr(fpr, *val),
            Err(_) => unreachable!("logged register has an unknown name: {}", reg),
          }
        }

        StateChange::Mem { addr, val, width, pc } => {
          // The forward write succeeded at this address and width, so the
          // reverse write cannot fail.
          self.machine
              .memory
              .write(*addr, *val, *width, *pc)
              .unwrap_or_else(|_| {
                unreachable!("logged memory change no longer applies")
              });
        }

        StateChange::Flag { flag, value, .. } => {
          self.machine.set_flag(*flag, *value);
        }

        StateChange::M { hi, lo, .. } => {
          self.machine.hi = *hi;
          self.machine.lo = *lo;
        }

      }
    }
  }

  /// Runs until exit, breakpoint, end of program, or error.
  pub fn run(&mut self) -> Result<StepOutcome, ExecutionError> {
    loop {
      match self.execute_one()? {
        StepOutcome::Retired => continue,
        outcome              => return Ok(outcome),
      }
    }
  }

  // endregion

  // region Logged writes

  /// Writes a general register, logging the prior value. `$zero` writes are
  /// dropped entirely and leave no log entry.
  fn write_gpr(&mut self, changes: &mut ChangeList, pc: u32, reg: Gpr, value: u32) {
    if reg == Gpr::Zero {
      return;
    }
    changes.push(StateChange::reg(RegName::from(reg.name()), self.machine.gpr(reg), pc));
    self.machine.set_gpr(reg, value);
  }

  fn write_fpr(&mut self, changes: &mut ChangeList, pc: u32, reg: Fpr, value: u32) {
    changes.push(StateChange::reg(RegName::from(reg.name()), self.machine.fpr(reg), pc));
    self.machine.set_fpr(reg, value);
  }

  /// A double-precision write: two entries, one per 32-bit half, both marked
  /// `is_double`.
  fn write_fpr_double(&mut self, changes: &mut ChangeList, pc: u32, even: Fpr, value: f64) {
    let odd = even.pair().unwrap_or(even);
    let bits = value.to_bits();
    changes.push(StateChange::reg_double(
      RegName::from(even.name()), self.machine.fpr(even), pc
    ));
    changes.push(StateChange::reg_double(
      RegName::from(odd.name()), self.machine.fpr(odd), pc
    ));
    self.machine.set_fpr(even, bits as u32);
    self.machine.set_fpr(odd, (bits >> 32) as u32);
  }

  /// Writes hi and lo jointly, logged as one entry.
  fn write_hi_lo(&mut self, changes: &mut ChangeList, pc: u32, hi: u32, lo: u32) {
    changes.push(StateChange::m(self.machine.hi, self.machine.lo, pc));
    self.machine.hi = hi;
    self.machine.lo = lo;
  }

  fn write_mem(
    &mut self,
    changes: &mut ChangeList,
    pc: u32,
    addr: u32,
    value: u32,
    width: MemWidth,
  ) -> Result<(), ExecutionError> {
    let prior = self.machine.memory.read(addr, width, pc)?;
    changes.push(StateChange::mem(addr, prior, width, pc));
    self.machine.memory.write(addr, value, width, pc)
  }

  // endregion

  // region Per-family semantics

  /// Decode dispatch: selects family semantics by variant and mnemonic.
  /// Returns the step outcome plus a pc override for control transfers.
  fn execute_instruction(
    &mut self,
    instr: &Instruction,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(StepOutcome, Option<u32>), ExecutionError> {
    match instr {

      Instruction::Nop => Ok((StepOutcome::Retired, None)),

      Instruction::Breakpoint { code } => {
        // Trap to the debugger; no register or memory effects.
        Ok((StepOutcome::Breakpoint { code: *code }, None))
      }

      Instruction::Syscall => {
        let result = self.syscalls.on_syscall(&self.machine);
        for (name, value) in result.writes {
          match Register::from_str(&name) {
            Ok(Register::Gpr(gpr)) => self.write_gpr(changes, pc, gpr, value),
            Ok(Register::Fpr(fpr)) => self.write_fpr(changes, pc, fpr, value),
            Err(_) => {
              return Err(decode_err(
                format!("syscall hook wrote unknown register: {}", name), pc
              ));
            }
          }
        }
        match result.action {
          SyscallAction::Continue => Ok((StepOutcome::Retired, None)),
          SyscallAction::Exit     => Ok((StepOutcome::Exited, None)),
        }
      }

      Instruction::RType(i)       => self.exec_rtype(i, pc, changes),
      Instruction::MoveFloat(i)   => {
        self.exec_move_float(i, pc, changes)?;
        Ok((StepOutcome::Retired, None))
      }
      Instruction::Move(i)        => {
        self.exec_move(i, pc, changes)?;
        Ok((StepOutcome::Retired, None))
      }
      Instruction::IType(i)       => {
        self.exec_itype(i, pc, changes)?;
        Ok((StepOutcome::Retired, None))
      }
      Instruction::Compare(i)     => {
        self.exec_compare(i, pc, changes)?;
        Ok((StepOutcome::Retired, None))
      }
      Instruction::Convert(i)     => {
        self.exec_convert(i, pc, changes)?;
        Ok((StepOutcome::Retired, None))
      }
      Instruction::Branch(i)      => {
        Ok((StepOutcome::Retired, self.exec_branch(i, pc)?))
      }
      Instruction::BranchFloat(i) => {
        Ok((StepOutcome::Retired, self.exec_branch_float(i, pc)?))
      }
      Instruction::LoadImm(i)     => {
        self.exec_load_imm(i, pc, changes)?;
        Ok((StepOutcome::Retired, None))
      }
      Instruction::LoadMem(i)     => {
        self.exec_load_mem(i, pc, changes)?;
        Ok((StepOutcome::Retired, None))
      }
      Instruction::MoveCond(i)    => {
        self.exec_move_cond(i, pc, changes)?;
        Ok((StepOutcome::Retired, None))
      }
      Instruction::JType(i)       => self.exec_jtype(i, pc, changes),

      Instruction::Pseudo(i) => {
        // Expansion is the assembler's responsibility; by the time the
        // engine sees the stream, none of these may remain.
        Err(decode_err(
          format!("unexpanded pseudo-instruction: {}", i.operation), pc
        ))
      }

    }
  }

  fn resolve_label(&self, label: &Label, pc: u32) -> Result<u32, ExecutionError> {
    self.symbols
        .get_address(label)
        .ok_or_else(|| decode_err(format!("unresolved label: {}", label), pc))
  }

  fn exec_rtype(
    &mut self,
    i: &RType,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(StepOutcome, Option<u32>), ExecutionError> {
    let op = i.operation.as_ref();

    // Control transfers first: `rt` is never populated for these.
    if op == "jr" || op == "jalr" {
      let target = self.machine.gpr(resolve_gpr(&i.rs, pc)?);
      if op == "jalr" {
        let link = match &i.rd {
          Some(rd) => resolve_gpr(rd, pc)?,
          None     => Gpr::Ra,
        };
        self.write_gpr(changes, pc, link, pc + INSTRUCTION_SIZE);
      }
      return Ok((StepOutcome::Retired, Some(target)));
    }

    // Floating arithmetic shares the three-register shape.
    if op.ends_with(".s") || op.ends_with(".d") {
      self.exec_float_arith(i, pc, changes)?;
      return Ok((StepOutcome::Retired, None));
    }

    let rs = self.machine.gpr(resolve_gpr(&i.rs, pc)?);
    let rt = match &i.rt {
      Some(rt) => self.machine.gpr(resolve_gpr(rt, pc)?),
      None     => return Err(decode_err(format!("{} is missing rt", op), pc)),
    };

    // The two-source multiply/divide family writes hi/lo jointly.
    match op {
      "mult" => {
        let product = (rs as i32 as i64).wrapping_mul(rt as i32 as i64) as u64;
        self.write_hi_lo(changes, pc, (product >> 32) as u32, product as u32);
        return Ok((StepOutcome::Retired, None));
      }
      "multu" => {
        let product = (rs as u64).wrapping_mul(rt as u64);
        self.write_hi_lo(changes, pc, (product >> 32) as u32, product as u32);
        return Ok((StepOutcome::Retired, None));
      }
      "div" => {
        // Division by zero leaves hi/lo unpredictable in the ISA; this core
        // leaves them unchanged and logs nothing.
        if rt != 0 {
          let quotient  = (rs as i32).wrapping_div(rt as i32) as u32;
          let remainder = (rs as i32).wrapping_rem(rt as i32) as u32;
          self.write_hi_lo(changes, pc, remainder, quotient);
        }
        return Ok((StepOutcome::Retired, None));
      }
      "divu" => {
        if rt != 0 {
          self.write_hi_lo(changes, pc, rs % rt, rs / rt);
        }
        return Ok((StepOutcome::Retired, None));
      }
      _ => {}
    }

    let rd = match &i.rd {
      Some(rd) => resolve_gpr(rd, pc)?,
      None     => return Err(decode_err(format!("{} is missing rd", op), pc)),
    };

    let value = match op {
      "add" => (rs as i32)
        .checked_add(rt as i32)
        .ok_or(ExecutionError::ArithmeticOverflow { pc })? as u32,
      "sub" => (rs as i32)
        .checked_sub(rt as i32)
        .ok_or(ExecutionError::ArithmeticOverflow { pc })? as u32,
      "addu" => rs.wrapping_add(rt),
      "subu" => rs.wrapping_sub(rt),
      "mul"  => (rs as i32).wrapping_mul(rt as i32) as u32,
      "and"  => rs & rt,
      "or"   => rs | rt,
      "xor"  => rs ^ rt,
      "nor"  => !(rs | rt),
      "slt"  => ((rs as i32) < (rt as i32)) as u32,
      "sltu" => (rs < rt) as u32,
      // Variable shifts: first source is the value, second the amount.
      "sllv" => rs << (rt & 31),
      "srlv" => rs >> (rt & 31),
      "srav" => ((rs as i32) >> (rt & 31)) as u32,
      _      => return Err(decode_err(format!("unknown r-type: {}", op), pc)),
    };
    self.write_gpr(changes, pc, rd, value);
    Ok((StepOutcome::Retired, None))
  }

  fn exec_float_arith(
    &mut self,
    i: &RType,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(), ExecutionError> {
    let op = i.operation.as_ref();
    let family = &op[..op.len() - 2];
    let rd = match &i.rd {
      Some(rd) => rd,
      None     => return Err(decode_err(format!("{} is missing rd", op), pc)),
    };
    let rt = match &i.rt {
      Some(rt) => rt,
      None     => return Err(decode_err(format!("{} is missing rt", op), pc)),
    };

    if op.ends_with(".s") {
      let a = self.machine.fpr_single(resolve_fpr(&i.rs, pc)?);
      let b = self.machine.fpr_single(resolve_fpr(rt, pc)?);
      let value = match family {
        "add" => a + b,
        "sub" => a - b,
        "mul" => a * b,
        "div" => a / b,
        _     => return Err(decode_err(format!("unknown float op: {}", op), pc)),
      };
      let dest = resolve_fpr(rd, pc)?;
      self.write_fpr(changes, pc, dest, value.to_bits());
    } else {
      let a = self.machine.fpr_double(resolve_fpr_even(&i.rs, pc)?);
      let b = self.machine.fpr_double(resolve_fpr_even(rt, pc)?);
      let value = match family {
        "add" => a + b,
        "sub" => a - b,
        "mul" => a * b,
        "div" => a / b,
        _     => return Err(decode_err(format!("unknown float op: {}", op), pc)),
      };
      let dest = resolve_fpr_even(rd, pc)?;
      self.write_fpr_double(changes, pc, dest, value);
    }
    Ok(())
  }

  /// `mov.s`/`mov.d` between floating registers, `mfc1`/`mtc1` across the
  /// register files.
  fn exec_move_float(
    &mut self,
    i: &RType,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(), ExecutionError> {
    let op = i.operation.as_ref();
    let rd = match &i.rd {
      Some(rd) => rd,
      None     => return Err(decode_err(format!("{} is missing rd", op), pc)),
    };
    match op {

      "mov.s" => {
        let value = self.machine.fpr(resolve_fpr(&i.rs, pc)?);
        let dest = resolve_fpr(rd, pc)?;
        self.write_fpr(changes, pc, dest, value);
      }

      "mov.d" => {
        let value = self.machine.fpr_double(resolve_fpr_even(&i.rs, pc)?);
        let dest = resolve_fpr_even(rd, pc)?;
        self.write_fpr_double(changes, pc, dest, value);
      }

      "mfc1" => {
        let value = self.machine.fpr(resolve_fpr(&i.rs, pc)?);
        let dest = resolve_gpr(rd, pc)?;
        self.write_gpr(changes, pc, dest, value);
      }

      "mtc1" => {
        let value = self.machine.gpr(resolve_gpr(&i.rs, pc)?);
        let dest = resolve_fpr(rd, pc)?;
        self.write_fpr(changes, pc, dest, value);
      }

      _ => return Err(decode_err(format!("unknown float move: {}", op), pc)),
    }
    Ok(())
  }

  /// The hi/lo move family. Moves into hi or lo log an `MChange` like the
  /// multiply/divide family; moves out log an ordinary register change.
  fn exec_move(
    &mut self,
    i: &Move,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(), ExecutionError> {
    let reg = resolve_gpr(&i.reg, pc)?;
    match i.operation.as_ref() {
      "mfhi" => {
        let value = self.machine.hi;
        self.write_gpr(changes, pc, reg, value);
      }
      "mflo" => {
        let value = self.machine.lo;
        self.write_gpr(changes, pc, reg, value);
      }
      "mthi" => {
        let lo = self.machine.lo;
        let value = self.machine.gpr(reg);
        self.write_hi_lo(changes, pc, value, lo);
      }
      "mtlo" => {
        let hi = self.machine.hi;
        let value = self.machine.gpr(reg);
        self.write_hi_lo(changes, pc, hi, value);
      }
      op => return Err(decode_err(format!("unknown hi/lo move: {}", op), pc)),
    }
    Ok(())
  }

  fn exec_itype(
    &mut self,
    i: &IType,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(), ExecutionError> {
    let op = i.operation.as_ref();
    let rt = resolve_gpr(&i.rt, pc)?;
    let rs = self.machine.gpr(resolve_gpr(&i.rs, pc)?);
    let imm = match i.imm {
      Some(imm) => imm,
      None      => return Err(decode_err(format!("{} is missing immediate", op), pc)),
    };

    let value = match op {
      "addi" => (rs as i32)
        .checked_add(imm)
        .ok_or(ExecutionError::ArithmeticOverflow { pc })? as u32,
      "addiu" => rs.wrapping_add(imm as u32),
      // Bitwise immediates zero-extend from 16 bits.
      "andi"  => rs & (imm as u16 as u32),
      "ori"   => rs | (imm as u16 as u32),
      "xori"  => rs ^ (imm as u16 as u32),
      "slti"  => ((rs as i32) < imm) as u32,
      // Immediate sign-extends, comparison is unsigned (MIPS32 rule).
      "sltiu" => (rs < imm as u32) as u32,
      "sll"   => rs << (imm as u32 & 31),
      "srl"   => rs >> (imm as u32 & 31),
      "sra"   => ((rs as i32) >> (imm as u32 & 31)) as u32,
      _       => return Err(decode_err(format!("unknown i-type: {}", op), pc)),
    };
    self.write_gpr(changes, pc, rt, value);
    Ok(())
  }

  /// `c.{eq|lt|le}.{s|d}`: compare and write the condition flag.
  fn exec_compare(
    &mut self,
    i: &Compare,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(), ExecutionError> {
    let op = i.operation.as_ref();
    let pieces: Vec<&str> = op.split('.').collect();
    let (cond, fmt) = match pieces.as_slice() {
      ["c", cond, fmt] => (*cond, *fmt),
      _ => return Err(decode_err(format!("unknown comparison: {}", op), pc)),
    };

    // NaN compares false in every ordered relation.
    let result = match fmt {
      "s" => {
        let a = self.machine.fpr_single(resolve_fpr(&i.rt, pc)?);
        let b = self.machine.fpr_single(resolve_fpr(&i.rs, pc)?);
        match cond {
          "eq" => a == b,
          "lt" => a < b,
          "le" => a <= b,
          _    => return Err(decode_err(format!("unknown comparison: {}", op), pc)),
        }
      }
      "d" => {
        let a = self.machine.fpr_double(resolve_fpr_even(&i.rt, pc)?);
        let b = self.machine.fpr_double(resolve_fpr_even(&i.rs, pc)?);
        match cond {
          "eq" => a == b,
          "lt" => a < b,
          "le" => a <= b,
          _    => return Err(decode_err(format!("unknown comparison: {}", op), pc)),
        }
      }
      _ => return Err(decode_err(format!("unknown comparison: {}", op), pc)),
    };

    changes.push(StateChange::flag(i.flag, self.machine.flag(i.flag), pc));
    self.machine.set_flag(i.flag, result);
    Ok(())
  }

  /// `cvt.X.Y rt, rs`: reinterpret the `Y`-format value in `rs` as format
  /// `X` into `rt`. Formats are `s`, `d`, and `w` (integer word).
  fn exec_convert(
    &mut self,
    i: &Convert,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(), ExecutionError> {
    let op = i.operation.as_ref();
    let pieces: Vec<&str> = op.split('.').collect();
    let (to, from) = match pieces.as_slice() {
      ["cvt", to, from] => (*to, *from),
      _ => return Err(decode_err(format!("unknown conversion: {}", op), pc)),
    };

    let source: f64 = match from {
      "s" => self.machine.fpr_single(resolve_fpr(&i.rs, pc)?) as f64,
      "d" => self.machine.fpr_double(resolve_fpr_even(&i.rs, pc)?),
      "w" => self.machine.fpr(resolve_fpr(&i.rs, pc)?) as i32 as f64,
      _   => return Err(decode_err(format!("unknown conversion: {}", op), pc)),
    };

    match to {
      "s" => {
        let dest = resolve_fpr(&i.rt, pc)?;
        self.write_fpr(changes, pc, dest, (source as f32).to_bits());
      }
      "d" => {
        let dest = resolve_fpr_even(&i.rt, pc)?;
        self.write_fpr_double(changes, pc, dest, source);
      }
      "w" => {
        // Round to nearest; `trunc.w.*` would truncate instead.
        let dest = resolve_fpr(&i.rt, pc)?;
        self.write_fpr(changes, pc, dest, source.round() as i32 as u32);
      }
      _ => return Err(decode_err(format!("unknown conversion: {}", op), pc)),
    }
    Ok(())
  }

  /// Conditional branches. Taken or not, branches log nothing; the pc
  /// change is implicit in the history frame.
  fn exec_branch(&self, i: &Branch, pc: u32) -> Result<Option<u32>, ExecutionError> {
    let op = i.operation.as_ref();
    let rs = self.machine.gpr(resolve_gpr(&i.rs, pc)?) as i32;

    let taken = if op.contains('z') {
      match op {
        "bltz" => rs < 0,
        "blez" => rs <= 0,
        "bgtz" => rs > 0,
        "bgez" => rs >= 0,
        _      => return Err(decode_err(format!("unknown branch: {}", op), pc)),
      }
    } else {
      let rt = match &i.rt {
        Some(rt) => self.machine.gpr(resolve_gpr(rt, pc)?) as i32,
        None     => return Err(decode_err(format!("{} is missing rt", op), pc)),
      };
      match op {
        "beq" => rs == rt,
        "bne" => rs != rt,
        _     => return Err(decode_err(format!("unknown branch: {}", op), pc)),
      }
    };

    match taken {
      true  => Ok(Some(self.resolve_label(&i.label, pc)?)),
      false => Ok(None),
    }
  }

  fn exec_branch_float(&self, i: &BranchFloat, pc: u32)
    -> Result<Option<u32>, ExecutionError>
  {
    let wants = match i.operation.as_ref() {
      "bc1t" => true,
      "bc1f" => false,
      op     => return Err(decode_err(format!("unknown float branch: {}", op), pc)),
    };
    match self.machine.flag(i.flag) == wants {
      true  => Ok(Some(self.resolve_label(&i.label, pc)?)),
      false => Ok(None),
    }
  }

  fn exec_load_imm(
    &mut self,
    i: &LoadImm,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(), ExecutionError> {
    let reg = resolve_gpr(&i.reg, pc)?;
    let value = match i.operation.as_ref() {
      "li"  => i.imm as u32,
      "lui" => (i.imm as u32) << 16,
      op    => return Err(decode_err(format!("unknown load immediate: {}", op), pc)),
    };
    self.write_gpr(changes, pc, reg, value);
    Ok(())
  }

  /// Loads and stores. The effective address is `addr-register + imm`;
  /// loads log the prior destination register, stores log the prior memory
  /// bytes at matching width.
  fn exec_load_mem(
    &mut self,
    i: &LoadMem,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(), ExecutionError> {
    let op = i.operation.as_ref();
    let base = self.machine.gpr(resolve_gpr(&i.addr, pc)?);
    let addr = base.wrapping_add(i.imm as u32);

    match op {

      "lw" => {
        let value = self.machine.memory.read(addr, MemWidth::Word, pc)?;
        let reg = resolve_gpr(&i.reg, pc)?;
        self.write_gpr(changes, pc, reg, value);
      }
      "lh" => {
        let value = self.machine.memory.read(addr, MemWidth::Half, pc)?;
        let reg = resolve_gpr(&i.reg, pc)?;
        self.write_gpr(changes, pc, reg, value as u16 as i16 as i32 as u32);
      }
      "lhu" => {
        let value = self.machine.memory.read(addr, MemWidth::Half, pc)?;
        let reg = resolve_gpr(&i.reg, pc)?;
        self.write_gpr(changes, pc, reg, value);
      }
      "lb" => {
        let value = self.machine.memory.read(addr, MemWidth::Byte, pc)?;
        let reg = resolve_gpr(&i.reg, pc)?;
        self.write_gpr(changes, pc, reg, value as u8 as i8 as i32 as u32);
      }
      "lbu" => {
        let value = self.machine.memory.read(addr, MemWidth::Byte, pc)?;
        let reg = resolve_gpr(&i.reg, pc)?;
        self.write_gpr(changes, pc, reg, value);
      }

      "sw" => {
        let value = self.machine.gpr(resolve_gpr(&i.reg, pc)?);
        self.write_mem(changes, pc, addr, value, MemWidth::Word)?;
      }
      "sh" => {
        let value = self.machine.gpr(resolve_gpr(&i.reg, pc)?);
        self.write_mem(changes, pc, addr, value & 0xFFFF, MemWidth::Half)?;
      }
      "sb" => {
        let value = self.machine.gpr(resolve_gpr(&i.reg, pc)?);
        self.write_mem(changes, pc, addr, value & 0xFF, MemWidth::Byte)?;
      }

      "lwc1" => {
        let value = self.machine.memory.read(addr, MemWidth::Word, pc)?;
        let reg = resolve_fpr(&i.reg, pc)?;
        self.write_fpr(changes, pc, reg, value);
      }
      "swc1" => {
        let value = self.machine.fpr(resolve_fpr(&i.reg, pc)?);
        self.write_mem(changes, pc, addr, value, MemWidth::Word)?;
      }
      "ldc1" => {
        let low  = self.machine.memory.read(addr, MemWidth::Word, pc)?;
        let high = self
          .machine
          .memory
          .read(addr.wrapping_add(4), MemWidth::Word, pc)?;
        let even = resolve_fpr_even(&i.reg, pc)?;
        let bits = ((high as u64) << 32) | low as u64;
        self.write_fpr_double(changes, pc, even, f64::from_bits(bits));
      }
      "sdc1" => {
        let even = resolve_fpr_even(&i.reg, pc)?;
        let odd = even.pair().unwrap_or(even);
        let low = self.machine.fpr(even);
        let high = self.machine.fpr(odd);
        self.write_mem(changes, pc, addr, low, MemWidth::Word)?;
        self.write_mem(changes, pc, addr.wrapping_add(4), high, MemWidth::Word)?;
      }

      _ => return Err(decode_err(format!("unknown memory access: {}", op), pc)),
    }
    Ok(())
  }

  /// `movt`/`movf` and their floating forms: copy only when the condition
  /// flag matches the requested truth value.
  fn exec_move_cond(
    &mut self,
    i: &MoveCond,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(), ExecutionError> {
    let op = i.operation.as_ref();
    let wants = if op.starts_with("movt") {
      true
    } else if op.starts_with("movf") {
      false
    } else {
      return Err(decode_err(format!("unknown conditional move: {}", op), pc));
    };

    if self.machine.flag(i.flag) != wants {
      return Ok(());
    }

    if op.ends_with(".d") {
      let value = self.machine.fpr_double(resolve_fpr_even(&i.rs, pc)?);
      let dest = resolve_fpr_even(&i.rt, pc)?;
      self.write_fpr_double(changes, pc, dest, value);
    } else if op.ends_with(".s") {
      let value = self.machine.fpr(resolve_fpr(&i.rs, pc)?);
      let dest = resolve_fpr(&i.rt, pc)?;
      self.write_fpr(changes, pc, dest, value);
    } else {
      let value = self.machine.gpr(resolve_gpr(&i.rs, pc)?);
      let dest = resolve_gpr(&i.rt, pc)?;
      self.write_gpr(changes, pc, dest, value);
    }
    Ok(())
  }

  fn exec_jtype(
    &mut self,
    i: &JType,
    pc: u32,
    changes: &mut ChangeList,
  ) -> Result<(StepOutcome, Option<u32>), ExecutionError> {
    let target = self.resolve_label(&i.label, pc)?;
    match i.operation.as_ref() {
      "j"   => Ok((StepOutcome::Retired, Some(target))),
      "jal" => {
        self.write_gpr(changes, pc, Gpr::Ra, pc + INSTRUCTION_SIZE);
        Ok((StepOutcome::Retired, Some(target)))
      }
      op => Err(decode_err(format!("unknown jump: {}", op), pc)),
    }
  }

  // endregion
}
