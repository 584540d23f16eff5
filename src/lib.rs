/*!

  The core of a MIPS32 assembly interpreter: the decoded-instruction model,
  the machine state, and an execution engine with a reversible state-change
  log for step-back debugging.

  This crate is the middle of a larger toolchain. The assembler front end
  (tokenizing, label resolution, pseudo-instruction expansion) sits upstream
  and hands over a fully-expanded `Program` plus a resolved `SymbolTable`;
  the host harness sits downstream, driving `Interpreter::execute_one` /
  `undo_one` and servicing syscalls through the `SyscallHandler` hook.

*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;
extern crate strum;
#[macro_use] extern crate strum_macros;

mod change;
mod engine;
mod error;
mod instruction;
mod label;
mod register;
mod state;
mod symboltable;

pub use change::{MemWidth, StateChange};
pub use engine::{
  ChangeList, Frame, Interpreter, NullSyscalls, Program, Status, StepOutcome,
  SyscallAction, SyscallHandler, SyscallResult,
};
pub use error::{ConstructionError, ExecutionError};
pub use instruction::{
  Branch, BranchFloat, Compare, Convert, IType, Instruction, JType, LoadImm,
  LoadMem, Move, MoveCond, Operand, Pseudo, RType, RegName,
};
pub use label::{DeclData, Declaration, Label};
pub use register::{Fpr, Gpr, Register};
pub use state::{Machine, Memory, DATA_BASE, INSTRUCTION_SIZE, TEXT_BASE};
pub use symboltable::SymbolTable;
