//! Error taxonomy for the interpreter core. Construction-time validation and
//! run-time traps are separate types: the first is reported to the assembler,
//! the second to the host harness driving execution.

use thiserror::Error;

/// Rejected instruction construction. The only validation this core performs
/// at construction time is the floating condition-flag range check.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ConstructionError {
  #[error("invalid argument: condition flag {0} outside 0..=7")]
  InvalidArgument(i64),
}

/**
  A trap raised while executing one instruction. All variants propagate
  synchronously out of `Interpreter::execute_one`; none are retried
  internally, since
  trap disposition (halt, handler dispatch) is host policy.
*/
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ExecutionError {
  /// Overflow-checked arithmetic (`add`, `sub`, `addi`) overflowed.
  #[error("arithmetic overflow at pc {pc:#010x}")]
  ArithmeticOverflow { pc: u32 },

  /// A memory access fell outside the mapped range, or was misaligned for
  /// its width.
  #[error("address error at pc {pc:#010x}: bad access to {addr:#010x}")]
  AddressError { addr: u32, pc: u32 },

  /// An unexpanded pseudo-instruction, malformed operand, or unrecognized
  /// mnemonic reached the engine. A contract violation by the upstream
  /// assembler stage.
  #[error("decode error at pc {pc:#010x}: {what}")]
  DecodeError { what: String, pc: u32 },
}
