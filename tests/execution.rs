//! End-to-end tests of the execution engine: per-family semantics, the
//! reversible change log, and the host-facing surface.

use mipsim::{
  Branch, BranchFloat, Compare, DeclData, Declaration, ExecutionError, Fpr,
  Gpr, IType, Instruction, Interpreter, JType, Label, LoadImm, LoadMem,
  Machine, MemWidth, Move, MoveCond, Program, Pseudo, RType, RegName,
  StateChange, StepOutcome, SyscallAction, SyscallHandler, SyscallResult,
  SymbolTable, DATA_BASE, TEXT_BASE,
};

fn machine() -> Machine {
  Machine::new(DATA_BASE, 1024)
}

fn interp(instrs: Vec<Instruction>, machine: Machine) -> Interpreter {
  Interpreter::new(Program::new(instrs), SymbolTable::new(), machine)
}

fn interp_with_symbols(
  instrs: Vec<Instruction>,
  machine: Machine,
  symbols: &[(&str, u32)],
) -> Interpreter {
  let mut table = SymbolTable::new();
  for (name, address) in symbols {
    table.insert(Label::new(name), *address).unwrap();
  }
  Interpreter::new(Program::new(instrs), table, machine)
}

#[test]
fn add_writes_dest_and_logs_prior_value() {
  let mut m = machine();
  m.set_gpr(Gpr::T0, 99);
  m.set_gpr(Gpr::T1, 5);
  m.set_gpr(Gpr::T2, 7);
  let mut vm = interp(
    vec![Instruction::RType(RType::three("add", "$t0", "$t1", "$t2"))],
    m,
  );

  assert_eq!(vm.execute_one().unwrap(), StepOutcome::Retired);
  assert_eq!(vm.machine().gpr(Gpr::T0), 12);
  assert_eq!(vm.machine().pc, TEXT_BASE + 4);

  let frame = vm.history().last().unwrap();
  assert_eq!(frame.changes.len(), 1);
  assert_eq!(
    frame.changes[0],
    StateChange::Reg {
      reg: RegName::from("$t0"),
      val: 99,
      pc: TEXT_BASE,
      is_double: false,
    }
  );
}

#[test]
fn branch_taken_and_fall_through_log_nothing() {
  let beq = Instruction::Branch(Branch::new("beq", "$t0", "$t1", Label::new("loop")));

  let mut m = machine();
  m.set_gpr(Gpr::T0, 3);
  m.set_gpr(Gpr::T1, 3);
  let mut vm = interp_with_symbols(
    vec![beq.clone()], m, &[("loop", TEXT_BASE + 16)],
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().pc, TEXT_BASE + 16);
  assert!(vm.history().last().unwrap().changes.is_empty());

  let mut m = machine();
  m.set_gpr(Gpr::T0, 3);
  m.set_gpr(Gpr::T1, 4);
  let mut vm = interp_with_symbols(
    vec![beq], m, &[("loop", TEXT_BASE + 16)],
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().pc, TEXT_BASE + 4);
  assert!(vm.history().last().unwrap().changes.is_empty());
}

#[test]
fn load_word_reads_memory_and_logs_dest() {
  let mut m = machine();
  m.set_gpr(Gpr::T1, DATA_BASE);
  m.memory.write(DATA_BASE + 4, 42, MemWidth::Word, 0).unwrap();
  let mut vm = interp(
    vec![Instruction::LoadMem(LoadMem::new("lw", "$t0", "$t1", 4))],
    m,
  );

  vm.execute_one().unwrap();
  assert_eq!(vm.machine().gpr(Gpr::T0), 42);
  let frame = vm.history().last().unwrap();
  assert_eq!(
    frame.changes[0],
    StateChange::Reg {
      reg: RegName::from("$t0"), val: 0, pc: TEXT_BASE, is_double: false,
    }
  );
}

#[test]
fn compare_flag_range_is_enforced() {
  assert!(Compare::new("c.eq.s", "$f0", "$f1", 3).is_ok());
  assert!(Compare::new("c.eq.s", "$f0", "$f1", 9).is_err());
}

#[test]
fn undo_round_trips_a_mixed_program() {
  // Registers, memory, flags, and hi/lo all restore exactly.
  let mut m = machine();
  m.set_gpr(Gpr::T1, DATA_BASE);
  m.set_gpr(Gpr::T2, 6);
  m.set_gpr(Gpr::T3, 7);
  m.set_fpr_single(Fpr::F0, 1.5);
  m.set_fpr_single(Fpr::F1, 1.5);
  let instrs = vec![
    Instruction::RType(RType::three("addu", "$t4", "$t2", "$t3")),
    Instruction::LoadMem(LoadMem::new("sw", "$t4", "$t1", 8)),
    Instruction::RType(RType::two_source("mult", "$t2", "$t3")),
    Instruction::Compare(Compare::new("c.eq.s", "$f0", "$f1", 2).unwrap()),
    Instruction::LoadImm(LoadImm::new("li", "$t4", 255)),
  ];
  let mut vm = interp(instrs, m);

  let before = vm.machine().clone();
  let mut snapshots = vec![];
  for _ in 0..5 {
    snapshots.push(vm.machine().clone());
    vm.execute_one().unwrap();
  }

  // Sanity: the forward pass actually changed things.
  assert_eq!(vm.machine().gpr(Gpr::T4), 255);
  assert_eq!(vm.machine().lo, 42);
  assert!(vm.machine().flag(2));
  assert_eq!(
    vm.machine().memory.read(DATA_BASE + 8, MemWidth::Word, 0).unwrap(),
    13
  );

  for expected in snapshots.iter().rev() {
    vm.undo_one().unwrap();
    assert_eq!(vm.machine(), expected);
  }
  assert_eq!(vm.machine(), &before);
  assert_eq!(vm.undo_one(), None);
}

#[test]
fn double_move_logs_two_paired_halves() {
  let mut m = machine();
  m.set_fpr_double(Fpr::F2, 2.718281828);
  let mut vm = interp(
    vec![Instruction::MoveFloat(RType::two("mov.d", "$f4", "$f2"))],
    m,
  );

  vm.execute_one().unwrap();
  assert_eq!(vm.machine().fpr_double(Fpr::F4), 2.718281828);

  let frame = vm.history().last().unwrap();
  assert_eq!(frame.changes.len(), 2);
  let halves: Vec<&RegName> = frame
    .changes
    .iter()
    .map(|change| match change {
      StateChange::Reg { reg, is_double: true, .. } => reg,
      other => panic!("expected a double register change, got {:?}", other),
    })
    .collect();
  assert_eq!(halves[0].as_ref(), "$f4");
  assert_eq!(halves[1].as_ref(), "$f5");
}

#[test]
fn jr_and_jalr_transfer_control() {
  // jr links nothing; jalr writes the link register first.
  let mut m = machine();
  m.set_gpr(Gpr::T0, TEXT_BASE + 12);
  let mut vm = interp(
    vec![Instruction::RType(RType::jump("jalr", Some("$ra"), "$t0"))],
    m,
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().pc, TEXT_BASE + 12);
  assert_eq!(vm.machine().gpr(Gpr::Ra), TEXT_BASE + 4);
  assert_eq!(vm.history().last().unwrap().changes.len(), 1);

  let mut m = machine();
  m.set_gpr(Gpr::Ra, TEXT_BASE + 4);
  let mut vm = interp(
    vec![
      Instruction::Nop,
      Instruction::RType(RType::jump("jr", None, "$ra")),
    ],
    m,
  );
  vm.execute_one().unwrap();
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().pc, TEXT_BASE + 4);
  assert!(vm.history().last().unwrap().changes.is_empty());
}

#[test]
fn jal_links_and_jumps() {
  let mut vm = interp_with_symbols(
    vec![Instruction::JType(JType::new("jal", Label::new("func")))],
    machine(),
    &[("func", TEXT_BASE + 64)],
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().pc, TEXT_BASE + 64);
  assert_eq!(vm.machine().gpr(Gpr::Ra), TEXT_BASE + 4);
}

#[test]
fn checked_arithmetic_traps_on_overflow() {
  let mut m = machine();
  m.set_gpr(Gpr::T1, i32::max_value() as u32);
  m.set_gpr(Gpr::T2, 1);
  let mut vm = interp(
    vec![Instruction::RType(RType::three("add", "$t0", "$t1", "$t2"))],
    m,
  );
  assert_eq!(
    vm.execute_one(),
    Err(ExecutionError::ArithmeticOverflow { pc: TEXT_BASE })
  );
  // The trap halts the engine; nothing was committed.
  assert_eq!(vm.machine().gpr(Gpr::T0), 0);
  assert!(vm.history().is_empty());

  // The unchecked form wraps silently.
  let mut m = machine();
  m.set_gpr(Gpr::T1, i32::max_value() as u32);
  m.set_gpr(Gpr::T2, 1);
  let mut vm = interp(
    vec![Instruction::RType(RType::three("addu", "$t0", "$t1", "$t2"))],
    m,
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().gpr(Gpr::T0), 0x8000_0000);
}

#[test]
fn unmapped_store_is_an_address_error() {
  let mut m = machine();
  m.set_gpr(Gpr::T1, 0x7fff_0000);
  let mut vm = interp(
    vec![Instruction::LoadMem(LoadMem::new("sw", "$t0", "$t1", 0))],
    m,
  );
  assert_eq!(
    vm.execute_one(),
    Err(ExecutionError::AddressError { addr: 0x7fff_0000, pc: TEXT_BASE })
  );
}

#[test]
fn load_at_top_of_address_space_is_an_address_error() {
  let mut m = machine();
  m.set_gpr(Gpr::T1, 0xffff_ffff);
  let mut vm = interp(
    vec![Instruction::LoadMem(LoadMem::new("lb", "$t0", "$t1", 0))],
    m,
  );
  assert_eq!(
    vm.execute_one(),
    Err(ExecutionError::AddressError { addr: 0xffff_ffff, pc: TEXT_BASE })
  );
}

#[test]
fn double_store_past_end_reverts_its_first_half() {
  let mut m = machine();
  m.set_fpr_double(Fpr::F2, 1.0);
  m.set_gpr(Gpr::T1, DATA_BASE + 1020);
  m.memory.write(DATA_BASE + 1020, 0x5555_5555, MemWidth::Word, 0).unwrap();
  let mut vm = interp(
    vec![Instruction::LoadMem(LoadMem::new("sdc1", "$f2", "$t1", 0))],
    m,
  );
  assert_eq!(
    vm.execute_one(),
    Err(ExecutionError::AddressError { addr: DATA_BASE + 1024, pc: TEXT_BASE })
  );
  // The first word of the pair went through before the trap; with no history
  // frame to undo it, the engine must roll it back itself.
  assert!(vm.history().is_empty());
  assert_eq!(
    vm.machine().memory.read(DATA_BASE + 1020, MemWidth::Word, 0).unwrap(),
    0x5555_5555
  );
}

#[test]
fn double_load_pair_cannot_wrap_the_address_space() {
  let mut m = Machine::new(0xffff_fff8, 8);
  m.set_gpr(Gpr::T1, 0xffff_fffc);
  let mut vm = interp(
    vec![Instruction::LoadMem(LoadMem::new("ldc1", "$f2", "$t1", 0))],
    m,
  );
  assert_eq!(
    vm.execute_one(),
    Err(ExecutionError::AddressError { addr: 0, pc: TEXT_BASE })
  );
}

#[test]
fn store_undo_restores_prior_memory() {
  let mut m = machine();
  m.set_gpr(Gpr::T1, DATA_BASE);
  m.set_gpr(Gpr::T0, 0x1234_5678);
  m.memory.write(DATA_BASE, 0xaaaa_bbbb, MemWidth::Word, 0).unwrap();
  let mut vm = interp(
    vec![Instruction::LoadMem(LoadMem::new("sh", "$t0", "$t1", 0))],
    m,
  );

  vm.execute_one().unwrap();
  assert_eq!(
    vm.machine().memory.read(DATA_BASE, MemWidth::Word, 0).unwrap(),
    0xaaaa_5678
  );
  let frame = vm.history().last().unwrap();
  assert_eq!(
    frame.changes[0],
    StateChange::Mem {
      addr: DATA_BASE, val: 0xbbbb, width: MemWidth::Half, pc: TEXT_BASE,
    }
  );

  vm.undo_one().unwrap();
  assert_eq!(
    vm.machine().memory.read(DATA_BASE, MemWidth::Word, 0).unwrap(),
    0xaaaa_bbbb
  );
}

#[test]
fn mult_logs_one_joint_hi_lo_change() {
  let mut m = machine();
  m.set_gpr(Gpr::T0, 0x4000_0000);
  m.set_gpr(Gpr::T1, 4);
  let mut vm = interp(
    vec![Instruction::RType(RType::two_source("mult", "$t0", "$t1"))],
    m,
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().hi, 1);
  assert_eq!(vm.machine().lo, 0);
  let frame = vm.history().last().unwrap();
  assert_eq!(
    frame.changes[0],
    StateChange::M { hi: 0, lo: 0, pc: TEXT_BASE }
  );
}

#[test]
fn hi_lo_moves_round_trip() {
  let mut m = machine();
  m.set_gpr(Gpr::T0, 17);
  let mut vm = interp(
    vec![
      Instruction::Move(Move::new("mthi", "$t0")),
      Instruction::Move(Move::new("mfhi", "$t1")),
    ],
    m,
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().hi, 17);
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().gpr(Gpr::T1), 17);

  vm.undo_one().unwrap();
  vm.undo_one().unwrap();
  assert_eq!(vm.machine().hi, 0);
  assert_eq!(vm.machine().gpr(Gpr::T1), 0);
}

#[test]
fn float_compare_drives_float_branch() {
  let mut m = machine();
  m.set_fpr_single(Fpr::F0, 2.0);
  m.set_fpr_single(Fpr::F1, 3.0);
  let mut vm = interp_with_symbols(
    vec![
      Instruction::Compare(Compare::new("c.lt.s", "$f0", "$f1", 1).unwrap()),
      Instruction::BranchFloat(BranchFloat::new("bc1t", Label::new("yes"), 1).unwrap()),
    ],
    m,
    &[("yes", TEXT_BASE + 32)],
  );

  vm.execute_one().unwrap();
  assert!(vm.machine().flag(1));
  assert_eq!(
    vm.history().last().unwrap().changes[0],
    StateChange::Flag { flag: 1, value: false, pc: TEXT_BASE }
  );

  vm.execute_one().unwrap();
  assert_eq!(vm.machine().pc, TEXT_BASE + 32);
}

#[test]
fn conditional_move_copies_only_on_match() {
  let mut m = machine();
  m.set_flag(3, true);
  m.set_gpr(Gpr::T1, 5);
  let mut vm = interp(
    vec![
      Instruction::MoveCond(MoveCond::new("movt", "$t0", "$t1", 3).unwrap()),
      Instruction::MoveCond(MoveCond::new("movf", "$t2", "$t1", 3).unwrap()),
    ],
    m,
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().gpr(Gpr::T0), 5);
  vm.execute_one().unwrap();
  // Flag is true, movf does not fire and logs nothing.
  assert_eq!(vm.machine().gpr(Gpr::T2), 0);
  assert!(vm.history().last().unwrap().changes.is_empty());
}

#[test]
fn convert_int_to_single() {
  let mut m = machine();
  m.set_fpr(Fpr::F2, 21);
  let mut vm = interp(
    vec![Instruction::Convert(mipsim::Convert::new("cvt.s.w", "$f0", "$f2"))],
    m,
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().fpr_single(Fpr::F0), 21.0);
}

struct ExitOnSyscall {
  injected: u32,
}

impl SyscallHandler for ExitOnSyscall {
  fn on_syscall(&mut self, machine: &Machine) -> SyscallResult {
    // A read-integer style service keyed off $v0, then exit.
    let service = machine.gpr(Gpr::V0);
    SyscallResult {
      writes: vec![(RegName::from("$v0"), self.injected + service)],
      action: SyscallAction::Exit,
    }
  }
}

#[test]
fn syscall_hook_injects_state_and_exits() {
  let mut m = machine();
  m.set_gpr(Gpr::V0, 5);
  let mut vm = interp(vec![Instruction::Syscall], m)
    .with_syscalls(Box::new(ExitOnSyscall { injected: 100 }));

  assert_eq!(vm.execute_one().unwrap(), StepOutcome::Exited);
  assert_eq!(vm.machine().gpr(Gpr::V0), 105);
  // The injected write is logged and reversible like any other.
  assert_eq!(
    vm.history().last().unwrap().changes[0],
    StateChange::Reg {
      reg: RegName::from("$v0"), val: 5, pc: TEXT_BASE, is_double: false,
    }
  );
  assert_eq!(vm.execute_one().unwrap(), StepOutcome::Finished);
}

struct BadSecondWrite;

impl SyscallHandler for BadSecondWrite {
  fn on_syscall(&mut self, _machine: &Machine) -> SyscallResult {
    SyscallResult {
      writes: vec![
        (RegName::from("$t0"), 7),
        (RegName::from("$bogus"), 1),
      ],
      action: SyscallAction::Continue,
    }
  }
}

#[test]
fn syscall_hook_bad_write_reverts_earlier_ones() {
  let mut vm = interp(vec![Instruction::Syscall], machine())
    .with_syscalls(Box::new(BadSecondWrite));
  match vm.execute_one() {
    Err(ExecutionError::DecodeError { .. }) => {}
    other => panic!("expected a decode error, got {:?}", other),
  }
  // The good first write was applied before the bad name was seen; it must
  // not survive the trap.
  assert_eq!(vm.machine().gpr(Gpr::T0), 0);
  assert!(vm.history().is_empty());
}

#[test]
fn breakpoint_traps_without_touching_state() {
  let mut vm = interp(
    vec![Instruction::Breakpoint { code: 2 }, Instruction::Nop],
    machine(),
  );
  assert_eq!(
    vm.execute_one().unwrap(),
    StepOutcome::Breakpoint { code: 2 }
  );
  assert!(vm.history().last().unwrap().changes.is_empty());
  assert_eq!(vm.machine().pc, TEXT_BASE + 4);
  // Execution resumes past the trap.
  assert_eq!(vm.execute_one().unwrap(), StepOutcome::Retired);
}

#[test]
fn unexpanded_pseudo_is_a_decode_error() {
  let mut vm = interp(
    vec![Instruction::Pseudo(Pseudo::new("la", vec![]))],
    machine(),
  );
  match vm.execute_one() {
    Err(ExecutionError::DecodeError { what, pc }) => {
      assert!(what.contains("la"));
      assert_eq!(pc, TEXT_BASE);
    }
    other => panic!("expected a decode error, got {:?}", other),
  }
}

#[test]
fn run_executes_to_completion() {
  // Build 0x00ff00ff in $t0 the long way, summing into $t1 in a loop.
  let mut m = machine();
  m.set_gpr(Gpr::T2, 3);
  let instrs = vec![
    Instruction::LoadImm(LoadImm::new("lui", "$t0", 0x00ff)),
    Instruction::IType(IType::new("ori", "$t0", "$t0", 0x00ff)),
    // loop: $t1 += 2 ; $t2 -= 1 ; bne $t2, $zero, loop
    Instruction::IType(IType::new("addiu", "$t1", "$t1", 2)),
    Instruction::IType(IType::new("addiu", "$t2", "$t2", -1)),
    Instruction::Branch(Branch::new("bne", "$t2", "$zero", Label::new("loop"))),
  ];
  let mut vm = interp_with_symbols(instrs, m, &[("loop", TEXT_BASE + 8)]);

  assert_eq!(vm.run().unwrap(), StepOutcome::Finished);
  assert_eq!(vm.machine().gpr(Gpr::T0), 0x00ff_00ff);
  assert_eq!(vm.machine().gpr(Gpr::T1), 6);
  assert_eq!(vm.machine().gpr(Gpr::T2), 0);

  // And the whole run unwinds back to the initial state.
  while vm.undo_one().is_some() {}
  assert_eq!(vm.machine().gpr(Gpr::T0), 0);
  assert_eq!(vm.machine().gpr(Gpr::T1), 0);
  assert_eq!(vm.machine().gpr(Gpr::T2), 3);
  assert_eq!(vm.machine().pc, TEXT_BASE);
}

#[test]
fn data_segment_feeds_loads() {
  let mut m = machine();
  let resolved = m
    .load_data(&[
      Declaration::new(Label::new("greeting"), "asciiz", DeclData::Asciiz("ok".into())),
      Declaration::new(Label::new("nums"), "word", DeclData::Word(vec![42])),
    ])
    .unwrap();
  let nums = resolved[1].1;
  m.set_gpr(Gpr::T1, nums);

  let mut vm = interp(
    vec![Instruction::LoadMem(LoadMem::new("lw", "$t0", "$t1", 0))],
    m,
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().gpr(Gpr::T0), 42);
}

#[test]
fn writes_to_zero_register_are_dropped() {
  let mut m = machine();
  m.set_gpr(Gpr::T1, 1);
  m.set_gpr(Gpr::T2, 2);
  let mut vm = interp(
    vec![Instruction::RType(RType::three("addu", "$zero", "$t1", "$t2"))],
    m,
  );
  vm.execute_one().unwrap();
  assert_eq!(vm.machine().gpr(Gpr::Zero), 0);
  assert!(vm.history().last().unwrap().changes.is_empty());
}
