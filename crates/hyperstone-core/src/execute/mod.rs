//! Instruction execution pipeline.
//!
//! One call to [`step_one`] handles a single instruction boundary:
//! 1. Promote a delayed branch armed by the previous instruction
//! 2. Accept a pending interrupt, if allowed
//! 3. Fetch and decode, advancing `PC` past every consumed half-word
//! 4. Execute the handler for the decoded encoding
//! 5. Vector traps, exceptions and software opcodes
//! 6. Complete an active delay slot and check for a trace exception
//! 7. Charge clocks to the timer and scale them into cycles

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::similar_names,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    unknown_lints,
    missing_docs
)]

mod alu;
mod control;
mod flags;
mod helpers;
mod load_store;
mod mac;
mod shift;

pub use flags::FlagsUpdate;
pub use helpers::{read_global, write_global};

use crate::decoder::{DecodedInstruction, Decoder};
use crate::dispatch;
use crate::encoding::OpcodeEncoding;
use crate::interrupt::highest_priority;
use crate::memory::access::read_half;
use crate::state::registers::{FCR_REGISTER, ISR_REGISTER, SR_H, SR_L, SR_P, SR_T};
use crate::{Bus, CoreState, DelaySlot, FaultCode, RunState, StepOutcome};

use alu::{ArithOp, LogicOp};
use shift::{ShiftCount, ShiftKind};

/// Result of running one instruction handler, before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Instruction completed.
    Retired {
        /// Unscaled clocks consumed.
        clocks: u32,
    },
    /// Instruction raised an exception after its side effects.
    Exception {
        cause: FaultCode,
        /// Unscaled clocks consumed before dispatch.
        clocks: u32,
    },
    /// A `TRAPxx` condition held.
    Trap { trap_number: u8, clocks: u32 },
    /// A software opcode entered its emulation routine.
    Software { clocks: u32 },
    /// Terminal fault; the core stops.
    Fatal { cause: FaultCode },
}

/// Runs the handler for a decoded instruction.
///
/// `PC` must already point past the instruction.
pub fn execute_instruction(
    state: &mut CoreState,
    bus: &mut dyn Bus,
    instr: &DecodedInstruction,
) -> ExecuteOutcome {
    use OpcodeEncoding as E;

    match instr.encoding {
        E::Chk => alu::chk(state, instr),
        E::Movd if instr.dst.is_pc() => control::ret(state, bus, instr),
        E::Movd => alu::movd(state, instr),
        E::Divu => alu::divide(state, instr, false),
        E::Divs => alu::divide(state, instr, true),
        E::Xm => alu::xm(state, instr),
        E::Mask => alu::mask(state, instr),
        E::Sum => alu::sum(state, instr, false),
        E::Sums => alu::sum(state, instr, true),
        E::Cmp => alu::cmp(state, instr),
        E::Mov => alu::mov(state, instr),
        E::Add => alu::arithmetic(state, instr, ArithOp::Add),
        E::Adds => alu::arithmetic(state, instr, ArithOp::AddSigned),
        E::Addc => alu::arithmetic(state, instr, ArithOp::AddCarry),
        E::Sub => alu::arithmetic(state, instr, ArithOp::Sub),
        E::Subs => alu::arithmetic(state, instr, ArithOp::SubSigned),
        E::Subc => alu::arithmetic(state, instr, ArithOp::SubCarry),
        E::Cmpb => alu::cmpb(state, instr),
        E::Andn => alu::logic(state, instr, LogicOp::AndNot),
        E::Or => alu::logic(state, instr, LogicOp::Or),
        E::Xor => alu::logic(state, instr, LogicOp::Xor),
        E::And => alu::logic(state, instr, LogicOp::And),
        E::Not => alu::not(state, instr),
        E::Neg => alu::negate(state, instr, false),
        E::Negs => alu::negate(state, instr, true),
        E::Cmpi => alu::cmpi(state, instr),
        E::Movi => alu::movi(state, instr),
        E::Addi => alu::addi(state, instr, false),
        E::Addsi => alu::addi(state, instr, true),
        E::Cmpbi => alu::cmpbi(state, instr),
        E::Andni => alu::logic_immediate(state, instr, LogicOp::AndNot),
        E::Ori => alu::logic_immediate(state, instr, LogicOp::Or),
        E::Xori => alu::logic_immediate(state, instr, LogicOp::Xor),
        E::Shrdi => shift::double(state, instr, ShiftKind::Right, ShiftCount::Immediate),
        E::Shrd => shift::double(state, instr, ShiftKind::Right, ShiftCount::Register),
        E::Shr => shift::single(state, instr, ShiftKind::Right, ShiftCount::Register),
        E::Sardi => {
            shift::double(state, instr, ShiftKind::ArithmeticRight, ShiftCount::Immediate)
        }
        E::Sard => shift::double(state, instr, ShiftKind::ArithmeticRight, ShiftCount::Register),
        E::Sar => shift::single(state, instr, ShiftKind::ArithmeticRight, ShiftCount::Register),
        E::Shldi => shift::double(state, instr, ShiftKind::Left, ShiftCount::Immediate),
        E::Shld => shift::double(state, instr, ShiftKind::Left, ShiftCount::Register),
        E::Shl => shift::single(state, instr, ShiftKind::Left, ShiftCount::Register),
        E::Shri => shift::single(state, instr, ShiftKind::Right, ShiftCount::Immediate),
        E::Sari => shift::single(state, instr, ShiftKind::ArithmeticRight, ShiftCount::Immediate),
        E::Shli => shift::single(state, instr, ShiftKind::Left, ShiftCount::Immediate),
        E::Testlz => shift::test_leading_zeros(state, instr),
        E::Rol => shift::rotate_left(state, instr),
        E::LoadDisplacement => load_store::load_displacement(state, bus, instr),
        E::LoadPostIncrement => load_store::load_post_increment(state, bus, instr),
        E::StoreDisplacement => load_store::store_displacement(state, bus, instr),
        E::StorePostIncrement => load_store::store_post_increment(state, bus, instr),
        E::LdwR => load_store::load_register(state, bus, instr, false, false),
        E::LddR => load_store::load_register(state, bus, instr, true, false),
        E::LdwP => load_store::load_register(state, bus, instr, false, true),
        E::LddP => load_store::load_register(state, bus, instr, true, true),
        E::StwR => load_store::store_register(state, bus, instr, false, false),
        E::StdR => load_store::store_register(state, bus, instr, true, false),
        E::StwP => load_store::store_register(state, bus, instr, false, true),
        E::StdP => load_store::store_register(state, bus, instr, true, true),
        E::Mulu => mac::mul_double(state, instr, false),
        E::Muls => mac::mul_double(state, instr, true),
        E::Mul => mac::mul(state, instr),
        E::Set => alu::set(state, instr),
        E::Extend => mac::extend(state, instr),
        E::Software => ExecuteOutcome::Software {
            clocks: dispatch::enter_software(state, instr),
        },
        E::Do => control::hardware_loop(state, instr),
        E::DelayedBranch(condition) => control::delayed_branch(state, instr, condition),
        E::Branch(condition) => control::branch(state, instr, condition),
        E::Frame => control::frame(state, bus, instr),
        E::Call => control::call(state, instr),
        E::Trap => control::trap(state, instr),
        E::Reserved => helpers::reserved(state, instr, "reserved opcode"),
    }
}

/// Tries to accept an interrupt at the current boundary.
fn poll_interrupts(state: &mut CoreState, bus: &mut dyn Bus) -> Option<StepOutcome> {
    if state.interrupt_block > 0 {
        state.interrupt_block -= 1;
        return None;
    }
    if state.arch.flag(SR_L) || state.delay.in_flight() {
        return None;
    }
    let source = highest_priority(
        state.arch.global(ISR_REGISTER),
        state.arch.global(FCR_REGISTER),
        state.timer.pending(),
    )?;
    let entry_clocks = dispatch::enter_interrupt(state, bus, source);
    state.diag.record_interrupt();
    Some(StepOutcome::InterruptDispatch {
        source,
        cycles: charge(state, entry_clocks),
    })
}

/// Advances the timer by `clocks` and returns the scaled cycle count.
fn charge(state: &mut CoreState, clocks: u32) -> u32 {
    let scale = state.timer.clock_scale();
    let mask = state.config.variant.clock_scale_mask();
    state.timer.advance(clocks, mask);
    clocks << scale
}

/// Executes exactly one instruction boundary.
pub fn step_one(state: &mut CoreState, bus: &mut dyn Bus) -> StepOutcome {
    if let RunState::FaultLatched(cause) = state.run_state {
        return StepOutcome::Fault { cause };
    }

    state.delay = state.delay.promoted();
    if let Some(outcome) = poll_interrupts(state, bus) {
        return outcome;
    }

    let high_globals = state.arch.flag(SR_H);
    let pc = state.arch.pc();
    let opcode = read_half(bus, pc);
    let mut fetch_addr = pc;
    let instr = Decoder::decode(opcode, high_globals, || {
        fetch_addr = fetch_addr.wrapping_add(2);
        read_half(bus, fetch_addr)
    });
    let length = u32::from(instr.length_words);
    state.arch.set_pc(pc.wrapping_add(length * 2));
    state.arch.set_ilc(length);
    state.stall_clocks = 0;

    let outcome = execute_instruction(state, bus, &instr);
    state.diag.record_instruction();
    if high_globals {
        state.arch.set_flag(SR_H, false);
    }
    state.arch.set_ilc(length);

    let (mut step, mut clocks_used) = match outcome {
        ExecuteOutcome::Retired { clocks } => (StepOutcome::Retired { cycles: 0 }, clocks),
        ExecuteOutcome::Exception { cause, clocks } => {
            state.diag.record_fault(cause, pc);
            let entry = dispatch::enter_exception(state, cause);
            (
                StepOutcome::ExceptionDispatch { cause, cycles: 0 },
                clocks + entry,
            )
        }
        ExecuteOutcome::Trap {
            trap_number,
            clocks,
        } => {
            state.diag.record_trap();
            let entry = dispatch::enter_trap(state, trap_number);
            (
                StepOutcome::TrapDispatch {
                    trap_number,
                    cycles: 0,
                },
                clocks + entry,
            )
        }
        ExecuteOutcome::Software { clocks } => {
            state.diag.record_software();
            (
                StepOutcome::SoftwareDispatch {
                    opcode: instr.opcode_byte(),
                    cycles: 0,
                },
                clocks,
            )
        }
        ExecuteOutcome::Fatal { cause } => {
            state.diag.record_fault(cause, pc);
            state.run_state = RunState::FaultLatched(cause);
            return StepOutcome::Fault { cause };
        }
    };

    if let Some(target) = state.delay.active_target() {
        state.arch.set_pc(target);
        state.delay = DelaySlot::Idle;
    }

    if state.arch.flag(SR_T | SR_P) && !matches!(state.delay, DelaySlot::Pending(_)) {
        let cause = FaultCode::TraceException;
        state.diag.record_fault(cause, pc);
        clocks_used += dispatch::enter_exception(state, cause);
        if matches!(step, StepOutcome::Retired { .. }) {
            step = StepOutcome::ExceptionDispatch { cause, cycles: 0 };
        }
    }

    clocks_used = clocks_used.saturating_add(state.stall_clocks);
    state.stall_clocks = 0;
    let cycles = charge(state, clocks_used);
    tracing::trace!(pc, opcode, cycles, "instruction retired");

    match step {
        StepOutcome::Retired { .. } => StepOutcome::Retired { cycles },
        StepOutcome::TrapDispatch { trap_number, .. } => StepOutcome::TrapDispatch {
            trap_number,
            cycles,
        },
        StepOutcome::ExceptionDispatch { cause, .. } => {
            StepOutcome::ExceptionDispatch { cause, cycles }
        }
        StepOutcome::SoftwareDispatch { opcode, .. } => {
            StepOutcome::SoftwareDispatch { opcode, cycles }
        }
        other => other,
    }
}

/// Runs instruction boundaries until `cycle_budget` is consumed or a fault latches.
///
/// Returns the cycles actually consumed, which may exceed the budget by at most
/// one instruction.
pub fn execute(state: &mut CoreState, bus: &mut dyn Bus, cycle_budget: u32) -> u32 {
    let mut consumed: u32 = 0;
    while consumed < cycle_budget {
        let outcome = step_one(state, bus);
        if let StepOutcome::Fault { cause } = outcome {
            tracing::debug!(?cause, consumed, "execution stopped on latched fault");
            break;
        }
        consumed = consumed.saturating_add(outcome.cycles());
    }
    consumed
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use crate::decoder::{DecodedInstruction, Decoder};
    use crate::state::registers::SR_H;
    use crate::{Bus, CoreState};

    /// Sparse big-endian memory with I/O recording.
    #[derive(Debug, Default)]
    pub struct TestBus {
        bytes: HashMap<u32, u8>,
        pub io_writes: Vec<(u32, u32)>,
        pub io_values: HashMap<u32, u32>,
        pub word_reads: usize,
        pub acknowledged: Vec<crate::IrqLine>,
    }

    impl TestBus {
        pub fn store_word(&mut self, addr: u32, value: u32) {
            for (offset, byte) in value.to_be_bytes().into_iter().enumerate() {
                self.bytes.insert(addr.wrapping_add(offset as u32), byte);
            }
        }

        pub fn store_half(&mut self, addr: u32, value: u16) {
            for (offset, byte) in value.to_be_bytes().into_iter().enumerate() {
                self.bytes.insert(addr.wrapping_add(offset as u32), byte);
            }
        }

        pub fn load_byte(&self, addr: u32) -> u8 {
            self.bytes.get(&addr).copied().unwrap_or(0)
        }

        pub fn load_word(&self, addr: u32) -> u32 {
            u32::from_be_bytes([
                self.load_byte(addr),
                self.load_byte(addr.wrapping_add(1)),
                self.load_byte(addr.wrapping_add(2)),
                self.load_byte(addr.wrapping_add(3)),
            ])
        }

        /// Places consecutive instruction half-words starting at `addr`.
        pub fn program(&mut self, addr: u32, words: &[u16]) {
            for (index, word) in words.iter().enumerate() {
                self.store_half(addr.wrapping_add(2 * index as u32), *word);
            }
        }
    }

    impl Bus for TestBus {
        fn read_byte(&mut self, addr: u32) -> u8 {
            self.load_byte(addr)
        }

        fn read_half(&mut self, addr: u32) -> u16 {
            u16::from_be_bytes([self.load_byte(addr), self.load_byte(addr.wrapping_add(1))])
        }

        fn read_word(&mut self, addr: u32) -> u32 {
            self.word_reads += 1;
            self.load_word(addr)
        }

        fn write_byte(&mut self, addr: u32, value: u8) {
            self.bytes.insert(addr, value);
        }

        fn write_half(&mut self, addr: u32, value: u16) {
            self.store_half(addr, value);
        }

        fn write_word(&mut self, addr: u32, value: u32) {
            self.store_word(addr, value);
        }

        fn io_read_word(&mut self, addr: u32) -> u32 {
            self.io_values.get(&addr).copied().unwrap_or(0)
        }

        fn io_write_word(&mut self, addr: u32, value: u32) {
            self.io_writes.push((addr, value));
        }

        fn acknowledge_interrupt(&mut self, line: crate::IrqLine) {
            self.acknowledged.push(line);
        }
    }

    /// Decodes `words` with the state's current `H` flag, leaving `PC` untouched.
    pub fn decode(state: &CoreState, words: &[u16]) -> DecodedInstruction {
        let mut rest = words.iter().skip(1).copied();
        Decoder::decode(words[0], state.arch.flag(SR_H), || rest.next().unwrap_or(0))
    }
}
