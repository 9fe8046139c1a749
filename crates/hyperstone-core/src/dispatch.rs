//! Trap, exception, interrupt and software-emulation entry sequences.
//!
//! Every entry opens a new register frame at `FP + FL`, stores the return
//! `PC | S` and the old `SR` in its first two locals, then jumps to the vector.

use crate::decoder::DecodedInstruction;
use crate::interrupt::InterruptSource;
use crate::state::registers::{SR_I, SR_L, SR_M, SR_S, SR_T};
use crate::timing::{clocks, CycleCostKind};
use crate::{Bus, CoreState, FaultCode};

/// Frame shape opened by an entry sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// `TRAPxx` instruction.
    Trap,
    /// Exception raised by an instruction.
    Exception,
    /// Accepted interrupt.
    Interrupt,
}

impl EntryKind {
    const fn frame_length(self) -> u32 {
        match self {
            Self::Trap => 6,
            Self::Exception | Self::Interrupt => 2,
        }
    }

    const fn flags_set(self) -> u32 {
        match self {
            Self::Trap | Self::Exception => SR_L | SR_S,
            Self::Interrupt => SR_L | SR_S | SR_I,
        }
    }
}

/// Runs the shared entry sequence and returns the clocks it costs.
pub fn enter(state: &mut CoreState, kind: EntryKind, trap_number: u8) -> u32 {
    state.resolve_delay_slot();

    let old_sr = state.arch.sr();
    let frame = state.arch.fp() + state.arch.frame_len();
    let return_pc = state.arch.pc() | state.arch.supervisor_bit();

    state.arch.set_fl(kind.frame_length());
    state.arch.set_fp(frame);
    state.arch.set_local(0, return_pc);
    state.arch.set_local(1, old_sr);

    state.arch.set_flag(SR_M | SR_T, false);
    state.arch.set_flag(kind.flags_set(), true);
    state.arch.set_pc(state.trap_entry.trap_vector(trap_number));

    clocks(CycleCostKind::DispatchEntry)
}

/// Vectors a `TRAPxx` instruction.
pub fn enter_trap(state: &mut CoreState, trap_number: u8) -> u32 {
    enter(state, EntryKind::Trap, trap_number)
}

/// Vectors an instruction exception; terminal faults do not vector.
pub fn enter_exception(state: &mut CoreState, cause: FaultCode) -> u32 {
    match cause.trap_number() {
        Some(trap_number) => enter(state, EntryKind::Exception, trap_number),
        None => 0,
    }
}

/// Accepts an interrupt, acknowledging external lines to the host.
pub fn enter_interrupt(state: &mut CoreState, bus: &mut dyn Bus, source: InterruptSource) -> u32 {
    match source {
        InterruptSource::External(line) => bus.acknowledge_interrupt(line),
        InterruptSource::Timer => state.timer.acknowledge(),
    }
    tracing::trace!(?source, pc = state.arch.pc(), "interrupt accepted");
    enter(state, EntryKind::Interrupt, source.trap_number())
}

/// Enters the emulation routine of a software opcode (`0xC0..=0xCD`).
///
/// The new six-register frame receives the stack address of the `Ld` slot,
/// `Ls`, `Lsf`, the return `PC | S` and the old `SR`.
pub fn enter_software(state: &mut CoreState, instr: &DecodedInstruction) -> u32 {
    state.resolve_delay_slot();

    let fp = state.arch.fp();
    let src = u32::from(instr.src_code());
    let dst = u32::from(instr.dst_code());
    let operand = state.arch.local(src);
    let operand_next = state.arch.local(src + 1);
    let stack_of_dst = (state.arch.sp() & !0xFF)
        .wrapping_add(0x100)
        .wrapping_add(((fp + dst) & 0x3F) << 2);
    let old_sr = state.arch.sr();
    let return_pc = state.arch.pc() | state.arch.supervisor_bit();
    let frame = fp + state.arch.frame_len();

    state.arch.set_fl(6);
    state.arch.set_fp(frame);
    state.arch.set_local(0, stack_of_dst);
    state.arch.set_local(1, operand);
    state.arch.set_local(2, operand_next);
    state.arch.set_local(3, return_pc);
    state.arch.set_local(4, old_sr);

    state.arch.set_flag(SR_M | SR_T, false);
    state.arch.set_flag(SR_L, true);
    state
        .arch
        .set_pc(state.trap_entry.emulation_vector(instr.opcode_byte()));

    clocks(CycleCostKind::SoftwareEntry)
}

#[cfg(test)]
mod tests {
    use super::{enter_exception, enter_software, enter_trap};
    use crate::decoder::Decoder;
    use crate::state::registers::{SR_L, SR_M, SR_S, SR_T};
    use crate::{CoreState, DelaySlot, FaultCode};

    fn user_state() -> CoreState {
        let mut state = CoreState::default();
        state.arch.set_sr(0);
        state.arch.set_fp(10);
        state.arch.set_fl(4);
        state.arch.set_flag(SR_M | SR_T, true);
        state.arch.set_pc(0x2000);
        state
    }

    #[test]
    fn trap_entry_opens_six_register_frame() {
        let mut state = user_state();
        let old_sr = state.arch.sr();

        let clocks = enter_trap(&mut state, 60);

        assert_eq!(clocks, 2);
        assert_eq!(state.arch.fp(), 14);
        assert_eq!(state.arch.fl(), 6);
        assert_eq!(state.arch.local(0), 0x2000);
        assert_eq!(state.arch.local(1), old_sr);
        assert!(state.arch.flag(SR_L | SR_S));
        assert!(!state.arch.flag(SR_M));
        assert!(!state.arch.flag(SR_T));
        assert_eq!(state.arch.pc(), 0xFFFF_FFF0);
    }

    #[test]
    fn exception_entry_uses_two_register_frame() {
        let mut state = user_state();
        enter_exception(&mut state, FaultCode::RangeError);
        assert_eq!(state.arch.fl(), 2);
        assert_eq!(state.arch.fp(), 14);
    }

    #[test]
    fn terminal_fault_does_not_vector() {
        let mut state = user_state();
        assert_eq!(
            enter_exception(&mut state, FaultCode::UnsupportedHardwareLoop),
            0
        );
        assert_eq!(state.arch.pc(), 0x2000);
    }

    #[test]
    fn entry_from_delay_slot_returns_to_branch_target() {
        let mut state = user_state();
        state.delay = DelaySlot::Active(0x3000);

        enter_trap(&mut state, 60);

        assert_eq!(state.arch.local(0), 0x3000);
        assert_eq!(state.delay, DelaySlot::Idle);
    }

    #[test]
    fn software_entry_passes_operands_and_stack_slot() {
        let mut state = user_state();
        state.arch.set_sp(0x0000_8040);
        state.arch.set_local(2, 0x1111);
        state.arch.set_local(3, 0x2222);
        let old_sr = state.arch.sr();
        let instr = Decoder::decode(0xC552, false, || 0);

        let clocks = enter_software(&mut state, &instr);

        assert_eq!(clocks, 6);
        assert_eq!(state.arch.fp(), 14);
        assert_eq!(state.arch.fl(), 6);
        assert_eq!(state.arch.local(0), 0x8000 + 0x100 + (15 << 2));
        assert_eq!(state.arch.local(1), 0x1111);
        assert_eq!(state.arch.local(2), 0x2222);
        assert_eq!(state.arch.local(3), 0x2000);
        assert_eq!(state.arch.local(4), old_sr);
        assert!(state.arch.flag(SR_L));
        assert!(!state.arch.flag(SR_S));
        assert_eq!(state.arch.pc(), 0xFFFF_FE50);
    }
}
