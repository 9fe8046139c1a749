//! Register access with architectural side effects.
//!
//! Instruction handlers go through [`read_operand`] and [`write_operand`] so
//! that `PC`, `SR`, the timer registers and `MCR` behave the same no matter
//! which instruction touches them.

use crate::decoder::{DecodedInstruction, OperandRef, RegisterBank};
use crate::execute::ExecuteOutcome;
use crate::memory::TrapEntryRegion;
use crate::state::registers::{
    BCR_REGISTER, FCR_REGISTER, ISR_REGISTER, MCR_REGISTER, PC_REGISTER, SP_REGISTER, SR_M,
    SR_REGISTER, TCR_REGISTER, TPR_REGISTER, TR_REGISTER, UB_REGISTER,
};
use crate::timer::TPR_DEFERRED;
use crate::timing::{clocks, CycleCostKind};
use crate::CoreState;

/// Reads a global register as an instruction operand.
pub fn read_global(state: &mut CoreState, index: u8) -> u32 {
    match index {
        PC_REGISTER => {
            state.resolve_delay_slot();
            state.arch.pc()
        }
        BCR_REGISTER | TPR_REGISTER | FCR_REGISTER | MCR_REGISTER => 0,
        TR_REGISTER => {
            if state.config.timer_poll_skip {
                state.stall_clocks = state
                    .stall_clocks
                    .saturating_add(state.timer.clocks_per_tick() / 2);
            }
            state.timer.counter()
        }
        16 | 17 | 28..=31 => {
            tracing::debug!(index, pc = state.arch.pc(), "read of reserved global register");
            state.arch.global(index)
        }
        _ => state.arch.global(index),
    }
}

/// Writes a global register, applying its architectural side effects.
pub fn write_global(state: &mut CoreState, index: u8, value: u32) {
    match index & 0x1F {
        PC_REGISTER => {
            state.resolve_delay_slot();
            state.arch.set_pc(value);
        }
        SR_REGISTER => {
            let sr = (state.arch.sr() & 0xFFFF_0000) | (value & 0xFFFF);
            state.arch.set_sr(sr);
            state.interrupt_block = state.interrupt_block.max(1);
        }
        SP_REGISTER | UB_REGISTER => state.arch.set_global(index, value & !3),
        ISR_REGISTER => {}
        TR_REGISTER => state.timer.write_counter(value),
        TCR_REGISTER => {
            state.timer.write_compare(value);
            state.arch.set_global(index, value);
        }
        TPR_REGISTER => {
            let scale_mask = state.config.variant.clock_scale_mask();
            state.timer.write_prescaler(value, scale_mask);
            state.arch.set_global(index, value & !TPR_DEFERRED);
        }
        MCR_REGISTER => {
            match TrapEntryRegion::from_mcr(value) {
                Some(region) => state.trap_entry = region,
                None => tracing::warn!(
                    mcr = format_args!("{value:#010x}"),
                    "invalid trap-entry selector; keeping {:?}",
                    state.trap_entry
                ),
            }
            state.arch.set_global(index, value);
        }
        _ => state.arch.set_global(index, value),
    }
}

/// Reads a decoded register operand.
pub fn read_operand(state: &mut CoreState, operand: OperandRef) -> u32 {
    match operand.bank {
        RegisterBank::Global => read_global(state, operand.index),
        RegisterBank::Local => state.arch.local(u32::from(operand.index)),
    }
}

/// Writes a decoded register operand.
pub fn write_operand(state: &mut CoreState, operand: OperandRef, value: u32) {
    match operand.bank {
        RegisterBank::Global => write_global(state, operand.index, value),
        RegisterBank::Local => state.arch.set_local(u32::from(operand.index), value),
    }
}

/// Writes an ALU result; a `PC` destination also clears `M`.
pub fn write_result(state: &mut CoreState, operand: OperandRef, value: u32) {
    write_operand(state, operand, value);
    if operand.is_pc() {
        state.arch.set_flag(SR_M, false);
    }
}

/// Source operand of the add/subtract class, where `SR` denotes the carry bit.
pub fn arithmetic_source(state: &mut CoreState, operand: OperandRef) -> u32 {
    if operand.is_sr() {
        state.arch.carry()
    } else {
        read_operand(state, operand)
    }
}

/// Source operand of stores and `CHK`-like forms, where `SR` denotes zero.
pub fn source_or_zero(state: &mut CoreState, operand: OperandRef) -> u32 {
    if operand.is_sr() {
        0
    } else {
        read_operand(state, operand)
    }
}

/// Retired outcome charging the clocks of `kind`.
pub fn retired(kind: CycleCostKind) -> ExecuteOutcome {
    ExecuteOutcome::Retired {
        clocks: clocks(kind),
    }
}

/// Counts and logs a reserved or illegal operand encoding, executed as a no-op.
pub fn reserved(state: &mut CoreState, instr: &DecodedInstruction, what: &str) -> ExecuteOutcome {
    tracing::debug!(
        opcode = format_args!("{:#06x}", instr.opcode),
        pc = state.arch.pc(),
        "{what}; executed as no-op"
    );
    state.diag.record_reserved();
    retired(CycleCostKind::Alu)
}

#[cfg(test)]
mod tests {
    use super::{arithmetic_source, read_global, write_global};
    use crate::decoder::OperandRef;
    use crate::memory::TrapEntryRegion;
    use crate::state::registers::{
        MCR_REGISTER, PC_REGISTER, SP_REGISTER, SR_C, SR_REGISTER, SR_RESERVED, TPR_REGISTER,
        TR_REGISTER,
    };
    use crate::{CoreConfig, CoreState, DelaySlot};

    #[test]
    fn sr_writes_only_replace_the_low_half_and_block_interrupts() {
        let mut state = CoreState::default();
        let high = state.arch.sr() & 0xFFFF_0000;

        write_global(&mut state, SR_REGISTER, 0xFFFF_FFFF);

        assert_eq!(state.arch.sr(), high | (0xFFFF & !SR_RESERVED));
        assert_eq!(state.interrupt_block, 1);
    }

    #[test]
    fn pc_access_resolves_active_delay_slot() {
        let mut state = CoreState::default();
        state.delay = DelaySlot::Active(0x500);

        assert_eq!(read_global(&mut state, PC_REGISTER), 0x500);
        assert_eq!(state.delay, DelaySlot::Idle);
    }

    #[test]
    fn write_only_registers_read_as_zero() {
        let mut state = CoreState::default();
        write_global(&mut state, TPR_REGISTER, 0x0004_0000);
        assert_eq!(read_global(&mut state, TPR_REGISTER), 0);
        assert_eq!(state.timer.clocks_per_tick(), 6);
    }

    #[test]
    fn invalid_mcr_selector_keeps_previous_region() {
        let mut state = CoreState::default();
        write_global(&mut state, MCR_REGISTER, 0x1000);
        assert_eq!(state.trap_entry, TrapEntryRegion::Mem1);

        write_global(&mut state, MCR_REGISTER, 0x5000);
        assert_eq!(state.trap_entry, TrapEntryRegion::Mem1);
    }

    #[test]
    fn stack_pointer_writes_are_word_aligned() {
        let mut state = CoreState::default();
        write_global(&mut state, SP_REGISTER, 0x1237);
        assert_eq!(state.arch.sp(), 0x1234);
    }

    #[test]
    fn timer_poll_skip_stalls_on_counter_reads() {
        let mut state = CoreState::with_config(&CoreConfig {
            timer_poll_skip: true,
            ..CoreConfig::default()
        });
        write_global(&mut state, TR_REGISTER, 77);

        assert_eq!(read_global(&mut state, TR_REGISTER), 77);
        assert_eq!(state.stall_clocks, 1);
    }

    #[test]
    fn sr_as_arithmetic_source_is_carry() {
        let mut state = CoreState::default();
        state.arch.set_flag(SR_C, true);
        assert_eq!(arithmetic_source(&mut state, OperandRef::global(1)), 1);
    }
}
