//! Branches, `CALL`, `FRAME`, `RET`, `TRAPxx`, software opcodes and `DO`.
//!
//! Every transfer of control resolves an active delay slot before it reads or
//! replaces `PC`.

use super::helpers::{read_operand, reserved, retired, source_or_zero};
use super::ExecuteOutcome;
use crate::decoder::DecodedInstruction;
use crate::encoding::Condition;
use crate::memory::access::{read_word, write_word};
use crate::state::registers::{wrap_window_distance, SR_L, SR_M, SR_S};
use crate::timing::{clocks, CycleCostKind};
use crate::{Bus, CoreState, DelaySlot, FaultCode};

/// `Bxx` / `BR`.
pub(super) fn branch(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    condition: Condition,
) -> ExecuteOutcome {
    if !condition.holds(state.arch.sr()) {
        return retired(CycleCostKind::BranchNotTaken);
    }
    state.resolve_delay_slot();
    let target = state.arch.pc().wrapping_add(instr.immediate);
    state.arch.set_pc(target);
    state.arch.set_flag(SR_M, false);
    retired(CycleCostKind::BranchTaken)
}

/// `DBxx` / `DBR`: the next instruction executes before the jump.
pub(super) fn delayed_branch(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    condition: Condition,
) -> ExecuteOutcome {
    if condition.holds(state.arch.sr()) {
        state.resolve_delay_slot();
        let target = state.arch.pc().wrapping_add(instr.immediate);
        state.delay = DelaySlot::Pending(target);
    }
    retired(CycleCostKind::DelayedBranch)
}

/// `CALL Ld, Rs, const`.
pub(super) fn call(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let base = source_or_zero(state, instr.src);
    state.resolve_delay_slot();

    let window = match u32::from(instr.dst_code()) {
        0 => 16,
        code => code,
    };
    let target = (instr.immediate & !1).wrapping_add(base);
    let fp = state.arch.fp();
    let return_pc = state.arch.pc() | state.arch.supervisor_bit();
    let sr = state.arch.sr();

    state.arch.set_physical_local(fp + window, return_pc);
    state.arch.set_physical_local(fp + window + 1, sr);
    state.arch.set_fp(fp + window);
    state.arch.set_fl(6);
    state.arch.set_flag(SR_M, false);
    state.arch.set_pc(target);
    state.interrupt_block = 2;

    retired(CycleCostKind::Call)
}

/// `FRAME Ld, Ls`: restructures the frame and spills locals the new frame would overrun.
pub(super) fn frame(
    state: &mut CoreState,
    bus: &mut dyn Bus,
    instr: &DecodedInstruction,
) -> ExecuteOutcome {
    let width = state.config.variant.bus_width();
    let fp = state.arch.fp().wrapping_sub(u32::from(instr.src_code())) & 0x7F;
    state.arch.set_fp(fp);
    state.arch.set_fl(u32::from(instr.dst_code()));
    state.arch.set_flag(SR_M, false);

    let mut sp = state.arch.sp();
    let free = ((sp & 0x1FC) >> 2) as i32 + 54;
    let mut diff = wrap_window_distance(free - (fp + state.arch.frame_len()) as i32);
    if diff >= 0 {
        return retired(CycleCostKind::Frame);
    }

    let bound_reached = sp >= state.arch.ub();
    while diff < 0 {
        let value = state.arch.physical_local((sp >> 2) & 0x3F);
        write_word(bus, width, sp, value);
        sp = sp.wrapping_add(4);
        diff += 1;
    }
    state.arch.set_sp(sp);
    tracing::trace!(sp, "frame spilled locals to the register stack");

    if bound_reached {
        ExecuteOutcome::Exception {
            cause: FaultCode::FrameError,
            clocks: clocks(CycleCostKind::Frame),
        }
    } else {
        retired(CycleCostKind::Frame)
    }
}

/// `RET PC, Rs`: restores `PC` and `SR` from `Rs:Rsf` and refills the local cache.
pub(super) fn ret(
    state: &mut CoreState,
    bus: &mut dyn Bus,
    instr: &DecodedInstruction,
) -> ExecuteOutcome {
    if instr.src.is_pc() || instr.src.is_sr() {
        return reserved(state, instr, "RET from PC or SR");
    }
    let width = state.config.variant.bus_width();
    let was_supervisor = state.arch.flag(SR_S);
    let was_locked = state.arch.flag(SR_L);

    let target = read_operand(state, instr.src);
    let saved_sr = read_operand(state, instr.src.next());
    state.resolve_delay_slot();
    state.arch.set_pc(target);
    state
        .arch
        .set_sr((saved_sr & 0xFFE3_FFFF) | ((target & 1) << 18));
    state.interrupt_block = state.interrupt_block.max(1);

    let supervisor = state.arch.flag(SR_S);
    let locked = state.arch.flag(SR_L);
    let escalates =
        (!was_supervisor && supervisor) || (!supervisor && !was_locked && locked);

    let mut sp = state.arch.sp();
    let mut diff = wrap_window_distance(state.arch.fp() as i32 - ((sp & 0x1FC) >> 2) as i32);
    while diff < 0 {
        sp = sp.wrapping_sub(4);
        let value = read_word(bus, width, sp);
        state.arch.set_physical_local((sp >> 2) & 0x3F, value);
        diff += 1;
    }
    state.arch.set_sp(sp);

    let cost = clocks(CycleCostKind::MoveDouble);
    if escalates {
        ExecuteOutcome::Exception {
            cause: FaultCode::PrivilegeError,
            clocks: cost,
        }
    } else {
        ExecuteOutcome::Retired { clocks: cost }
    }
}

/// `TRAPxx n`.
pub(super) fn trap(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let Some(condition) = Condition::from_trap_code(instr.subtype) else {
        return reserved(state, instr, "TRAP condition code below 4");
    };
    if condition.holds(state.arch.sr()) {
        ExecuteOutcome::Trap {
            trap_number: instr.n,
            clocks: clocks(CycleCostKind::TrapIssue),
        }
    } else {
        retired(CycleCostKind::TrapIssue)
    }
}

/// `DO`: the hardware loop is not emulated; the core latches a terminal fault.
pub(super) fn hardware_loop(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    tracing::error!(
        opcode = format_args!("{:#06x}", instr.opcode),
        pc = state.arch.pc(),
        "DO instruction executed; halting core"
    );
    ExecuteOutcome::Fatal {
        cause: FaultCode::UnsupportedHardwareLoop,
    }
}
