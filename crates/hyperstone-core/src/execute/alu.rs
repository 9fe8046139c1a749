//! Register/immediate arithmetic, logic, compare, move and `SETxx` handlers.

use super::flags::{add_with_flags, compare_flags, sub_with_flags, zero_negative, FlagsUpdate};
use super::helpers::{
    arithmetic_source, read_operand, reserved, retired, source_or_zero, write_operand,
    write_result,
};
use super::ExecuteOutcome;
use crate::decoder::DecodedInstruction;
use crate::encoding::Condition;
use crate::state::registers::{SR_H, SR_S, SR_V, SR_Z};
use crate::timing::{clocks, CycleCostKind};
use crate::{CoreState, FaultCode};

/// Arithmetic operation of the two-register add/subtract class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    AddSigned,
    AddCarry,
    Sub,
    SubSigned,
    SubCarry,
}

/// Bitwise operation shared by register and immediate forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    AndNot,
    Or,
    Xor,
}

impl LogicOp {
    const fn apply(self, dst: u32, src: u32) -> u32 {
        match self {
            Self::And => dst & src,
            Self::AndNot => dst & !src,
            Self::Or => dst | src,
            Self::Xor => dst ^ src,
        }
    }
}

fn range_error() -> ExecuteOutcome {
    ExecuteOutcome::Exception {
        cause: FaultCode::RangeError,
        clocks: clocks(CycleCostKind::Alu),
    }
}

fn privilege_error() -> ExecuteOutcome {
    ExecuteOutcome::Exception {
        cause: FaultCode::PrivilegeError,
        clocks: clocks(CycleCostKind::Alu),
    }
}

/// `MOV`/`MOVI` into a global register while `H` is set requires supervisor state.
fn high_global_write_denied(state: &CoreState, instr: &DecodedInstruction) -> bool {
    !instr.dst.is_local() && state.arch.flag(SR_H) && !state.arch.flag(SR_S)
}

pub(super) fn chk(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let value = read_operand(state, instr.dst);
    let out_of_range = if instr.src.is_sr() {
        value == 0
    } else {
        let bound = read_operand(state, instr.src);
        if instr.src.is_pc() {
            value >= bound
        } else {
            value > bound
        }
    };
    if out_of_range {
        range_error()
    } else {
        retired(CycleCostKind::Alu)
    }
}

pub(super) fn movd(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    if instr.dst.is_sr() {
        return reserved(state, instr, "MOVD into SR");
    }
    let (high, low) = if instr.src.is_sr() {
        (0, 0)
    } else {
        let high = read_operand(state, instr.src);
        (high, read_operand(state, instr.src.next()))
    };
    write_operand(state, instr.dst, high);
    write_operand(state, instr.dst.next(), low);
    FlagsUpdate::ZeroNegative {
        zero: high == 0 && low == 0,
        negative: high & 0x8000_0000 != 0,
    }
    .apply(&mut state.arch);
    retired(CycleCostKind::MoveDouble)
}

pub(super) fn divide(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    signed: bool,
) -> ExecuteOutcome {
    let (dst, dst_low, src) = (instr.dst, instr.dst.next(), instr.src);
    if src == dst || src == dst_low || src.is_pc() || src.is_sr() {
        return reserved(state, instr, "DIV operand aliases its destination pair");
    }
    let divisor = read_operand(state, src);
    let high = read_operand(state, dst);
    let low = read_operand(state, dst_low);
    let dividend = (u64::from(high) << 32) | u64::from(low);

    let result = if signed {
        signed_divide(dividend as i64, divisor as i32)
    } else {
        unsigned_divide(dividend, divisor)
    };

    let cost = clocks(CycleCostKind::Divide);
    match result {
        Some((quotient, remainder)) => {
            write_operand(state, dst, remainder);
            write_operand(state, dst_low, quotient);
            FlagsUpdate::ZeroNegativeOverflow {
                zero: quotient == 0,
                negative: quotient & 0x8000_0000 != 0,
                overflow: false,
            }
            .apply(&mut state.arch);
            ExecuteOutcome::Retired { clocks: cost }
        }
        None => {
            state.arch.set_flag(SR_V, true);
            ExecuteOutcome::Exception {
                cause: FaultCode::RangeError,
                clocks: cost,
            }
        }
    }
}

fn unsigned_divide(dividend: u64, divisor: u32) -> Option<(u32, u32)> {
    if divisor == 0 {
        return None;
    }
    let quotient = u32::try_from(dividend / u64::from(divisor)).ok()?;
    let remainder = (dividend % u64::from(divisor)) as u32;
    Some((quotient, remainder))
}

fn signed_divide(dividend: i64, divisor: i32) -> Option<(u32, u32)> {
    if divisor == 0 || dividend < 0 {
        return None;
    }
    let quotient = i32::try_from(dividend / i64::from(divisor)).ok()?;
    let remainder = (dividend % i64::from(divisor)) as i32;
    Some((quotient as u32, remainder as u32))
}

pub(super) fn xm(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    if instr.src.is_sr() || instr.dst.is_pc() || instr.dst.is_sr() {
        return reserved(state, instr, "XM with PC or SR operand");
    }
    let index = read_operand(state, instr.src);
    let limit = instr.immediate;
    let (shift, checked) = match instr.subtype {
        sub @ 0..=3 => (sub, true),
        sub => (sub - 4, false),
    };
    write_operand(state, instr.dst, index << shift);

    let exceeded = if instr.src.is_pc() {
        index >= limit
    } else {
        index > limit
    };
    if checked && exceeded {
        range_error()
    } else {
        retired(CycleCostKind::Alu)
    }
}

pub(super) fn mask(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let value = read_operand(state, instr.src) & instr.immediate;
    write_result(state, instr.dst, value);
    FlagsUpdate::Zero { zero: value == 0 }.apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

pub(super) fn sum(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    trap_on_overflow: bool,
) -> ExecuteOutcome {
    let operand = arithmetic_source(state, instr.src);
    let (result, flags) = add_with_flags(operand, instr.immediate, 0);
    write_result(state, instr.dst, result);
    flags.apply(&mut state.arch);
    if trap_on_overflow && flags.overflow() && !instr.src.is_sr() {
        range_error()
    } else {
        retired(CycleCostKind::Alu)
    }
}

pub(super) fn cmp(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let lhs = read_operand(state, instr.dst);
    let rhs = arithmetic_source(state, instr.src);
    compare_flags(lhs, rhs).apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

pub(super) fn mov(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    if high_global_write_denied(state, instr) {
        return privilege_error();
    }
    let value = read_operand(state, instr.src);
    write_result(state, instr.dst, value);
    zero_negative(value).apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

pub(super) fn arithmetic(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    op: ArithOp,
) -> ExecuteOutcome {
    let lhs = read_operand(state, instr.dst);
    let previous_zero = state.arch.flag(SR_Z);
    let carry = state.arch.carry();
    let (result, flags) = match op {
        ArithOp::Add | ArithOp::AddSigned => {
            let rhs = arithmetic_source(state, instr.src);
            add_with_flags(lhs, rhs, 0)
        }
        ArithOp::AddCarry => {
            let rhs = source_or_zero(state, instr.src);
            add_with_flags(lhs, rhs, carry)
        }
        ArithOp::Sub | ArithOp::SubSigned => {
            let rhs = arithmetic_source(state, instr.src);
            sub_with_flags(lhs, rhs, 0)
        }
        ArithOp::SubCarry => {
            let rhs = source_or_zero(state, instr.src);
            sub_with_flags(lhs, rhs, carry)
        }
    };
    let flags = match (op, flags) {
        (ArithOp::AddCarry | ArithOp::SubCarry, FlagsUpdate::Arithmetic {
            zero,
            negative,
            carry,
            overflow,
        }) => FlagsUpdate::Arithmetic {
            zero: zero && previous_zero,
            negative,
            carry,
            overflow,
        },
        (_, flags) => flags,
    };

    write_result(state, instr.dst, result);
    flags.apply(&mut state.arch);

    let traps = matches!(op, ArithOp::AddSigned | ArithOp::SubSigned);
    if traps && flags.overflow() && !instr.src.is_sr() {
        range_error()
    } else {
        retired(CycleCostKind::Alu)
    }
}

pub(super) fn negate(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    trap_on_overflow: bool,
) -> ExecuteOutcome {
    let operand = arithmetic_source(state, instr.src);
    let (result, flags) = sub_with_flags(0, operand, 0);
    write_result(state, instr.dst, result);
    flags.apply(&mut state.arch);
    if trap_on_overflow && flags.overflow() && !instr.src.is_sr() {
        range_error()
    } else {
        retired(CycleCostKind::Alu)
    }
}

pub(super) fn logic(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    op: LogicOp,
) -> ExecuteOutcome {
    let lhs = read_operand(state, instr.dst);
    let rhs = read_operand(state, instr.src);
    let result = op.apply(lhs, rhs);
    write_result(state, instr.dst, result);
    FlagsUpdate::Zero { zero: result == 0 }.apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

pub(super) fn not(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let result = !read_operand(state, instr.src);
    write_result(state, instr.dst, result);
    FlagsUpdate::Zero { zero: result == 0 }.apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

/// `CMPB`: `Z` is set when no bit of the mask is present.
pub(super) fn cmpb(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let lhs = read_operand(state, instr.dst);
    let rhs = read_operand(state, instr.src);
    FlagsUpdate::Zero {
        zero: lhs & rhs == 0,
    }
    .apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

pub(super) fn cmpi(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let lhs = read_operand(state, instr.dst);
    compare_flags(lhs, instr.immediate).apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

pub(super) fn movi(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    if high_global_write_denied(state, instr) {
        return privilege_error();
    }
    write_result(state, instr.dst, instr.immediate);
    zero_negative(instr.immediate).apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

/// `ADDI`/`ADDSI`; `n = 0` adds the round-to-even carry `C & (!Z | Rd[0])`.
pub(super) fn addi(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    trap_on_overflow: bool,
) -> ExecuteOutcome {
    let lhs = read_operand(state, instr.dst);
    let addend = if instr.n == 0 {
        let not_zero = u32::from(!state.arch.flag(SR_Z));
        state.arch.carry() & (not_zero | (lhs & 1))
    } else {
        instr.immediate
    };
    let (result, flags) = add_with_flags(lhs, addend, 0);
    write_result(state, instr.dst, result);
    flags.apply(&mut state.arch);
    if trap_on_overflow && flags.overflow() {
        range_error()
    } else {
        retired(CycleCostKind::Alu)
    }
}

/// `CMPBI`; `n = 0` tests whether any byte of `Rd` is zero.
pub(super) fn cmpbi(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let value = read_operand(state, instr.dst);
    let zero = if instr.n == 0 {
        value.to_be_bytes().contains(&0)
    } else {
        value & instr.immediate == 0
    };
    FlagsUpdate::Zero { zero }.apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

pub(super) fn logic_immediate(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    op: LogicOp,
) -> ExecuteOutcome {
    let lhs = read_operand(state, instr.dst);
    let result = op.apply(lhs, instr.immediate);
    write_result(state, instr.dst, result);
    FlagsUpdate::Zero { zero: result == 0 }.apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

/// `SETxx`: `n` selects the condition or one of the constant forms.
pub(super) fn set(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    if instr.dst.is_pc() || instr.dst.is_sr() {
        return reserved(state, instr, "SET into PC or SR");
    }
    let all_ones = instr.n >= 16;
    let value = match instr.n {
        0 => frame_stack_address(state),
        1 | 16 | 17 => return reserved(state, instr, "reserved SET selector"),
        2 => 1,
        3 | 19 => 0,
        18 => 0xFFFF_FFFF,
        n => {
            let holds = Condition::from_set_selector(n & 0x0F)
                .is_some_and(|condition| condition.holds(state.arch.sr()));
            match (holds, all_ones) {
                (false, _) => 0,
                (true, true) => 0xFFFF_FFFF,
                (true, false) => 1,
            }
        }
    };
    write_operand(state, instr.dst, value);
    retired(CycleCostKind::Alu)
}

/// `SETADR`: memory address of the current frame on the register stack.
fn frame_stack_address(state: &CoreState) -> u32 {
    let sp = state.arch.sp();
    let fp = state.arch.fp();
    let base = (sp & 0xFFFF_FE00) | (fp << 2);
    if sp & 0x100 != 0 && fp & 0x40 == 0 {
        base.wrapping_add(0x200)
    } else {
        base
    }
}
