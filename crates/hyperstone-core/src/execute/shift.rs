//! Single and double-word shifts, `ROL` and `TESTLZ`.

use super::flags::FlagsUpdate;
use super::helpers::{read_operand, retired, write_operand};
use super::ExecuteOutcome;
use crate::decoder::DecodedInstruction;
use crate::timing::CycleCostKind;
use crate::CoreState;

/// Shift direction and fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Right,
    ArithmeticRight,
    Left,
}

/// Where the shift count comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftCount {
    /// `n` field of the instruction.
    Immediate,
    /// Low five bits of the local source register.
    Register,
}

/// `V` of `SHL`/`ROL`: some bit shifted past bit 31 differs from the new sign.
fn left_shift_overflow(value: u32, count: u32) -> bool {
    if count == 0 {
        return false;
    }
    let top = value >> (32 - count);
    let mask = (1u32 << count) - 1;
    let negative = (value << count) & 0x8000_0000 != 0;
    (top != 0 && !negative) || (top != mask && negative)
}

fn shift_word(value: u32, count: u32, kind: ShiftKind) -> (u32, FlagsUpdate) {
    let (result, carry, overflow) = match (kind, count) {
        (ShiftKind::Left, 0) => (value, false, Some(false)),
        (_, 0) => (value, false, None),
        (ShiftKind::Right, n) => (value >> n, (value >> (n - 1)) & 1 != 0, None),
        (ShiftKind::ArithmeticRight, n) => (
            ((value as i32) >> n) as u32,
            (value >> (n - 1)) & 1 != 0,
            None,
        ),
        (ShiftKind::Left, n) => {
            (
                value << n,
                (value >> (32 - n)) & 1 != 0,
                Some(left_shift_overflow(value, n)),
            )
        }
    };
    (
        result,
        FlagsUpdate::Shift {
            zero: result == 0,
            negative: result & 0x8000_0000 != 0,
            carry,
            overflow,
        },
    )
}

fn shift_double(value: u64, count: u32, kind: ShiftKind) -> (u64, FlagsUpdate) {
    let (result, carry, overflow) = match (kind, count) {
        (ShiftKind::Left, 0) => (value, false, Some(false)),
        (_, 0) => (value, false, None),
        (ShiftKind::Right, n) => (value >> n, (value >> (n - 1)) & 1 != 0, None),
        (ShiftKind::ArithmeticRight, n) => (
            ((value as i64) >> n) as u64,
            (value >> (n - 1)) & 1 != 0,
            None,
        ),
        (ShiftKind::Left, n) => {
            let result = value << n;
            let lost = ((result as i64) >> n) as u64 != value;
            (result, (value >> (64 - n)) & 1 != 0, Some(lost))
        }
    };
    (
        result,
        FlagsUpdate::Shift {
            zero: result == 0,
            negative: result & 0x8000_0000_0000_0000 != 0,
            carry,
            overflow,
        },
    )
}

/// `SHRI`, `SARI`, `SHLI`, `SHR`, `SAR`, `SHL`.
pub(super) fn single(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    kind: ShiftKind,
    count: ShiftCount,
) -> ExecuteOutcome {
    let count = match count {
        ShiftCount::Immediate => u32::from(instr.n),
        ShiftCount::Register => read_operand(state, instr.src) & 0x1F,
    };
    let value = read_operand(state, instr.dst);
    let (result, flags) = shift_word(value, count, kind);
    write_operand(state, instr.dst, result);
    flags.apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

/// `SHRDI`, `SARDI`, `SHLDI`, `SHRD`, `SARD`, `SHLD` on the local pair `Ld:Ldf`.
pub(super) fn double(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    kind: ShiftKind,
    count: ShiftCount,
) -> ExecuteOutcome {
    let (high_reg, low_reg) = (instr.dst, instr.dst.next());
    let count = match count {
        ShiftCount::Immediate => u32::from(instr.n),
        ShiftCount::Register => {
            if instr.src == high_reg || instr.src == low_reg {
                tracing::warn!(
                    opcode = format_args!("{:#06x}", instr.opcode),
                    pc = state.arch.pc(),
                    "double shift count aliases its operand pair; ignored"
                );
                state.diag.record_reserved();
                return retired(CycleCostKind::Alu);
            }
            read_operand(state, instr.src) & 0x1F
        }
    };
    let high = read_operand(state, high_reg);
    let low = read_operand(state, low_reg);
    let value = (u64::from(high) << 32) | u64::from(low);
    let (result, flags) = shift_double(value, count, kind);
    write_operand(state, high_reg, (result >> 32) as u32);
    write_operand(state, low_reg, result as u32);
    flags.apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

/// `ROL Ld, Ls`: `C` is cleared and `V` follows the `SHL` rule.
pub(super) fn rotate_left(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let count = read_operand(state, instr.src) & 0x1F;
    let value = read_operand(state, instr.dst);
    let result = value.rotate_left(count);
    let overflow = left_shift_overflow(value, count);
    write_operand(state, instr.dst, result);
    FlagsUpdate::Shift {
        zero: result == 0,
        negative: result & 0x8000_0000 != 0,
        carry: false,
        overflow: Some(overflow),
    }
    .apply(&mut state.arch);
    retired(CycleCostKind::Alu)
}

/// `TESTLZ Ld, Ls`: count of leading zero bits, flags untouched.
pub(super) fn test_leading_zeros(
    state: &mut CoreState,
    instr: &DecodedInstruction,
) -> ExecuteOutcome {
    let zeros = read_operand(state, instr.src).leading_zeros();
    write_operand(state, instr.dst, zeros);
    retired(CycleCostKind::TestLeadingZeros)
}
