//! Multiplier: `MUL`, `MULU`, `MULS` and the `EXTEND` DSP operations.
//!
//! `EXTEND` results land in the `G14:G15` accumulator pair.

use super::flags::{zero_negative, FlagsUpdate};
use super::helpers::{read_operand, reserved, retired, write_operand};
use super::ExecuteOutcome;
use crate::decoder::DecodedInstruction;
use crate::state::registers::{MAC_HIGH_REGISTER, MAC_LOW_REGISTER};
use crate::timing::{clocks, CycleCostKind};
use crate::CoreState;

/// `EXTEND` function codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendFunction {
    /// Low word of the signed product.
    Multiply,
    /// 64-bit unsigned product.
    MultiplyUnsigned,
    /// 64-bit signed product.
    MultiplySigned,
    MultiplyAccumulate,
    MultiplyAccumulateDouble,
    MultiplySubtract,
    MultiplySubtractDouble,
    HalfMultiplyAccumulate,
    HalfMultiplyAccumulateDouble,
    ComplexMultiply,
    ComplexMultiplyAccumulate,
    ComplexSum,
    ComplexFft,
    ComplexFftScaled,
}

impl ExtendFunction {
    /// Decodes the `EXTEND` extension word.
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0x100 | 0x102 => Some(Self::Multiply),
            0x104 => Some(Self::MultiplyUnsigned),
            0x106 => Some(Self::MultiplySigned),
            0x10A => Some(Self::MultiplyAccumulate),
            0x10E => Some(Self::MultiplyAccumulateDouble),
            0x11A => Some(Self::MultiplySubtract),
            0x11E => Some(Self::MultiplySubtractDouble),
            0x02A => Some(Self::HalfMultiplyAccumulate),
            0x02E => Some(Self::HalfMultiplyAccumulateDouble),
            0x046 => Some(Self::ComplexMultiply),
            0x04E => Some(Self::ComplexMultiplyAccumulate),
            0x086 => Some(Self::ComplexSum),
            0x096 => Some(Self::ComplexFft),
            0x296 => Some(Self::ComplexFftScaled),
            _ => None,
        }
    }
}

const fn fits_i16(value: u32) -> bool {
    let value = value as i32;
    value >= i16::MIN as i32 && value <= i16::MAX as i32
}

fn illegal_operands(instr: &DecodedInstruction) -> bool {
    instr.src.is_pc() || instr.src.is_sr() || instr.dst.is_pc() || instr.dst.is_sr()
}

/// `MUL Rd, Rs`: low 32 bits of the product.
pub(super) fn mul(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    if illegal_operands(instr) {
        return reserved(state, instr, "MUL with PC or SR operand");
    }
    let lhs = read_operand(state, instr.dst);
    let rhs = read_operand(state, instr.src);
    let result = lhs.wrapping_mul(rhs);
    write_operand(state, instr.dst, result);
    zero_negative(result).apply(&mut state.arch);

    let kind = if fits_i16(lhs) && fits_i16(rhs) {
        CycleCostKind::MulShort
    } else {
        CycleCostKind::MulLong
    };
    retired(kind)
}

/// `MULU`/`MULS Rd, Rs`: 64-bit product into `Rd:Rdf`.
pub(super) fn mul_double(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    signed: bool,
) -> ExecuteOutcome {
    if illegal_operands(instr) {
        return reserved(state, instr, "MULU/MULS with PC or SR operand");
    }
    let lhs = read_operand(state, instr.dst);
    let rhs = read_operand(state, instr.src);
    let (product, short) = if signed {
        let product = i64::from(lhs as i32) * i64::from(rhs as i32);
        (product as u64, fits_i16(lhs) && fits_i16(rhs))
    } else {
        let product = u64::from(lhs) * u64::from(rhs);
        (product, lhs <= 0xFFFF && rhs <= 0xFFFF)
    };
    write_operand(state, instr.dst, (product >> 32) as u32);
    write_operand(state, instr.dst.next(), product as u32);
    FlagsUpdate::ZeroNegative {
        zero: product == 0,
        negative: product & 0x8000_0000_0000_0000 != 0,
    }
    .apply(&mut state.arch);

    retired(if short {
        CycleCostKind::MulDoubleShort
    } else {
        CycleCostKind::MulDoubleLong
    })
}

fn accumulator(state: &CoreState) -> u64 {
    (u64::from(state.arch.global(MAC_HIGH_REGISTER)) << 32)
        | u64::from(state.arch.global(MAC_LOW_REGISTER))
}

fn set_accumulator(state: &mut CoreState, value: u64) {
    state.arch.set_global(MAC_HIGH_REGISTER, (value >> 32) as u32);
    state.arch.set_global(MAC_LOW_REGISTER, value as u32);
}

/// Signed high and low half-words of a packed complex value.
const fn halves(value: u32) -> (i32, i32) {
    ((value >> 16) as i16 as i32, value as i16 as i32)
}

const fn pack(high: i32, low: i32) -> u32 {
    ((high as u32 & 0xFFFF) << 16) | (low as u32 & 0xFFFF)
}

/// `EXTEND Ld, Ls, func`.
pub(super) fn extend(state: &mut CoreState, instr: &DecodedInstruction) -> ExecuteOutcome {
    let Some(function) = ExtendFunction::from_code(instr.immediate) else {
        return reserved(state, instr, "unknown EXTEND function");
    };
    let vals = read_operand(state, instr.src);
    let vald = read_operand(state, instr.dst);
    let signed_product = i64::from(vals as i32) * i64::from(vald as i32);
    let (s_high, s_low) = halves(vals);
    let (d_high, d_low) = halves(vald);
    let half_sum = i64::from(s_high * d_high) + i64::from(s_low * d_low);

    match function {
        ExtendFunction::Multiply => {
            state
                .arch
                .set_global(MAC_LOW_REGISTER, vals.wrapping_mul(vald));
        }
        ExtendFunction::MultiplyUnsigned => {
            set_accumulator(state, u64::from(vals) * u64::from(vald));
        }
        ExtendFunction::MultiplySigned => set_accumulator(state, signed_product as u64),
        ExtendFunction::MultiplyAccumulate => {
            let low = state.arch.global(MAC_LOW_REGISTER);
            state
                .arch
                .set_global(MAC_LOW_REGISTER, low.wrapping_add(signed_product as u32));
        }
        ExtendFunction::MultiplyAccumulateDouble => {
            let acc = accumulator(state).wrapping_add(signed_product as u64);
            set_accumulator(state, acc);
        }
        ExtendFunction::MultiplySubtract => {
            let low = state.arch.global(MAC_LOW_REGISTER);
            state
                .arch
                .set_global(MAC_LOW_REGISTER, low.wrapping_sub(signed_product as u32));
        }
        ExtendFunction::MultiplySubtractDouble => {
            let acc = accumulator(state).wrapping_sub(signed_product as u64);
            set_accumulator(state, acc);
        }
        ExtendFunction::HalfMultiplyAccumulate => {
            let low = state.arch.global(MAC_LOW_REGISTER);
            state
                .arch
                .set_global(MAC_LOW_REGISTER, low.wrapping_add(half_sum as u32));
        }
        ExtendFunction::HalfMultiplyAccumulateDouble => {
            let acc = accumulator(state).wrapping_add(half_sum as u64);
            set_accumulator(state, acc);
        }
        ExtendFunction::ComplexMultiply | ExtendFunction::ComplexMultiplyAccumulate => {
            let real = (d_high * s_high).wrapping_sub(d_low * s_low);
            let imaginary = (d_high * s_low).wrapping_add(d_low * s_high);
            let (real, imaginary) = if function == ExtendFunction::ComplexMultiplyAccumulate {
                (
                    (state.arch.global(MAC_HIGH_REGISTER) as i32).wrapping_add(real),
                    (state.arch.global(MAC_LOW_REGISTER) as i32).wrapping_add(imaginary),
                )
            } else {
                (real, imaginary)
            };
            state.arch.set_global(MAC_HIGH_REGISTER, real as u32);
            state.arch.set_global(MAC_LOW_REGISTER, imaginary as u32);
        }
        ExtendFunction::ComplexSum
        | ExtendFunction::ComplexFft
        | ExtendFunction::ComplexFftScaled => {
            let mut b_real = state.arch.global(MAC_HIGH_REGISTER) as i32;
            let mut b_imaginary = state.arch.global(MAC_LOW_REGISTER) as i32;
            if function != ExtendFunction::ComplexSum {
                b_real >>= 15;
                b_imaginary >>= 15;
            }
            let scale = u32::from(function == ExtendFunction::ComplexFftScaled);
            let sum = pack(
                s_high.wrapping_add(b_real) >> scale,
                s_low.wrapping_add(b_imaginary) >> scale,
            );
            let difference = pack(
                s_high.wrapping_sub(b_real) >> scale,
                s_low.wrapping_sub(b_imaginary) >> scale,
            );
            state.arch.set_global(MAC_HIGH_REGISTER, sum);
            state.arch.set_global(MAC_LOW_REGISTER, difference);
        }
    }

    ExecuteOutcome::Retired {
        clocks: clocks(CycleCostKind::Extend),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{decode, TestBus};
    use super::super::{execute_instruction, ExecuteOutcome};
    use super::ExtendFunction;
    use crate::state::registers::{MAC_HIGH_REGISTER, MAC_LOW_REGISTER, SR_N, SR_Z};
    use crate::CoreState;

    fn run(state: &mut CoreState, words: &[u16]) -> ExecuteOutcome {
        let instr = decode(state, words);
        execute_instruction(state, &mut TestBus::default(), &instr)
    }

    #[test]
    fn mul_cost_depends_on_operand_width() {
        let mut state = CoreState::default();
        state.arch.set_global(3, 0xFFFF_FFFE);
        state.arch.set_global(4, 3);

        // MUL G3, G4
        let outcome = run(&mut state, &[0xBC34]);
        assert_eq!(state.arch.global(3), 0xFFFF_FFFA);
        assert!(state.arch.flag(SR_N));
        assert_eq!(outcome, ExecuteOutcome::Retired { clocks: 3 });

        state.arch.set_global(3, 0x0001_0000);
        let outcome = run(&mut state, &[0xBC34]);
        assert_eq!(outcome, ExecuteOutcome::Retired { clocks: 5 });
    }

    #[test]
    fn mulu_and_muls_write_64_bit_products() {
        let mut state = CoreState::default();
        state.arch.set_global(4, 0xFFFF_FFFF);
        state.arch.set_global(6, 2);

        // MULU G4, G6
        let outcome = run(&mut state, &[0xB046]);
        assert_eq!(state.arch.global(4), 1);
        assert_eq!(state.arch.global(5), 0xFFFF_FFFE);
        assert_eq!(outcome, ExecuteOutcome::Retired { clocks: 6 });

        state.arch.set_global(4, 0xFFFF_FFFF);
        // MULS G4, G6
        let outcome = run(&mut state, &[0xB446]);
        assert_eq!(state.arch.global(4), 0xFFFF_FFFF);
        assert_eq!(state.arch.global(5), 0xFFFF_FFFE);
        assert!(state.arch.flag(SR_N));
        assert!(!state.arch.flag(SR_Z));
        assert_eq!(outcome, ExecuteOutcome::Retired { clocks: 4 });
    }

    #[test]
    fn extend_codes_decode() {
        assert_eq!(
            ExtendFunction::from_code(0x100),
            Some(ExtendFunction::Multiply)
        );
        assert_eq!(
            ExtendFunction::from_code(0x296),
            Some(ExtendFunction::ComplexFftScaled)
        );
        assert_eq!(ExtendFunction::from_code(0x001), None);
    }

    #[test]
    fn emacd_accumulates_signed_product() {
        let mut state = CoreState::default();
        state.arch.set_local(1, 0xFFFF_FFFF);
        state.arch.set_local(2, 5);
        state.arch.set_global(MAC_HIGH_REGISTER, 0);
        state.arch.set_global(MAC_LOW_REGISTER, 10);

        // EXTEND L1, L2, EMACD
        run(&mut state, &[0xCE12, 0x010E]);

        assert_eq!(state.arch.global(MAC_HIGH_REGISTER), 0);
        assert_eq!(state.arch.global(MAC_LOW_REGISTER), 5);
    }

    #[test]
    fn ehmac_sums_half_word_products() {
        let mut state = CoreState::default();
        state.arch.set_local(1, 0x0002_0003);
        state.arch.set_local(2, 0x0004_FFFF);
        state.arch.set_global(MAC_LOW_REGISTER, 1);

        // EXTEND L1, L2, EHMAC
        run(&mut state, &[0xCE12, 0x002A]);

        assert_eq!(state.arch.global(MAC_LOW_REGISTER), 1 + 8 - 3);
    }

    #[test]
    fn unknown_extend_function_is_ignored() {
        let mut state = CoreState::default();
        state.arch.set_global(MAC_LOW_REGISTER, 7);

        run(&mut state, &[0xCE12, 0x0001]);

        assert_eq!(state.arch.global(MAC_LOW_REGISTER), 7);
        assert_eq!(state.diag.reserved_count, 1);
    }
}
