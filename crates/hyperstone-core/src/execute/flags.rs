//! Condition-flag updates for the different instruction classes.

use crate::state::registers::{SR_C, SR_N, SR_V, SR_Z};
use crate::state::ArchitecturalState;

/// Describes how `SR` condition flags change after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsUpdate {
    /// No change.
    #[default]
    None,
    /// Logic class: only `Z`.
    Zero { zero: bool },
    /// Moves, `MUL` and `TESTLZ`-style results: `Z` and `N`.
    ZeroNegative { zero: bool, negative: bool },
    /// Division: `Z`, `N` and `V`.
    ZeroNegativeOverflow {
        zero: bool,
        negative: bool,
        overflow: bool,
    },
    /// Shifts: `Z`, `N`, `C`, and `V` for left shifts only.
    Shift {
        zero: bool,
        negative: bool,
        carry: bool,
        overflow: Option<bool>,
    },
    /// Add/subtract class: all of `Z`, `N`, `C`, `V`.
    Arithmetic {
        zero: bool,
        negative: bool,
        carry: bool,
        overflow: bool,
    },
}

impl FlagsUpdate {
    /// Writes the described flags into `SR`.
    pub fn apply(self, arch: &mut ArchitecturalState) {
        match self {
            Self::None => {}
            Self::Zero { zero } => arch.set_flag(SR_Z, zero),
            Self::ZeroNegative { zero, negative } => {
                arch.set_flag(SR_Z, zero);
                arch.set_flag(SR_N, negative);
            }
            Self::ZeroNegativeOverflow {
                zero,
                negative,
                overflow,
            } => {
                arch.set_flag(SR_Z, zero);
                arch.set_flag(SR_N, negative);
                arch.set_flag(SR_V, overflow);
            }
            Self::Shift {
                zero,
                negative,
                carry,
                overflow,
            } => {
                arch.set_flag(SR_Z, zero);
                arch.set_flag(SR_N, negative);
                arch.set_flag(SR_C, carry);
                if let Some(overflow) = overflow {
                    arch.set_flag(SR_V, overflow);
                }
            }
            Self::Arithmetic {
                zero,
                negative,
                carry,
                overflow,
            } => {
                arch.set_flag(SR_Z, zero);
                arch.set_flag(SR_N, negative);
                arch.set_flag(SR_C, carry);
                arch.set_flag(SR_V, overflow);
            }
        }
    }

    /// `V` as reported by this update, when it carries one.
    pub const fn overflow(self) -> bool {
        match self {
            Self::Arithmetic { overflow, .. } | Self::ZeroNegativeOverflow { overflow, .. } => {
                overflow
            }
            Self::Shift {
                overflow: Some(overflow),
                ..
            } => overflow,
            _ => false,
        }
    }
}

/// `Z` and `N` of a 32-bit result.
pub const fn zero_negative(result: u32) -> FlagsUpdate {
    FlagsUpdate::ZeroNegative {
        zero: result == 0,
        negative: result & 0x8000_0000 != 0,
    }
}

/// `a + b + carry_in` with carry-out and signed overflow.
pub fn add_with_flags(a: u32, b: u32, carry_in: u32) -> (u32, FlagsUpdate) {
    let wide = u64::from(a) + u64::from(b) + u64::from(carry_in & 1);
    let result = wide as u32;
    let overflow = ((a ^ result) & (b ^ result)) & 0x8000_0000 != 0;
    (
        result,
        FlagsUpdate::Arithmetic {
            zero: result == 0,
            negative: result & 0x8000_0000 != 0,
            carry: wide >> 32 != 0,
            overflow,
        },
    )
}

/// `a - b - borrow_in` with borrow-out in `C` and signed overflow.
pub fn sub_with_flags(a: u32, b: u32, borrow_in: u32) -> (u32, FlagsUpdate) {
    let wide = u64::from(a)
        .wrapping_sub(u64::from(b))
        .wrapping_sub(u64::from(borrow_in & 1));
    let result = wide as u32;
    let overflow = ((a ^ b) & (a ^ result)) & 0x8000_0000 != 0;
    (
        result,
        FlagsUpdate::Arithmetic {
            zero: result == 0,
            negative: result & 0x8000_0000 != 0,
            carry: (wide >> 32) & 1 != 0,
            overflow,
        },
    )
}

/// `CMP`/`CMPI`: `N` reports a signed less-than rather than the raw sign bit.
pub fn compare_flags(dst: u32, src: u32) -> FlagsUpdate {
    let (_, flags) = sub_with_flags(dst, src, 0);
    match flags {
        FlagsUpdate::Arithmetic {
            zero,
            carry,
            overflow,
            ..
        } => FlagsUpdate::Arithmetic {
            zero,
            negative: (dst as i32) < (src as i32),
            carry,
            overflow,
        },
        other => other,
    }
}
