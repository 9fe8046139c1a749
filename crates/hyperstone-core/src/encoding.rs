//! Opcode classification keyed on the high byte of the instruction word.

use crate::state::registers::{SR_C, SR_N, SR_V, SR_Z};

/// Branch, trap and set conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// `V` set.
    Overflow,
    /// `V` clear.
    NoOverflow,
    /// `Z` set.
    Equal,
    /// `Z` clear.
    NotEqual,
    /// `C` set (also `ST`).
    Carry,
    /// `C` clear (also `HE`).
    NoCarry,
    /// `C` or `Z` set.
    SmallerOrEqual,
    /// `C` and `Z` clear.
    HigherThan,
    /// `N` set (also `LT`).
    Negative,
    /// `N` clear (also `GE`).
    NotNegative,
    /// `N` or `Z` set.
    LessOrEqual,
    /// `N` and `Z` clear.
    GreaterThan,
    /// Unconditional.
    Always,
    /// Never holds.
    Never,
}

impl Condition {
    /// Order shared by `DBxx` (`0xE0..0xEB`) and `Bxx` (`0xF0..0xFB`).
    const BRANCH_ORDER: [Self; 12] = [
        Self::Overflow,
        Self::NoOverflow,
        Self::Equal,
        Self::NotEqual,
        Self::Carry,
        Self::NoCarry,
        Self::SmallerOrEqual,
        Self::HigherThan,
        Self::Negative,
        Self::NotNegative,
        Self::LessOrEqual,
        Self::GreaterThan,
    ];

    /// Order of `SETxx` conditions for `n & 0xF` in `4..=15`.
    const SET_ORDER: [Self; 12] = [
        Self::LessOrEqual,
        Self::GreaterThan,
        Self::Negative,
        Self::NotNegative,
        Self::SmallerOrEqual,
        Self::HigherThan,
        Self::Carry,
        Self::NoCarry,
        Self::Equal,
        Self::NotEqual,
        Self::Overflow,
        Self::NoOverflow,
    ];

    /// Condition of a branch opcode's low nibble (`0..=11`).
    #[must_use]
    pub const fn from_branch_nibble(nibble: u8) -> Option<Self> {
        if (nibble as usize) < Self::BRANCH_ORDER.len() {
            Some(Self::BRANCH_ORDER[nibble as usize])
        } else {
            None
        }
    }

    /// Condition of a `TRAPxx` code (`4..=15`); codes below 4 are not traps.
    #[must_use]
    pub const fn from_trap_code(code: u8) -> Option<Self> {
        match code {
            4..=13 => Some(Self::SET_ORDER[(code - 4) as usize]),
            14 => Some(Self::Overflow),
            15 => Some(Self::Always),
            _ => None,
        }
    }

    /// Condition of a `SETxx` selector for `n & 0xF` in `4..=15`.
    #[must_use]
    pub const fn from_set_selector(selector: u8) -> Option<Self> {
        match selector {
            4..=15 => Some(Self::SET_ORDER[(selector - 4) as usize]),
            _ => None,
        }
    }

    /// Evaluates the condition against an `SR` value.
    #[must_use]
    pub const fn holds(self, sr: u32) -> bool {
        let c = sr & SR_C != 0;
        let z = sr & SR_Z != 0;
        let n = sr & SR_N != 0;
        let v = sr & SR_V != 0;
        match self {
            Self::Overflow => v,
            Self::NoOverflow => !v,
            Self::Equal => z,
            Self::NotEqual => !z,
            Self::Carry => c,
            Self::NoCarry => !c,
            Self::SmallerOrEqual => c || z,
            Self::HigherThan => !(c || z),
            Self::Negative => n,
            Self::NotNegative => !n,
            Self::LessOrEqual => n || z,
            Self::GreaterThan => !(n || z),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Operand layouts, each with a fixed number of possible extension words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandShape {
    /// Two registers, no extension.
    Rr,
    /// Two registers and a limit (1-2 words).
    RrLim,
    /// Two registers and a signed constant (1-2 words).
    RrConst,
    /// Two registers and a displacement with load/store sub-type (1-2 words).
    RrDis,
    /// Register and an encoded immediate (0-2 words).
    Rimm,
    /// Register and a 5-bit `n` field.
    Rn,
    /// Local register and a 5-bit `n` field.
    Ln,
    /// Two local registers.
    Ll,
    /// Two local registers and a function word.
    LlExt,
    /// Local address register and a global or local data register.
    Lr,
    /// Local window size, register and signed constant (1-2 words).
    LrConst,
    /// PC-relative displacement (0-1 words).
    PcRel,
    /// Trap number and condition packed into the instruction word.
    PcAdr,
    /// No operands.
    Bare,
}

/// Instruction families selected by the opcode high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum OpcodeEncoding {
    Chk,
    Movd,
    Divu,
    Divs,
    Xm,
    Mask,
    Sum,
    Sums,
    Cmp,
    Mov,
    Add,
    Adds,
    Cmpb,
    Andn,
    Or,
    Xor,
    Subc,
    Not,
    Sub,
    Subs,
    Addc,
    And,
    Neg,
    Negs,
    Cmpi,
    Movi,
    Addi,
    Addsi,
    Cmpbi,
    Andni,
    Ori,
    Xori,
    Shrdi,
    Shrd,
    Shr,
    Sardi,
    Sard,
    Sar,
    Shldi,
    Shld,
    Shl,
    Testlz,
    Rol,
    LoadDisplacement,
    LoadPostIncrement,
    StoreDisplacement,
    StorePostIncrement,
    Shri,
    Sari,
    Shli,
    Mulu,
    Muls,
    Set,
    Mul,
    Software,
    Extend,
    Do,
    LdwR,
    LddR,
    LdwP,
    LddP,
    StwR,
    StdR,
    StwP,
    StdP,
    DelayedBranch(Condition),
    Frame,
    Call,
    Branch(Condition),
    Trap,
    Reserved,
}

impl OpcodeEncoding {
    /// Operand layout consumed by the decoder for this family.
    #[must_use]
    pub const fn shape(self) -> OperandShape {
        match self {
            Self::Chk
            | Self::Movd
            | Self::Divu
            | Self::Divs
            | Self::Cmp
            | Self::Mov
            | Self::Add
            | Self::Adds
            | Self::Cmpb
            | Self::Andn
            | Self::Or
            | Self::Xor
            | Self::Subc
            | Self::Not
            | Self::Sub
            | Self::Subs
            | Self::Addc
            | Self::And
            | Self::Neg
            | Self::Negs
            | Self::Mulu
            | Self::Muls
            | Self::Mul => OperandShape::Rr,
            Self::Xm => OperandShape::RrLim,
            Self::Mask | Self::Sum | Self::Sums => OperandShape::RrConst,
            Self::LoadDisplacement
            | Self::LoadPostIncrement
            | Self::StoreDisplacement
            | Self::StorePostIncrement => OperandShape::RrDis,
            Self::Cmpi
            | Self::Movi
            | Self::Addi
            | Self::Addsi
            | Self::Cmpbi
            | Self::Andni
            | Self::Ori
            | Self::Xori => OperandShape::Rimm,
            Self::Shri | Self::Sari | Self::Shli | Self::Set => OperandShape::Rn,
            Self::Shrdi | Self::Sardi | Self::Shldi => OperandShape::Ln,
            Self::Shrd
            | Self::Shr
            | Self::Sard
            | Self::Sar
            | Self::Shld
            | Self::Shl
            | Self::Testlz
            | Self::Rol
            | Self::Software
            | Self::Frame => OperandShape::Ll,
            Self::Extend => OperandShape::LlExt,
            Self::LdwR
            | Self::LddR
            | Self::LdwP
            | Self::LddP
            | Self::StwR
            | Self::StdR
            | Self::StwP
            | Self::StdP => OperandShape::Lr,
            Self::Call => OperandShape::LrConst,
            Self::DelayedBranch(_) | Self::Branch(_) => OperandShape::PcRel,
            Self::Trap => OperandShape::PcAdr,
            Self::Do | Self::Reserved => OperandShape::Bare,
        }
    }
}

/// Classifies an opcode high byte into its instruction family.
#[must_use]
pub const fn classify_opcode(byte: u8) -> OpcodeEncoding {
    use OpcodeEncoding as E;

    match byte {
        0x00..=0x03 => E::Chk,
        0x04..=0x07 => E::Movd,
        0x08..=0x0B => E::Divu,
        0x0C..=0x0F => E::Divs,
        0x10..=0x13 => E::Xm,
        0x14..=0x17 => E::Mask,
        0x18..=0x1B => E::Sum,
        0x1C..=0x1F => E::Sums,
        0x20..=0x23 => E::Cmp,
        0x24..=0x27 => E::Mov,
        0x28..=0x2B => E::Add,
        0x2C..=0x2F => E::Adds,
        0x30..=0x33 => E::Cmpb,
        0x34..=0x37 => E::Andn,
        0x38..=0x3B => E::Or,
        0x3C..=0x3F => E::Xor,
        0x40..=0x43 => E::Subc,
        0x44..=0x47 => E::Not,
        0x48..=0x4B => E::Sub,
        0x4C..=0x4F => E::Subs,
        0x50..=0x53 => E::Addc,
        0x54..=0x57 => E::And,
        0x58..=0x5B => E::Neg,
        0x5C..=0x5F => E::Negs,
        0x60..=0x63 => E::Cmpi,
        0x64..=0x67 => E::Movi,
        0x68..=0x6B => E::Addi,
        0x6C..=0x6F => E::Addsi,
        0x70..=0x73 => E::Cmpbi,
        0x74..=0x77 => E::Andni,
        0x78..=0x7B => E::Ori,
        0x7C..=0x7F => E::Xori,
        0x80 | 0x81 => E::Shrdi,
        0x82 => E::Shrd,
        0x83 => E::Shr,
        0x84 | 0x85 => E::Sardi,
        0x86 => E::Sard,
        0x87 => E::Sar,
        0x88 | 0x89 => E::Shldi,
        0x8A => E::Shld,
        0x8B => E::Shl,
        0x8E => E::Testlz,
        0x8F => E::Rol,
        0x90..=0x93 => E::LoadDisplacement,
        0x94..=0x97 => E::LoadPostIncrement,
        0x98..=0x9B => E::StoreDisplacement,
        0x9C..=0x9F => E::StorePostIncrement,
        0xA0..=0xA3 => E::Shri,
        0xA4..=0xA7 => E::Sari,
        0xA8..=0xAB => E::Shli,
        0xB0..=0xB3 => E::Mulu,
        0xB4..=0xB7 => E::Muls,
        0xB8..=0xBB => E::Set,
        0xBC..=0xBF => E::Mul,
        0xC0..=0xCD => E::Software,
        0xCE => E::Extend,
        0xCF => E::Do,
        0xD0 | 0xD1 => E::LdwR,
        0xD2 | 0xD3 => E::LddR,
        0xD4 | 0xD5 => E::LdwP,
        0xD6 | 0xD7 => E::LddP,
        0xD8 | 0xD9 => E::StwR,
        0xDA | 0xDB => E::StdR,
        0xDC | 0xDD => E::StwP,
        0xDE | 0xDF => E::StdP,
        0xE0..=0xEB => match Condition::from_branch_nibble(byte & 0x0F) {
            Some(condition) => E::DelayedBranch(condition),
            None => E::Reserved,
        },
        0xEC => E::DelayedBranch(Condition::Always),
        0xED => E::Frame,
        0xEE | 0xEF => E::Call,
        0xF0..=0xFB => match Condition::from_branch_nibble(byte & 0x0F) {
            Some(condition) => E::Branch(condition),
            None => E::Reserved,
        },
        0xFC => E::Branch(Condition::Always),
        0xFD..=0xFF => E::Trap,
        0x8C | 0x8D | 0xAC..=0xAF => E::Reserved,
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_opcode, Condition, OpcodeEncoding, OperandShape};
    use crate::state::registers::{SR_C, SR_N, SR_V, SR_Z};
    use rstest::rstest;

    #[test]
    fn every_byte_classifies_and_reserved_slots_are_exact() {
        let reserved: Vec<u8> = (0u8..=0xFF)
            .filter(|byte| classify_opcode(*byte) == OpcodeEncoding::Reserved)
            .collect();
        assert_eq!(reserved, vec![0x8C, 0x8D, 0xAC, 0xAD, 0xAE, 0xAF]);
    }

    #[test]
    fn branch_families_carry_their_condition() {
        assert_eq!(
            classify_opcode(0xF2),
            OpcodeEncoding::Branch(Condition::Equal)
        );
        assert_eq!(
            classify_opcode(0xEC),
            OpcodeEncoding::DelayedBranch(Condition::Always)
        );
        assert_eq!(
            classify_opcode(0xEB),
            OpcodeEncoding::DelayedBranch(Condition::GreaterThan)
        );
    }

    #[test]
    fn shapes_match_extension_word_layouts() {
        assert_eq!(classify_opcode(0x10).shape(), OperandShape::RrLim);
        assert_eq!(classify_opcode(0x18).shape(), OperandShape::RrConst);
        assert_eq!(classify_opcode(0x93).shape(), OperandShape::RrDis);
        assert_eq!(classify_opcode(0x66).shape(), OperandShape::Rimm);
        assert_eq!(classify_opcode(0xCE).shape(), OperandShape::LlExt);
        assert_eq!(classify_opcode(0xEF).shape(), OperandShape::LrConst);
        assert_eq!(classify_opcode(0xFD).shape(), OperandShape::PcAdr);
    }

    #[test]
    fn trap_codes_map_onto_conditions() {
        assert_eq!(Condition::from_trap_code(3), None);
        assert_eq!(
            Condition::from_trap_code(4),
            Some(Condition::LessOrEqual)
        );
        assert_eq!(Condition::from_trap_code(14), Some(Condition::Overflow));
        assert_eq!(Condition::from_trap_code(15), Some(Condition::Always));
        assert_eq!(
            Condition::from_set_selector(15),
            Some(Condition::NoOverflow)
        );
    }

    #[test]
    fn always_and_never_ignore_flags() {
        assert!(Condition::Always.holds(0));
        assert!(!Condition::Never.holds(u32::MAX));
    }

    #[rstest]
    #[case(0x0, SR_V, 0)]
    #[case(0x1, 0, SR_V)]
    #[case(0x2, SR_Z, 0)]
    #[case(0x3, 0, SR_Z)]
    #[case(0x4, SR_C, 0)]
    #[case(0x5, 0, SR_C)]
    #[case(0x6, SR_Z, 0)]
    #[case(0x6, SR_C, SR_N)]
    #[case(0x7, SR_N, SR_C)]
    #[case(0x8, SR_N, SR_Z)]
    #[case(0x9, SR_C | SR_Z, SR_N)]
    #[case(0xA, SR_Z, SR_C)]
    #[case(0xB, SR_C, SR_N | SR_Z)]
    fn branch_nibble_conditions_test_their_flags(
        #[case] nibble: u8,
        #[case] taken_with: u32,
        #[case] untaken_with: u32,
    ) {
        let condition = Condition::from_branch_nibble(nibble).unwrap();
        assert!(condition.holds(taken_with));
        assert!(!condition.holds(untaken_with));
    }
}
