//! Instruction decoder.
//!
//! The high byte of the first half-word selects an [`OpcodeEncoding`], whose
//! [`OperandShape`] determines how register fields are read and how many
//! extension half-words follow. Extension words are pulled through a fetch
//! closure so the decoder stays independent of the bus.

#![allow(clippy::cast_possible_truncation, missing_docs)]

use crate::encoding::{classify_opcode, OpcodeEncoding, OperandShape};
use crate::state::registers::{PC_REGISTER, SR_REGISTER};

/// Register bank selected by an operand field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegisterBank {
    /// Fixed global register `G0..G31`.
    #[default]
    Global,
    /// Windowed local register; the index is relative to `FP`.
    Local,
}

/// Fully resolved register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OperandRef {
    /// Register bank.
    pub bank: RegisterBank,
    /// Global index, or local index relative to `FP`.
    pub index: u8,
}

/// Global registers that read as zero.
const WRITE_ONLY_GLOBALS: [u8; 4] = [20, 21, 26, 27];

impl OperandRef {
    /// Global register operand.
    #[must_use]
    pub const fn global(index: u8) -> Self {
        Self {
            bank: RegisterBank::Global,
            index: index & 0x1F,
        }
    }

    /// Local register operand.
    #[must_use]
    pub const fn local(index: u8) -> Self {
        Self {
            bank: RegisterBank::Local,
            index: index & 0x3F,
        }
    }

    /// `true` for the local bank.
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(self.bank, RegisterBank::Local)
    }

    /// `true` for `G0`.
    #[must_use]
    pub const fn is_pc(self) -> bool {
        !self.is_local() && self.index == PC_REGISTER
    }

    /// `true` for `G1`.
    #[must_use]
    pub const fn is_sr(self) -> bool {
        !self.is_local() && self.index == SR_REGISTER
    }

    /// `true` for `BCR`, `TPR`, `FCR` and `MCR`, which read as zero.
    #[must_use]
    pub const fn is_write_only(self) -> bool {
        if self.is_local() {
            return false;
        }
        let mut i = 0;
        while i < WRITE_ONLY_GLOBALS.len() {
            if WRITE_ONLY_GLOBALS[i] == self.index {
                return true;
            }
            i += 1;
        }
        false
    }

    /// The second register of a pair (`Rdf`, `Rsf`).
    #[must_use]
    pub const fn next(self) -> Self {
        match self.bank {
            RegisterBank::Global => Self::global(self.index + 1),
            RegisterBank::Local => Self::local(self.index + 1),
        }
    }
}

/// Decoded instruction with all operand fields and extension words resolved.
///
/// Fields that the instruction's shape does not carry are left at their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// First instruction half-word.
    pub opcode: u16,
    /// Instruction family of the opcode high byte.
    pub encoding: OpcodeEncoding,
    /// Destination operand.
    pub dst: OperandRef,
    /// Source operand.
    pub src: OperandRef,
    /// `n` field of `Rimm`/`Rn`/`Ln` forms, or the trap number of `TRAPxx`.
    pub n: u8,
    /// Immediate, constant, displacement, limit, PC offset or `EXTEND` function.
    pub immediate: u32,
    /// Load/store sub-type, `XM` sub-type or `TRAPxx` condition code.
    pub subtype: u8,
    /// Instruction length in half-words (1-3).
    pub length_words: u8,
}

impl DecodedInstruction {
    /// Raw 4-bit destination code.
    #[must_use]
    pub const fn dst_code(&self) -> u8 {
        ((self.opcode & 0x00F0) >> 4) as u8
    }

    /// Raw 4-bit source code.
    #[must_use]
    pub const fn src_code(&self) -> u8 {
        (self.opcode & 0x000F) as u8
    }

    /// Opcode high byte.
    #[must_use]
    pub const fn opcode_byte(&self) -> u8 {
        (self.opcode >> 8) as u8
    }
}

/// Stateless decoder front end.
pub struct Decoder;

impl Decoder {
    /// Decodes `opcode`, pulling extension half-words from `fetch`.
    ///
    /// `high_globals` is the `SR.H` flag sampled at instruction start; it adds
    /// 16 to global register codes of `MOV` and `MOVI`.
    pub fn decode<F>(opcode: u16, high_globals: bool, mut fetch: F) -> DecodedInstruction
    where
        F: FnMut() -> u16,
    {
        let encoding = classify_opcode((opcode >> 8) as u8);
        let mut instr = DecodedInstruction {
            opcode,
            encoding,
            dst: OperandRef::default(),
            src: OperandRef::default(),
            n: 0,
            immediate: 0,
            subtype: 0,
            length_words: 1,
        };
        let mut words = 1u8;
        let mut next = || {
            words += 1;
            fetch()
        };

        let dst_code = ((opcode & 0x00F0) >> 4) as u8;
        let src_code = (opcode & 0x000F) as u8;
        let dst_local = opcode & 0x0200 != 0;
        let src_local = opcode & 0x0100 != 0;
        let n_field = (((opcode & 0x0100) >> 4) | (opcode & 0x000F)) as u8;
        let register = |local: bool, code: u8| {
            if local {
                OperandRef::local(code)
            } else {
                OperandRef::global(code)
            }
        };

        match encoding.shape() {
            OperandShape::Rr | OperandShape::RrLim | OperandShape::RrConst | OperandShape::RrDis => {
                instr.dst = register(dst_local, dst_code);
                instr.src = register(src_local, src_code);
                if matches!(encoding, OpcodeEncoding::Mov) && high_globals {
                    if !dst_local {
                        instr.dst = OperandRef::global(dst_code + 16);
                    }
                    if !src_local {
                        instr.src = OperandRef::global(src_code + 16);
                    }
                }
                match encoding.shape() {
                    OperandShape::RrLim => {
                        let (limit, subtype) = decode_lim(&mut next);
                        instr.immediate = limit;
                        instr.subtype = subtype;
                    }
                    OperandShape::RrConst => instr.immediate = decode_const(&mut next),
                    OperandShape::RrDis => {
                        let (displacement, subtype) = decode_dis(&mut next);
                        instr.immediate = displacement;
                        instr.subtype = subtype;
                    }
                    _ => {}
                }
            }
            OperandShape::Rimm => {
                instr.dst = register(dst_local, dst_code);
                if matches!(encoding, OpcodeEncoding::Movi) && high_globals && !dst_local {
                    instr.dst = OperandRef::global(dst_code + 16);
                }
                instr.n = n_field;
                instr.immediate = decode_immediate(opcode, &mut next);
                if n_field == 31 && matches!(encoding, OpcodeEncoding::Cmpbi | OpcodeEncoding::Andni)
                {
                    instr.immediate = 0x7FFF_FFFF;
                }
            }
            OperandShape::Rn => {
                instr.dst = register(dst_local, dst_code);
                instr.n = n_field;
            }
            OperandShape::Ln => {
                instr.dst = OperandRef::local(dst_code);
                instr.n = n_field;
            }
            OperandShape::Ll => {
                instr.dst = OperandRef::local(dst_code);
                instr.src = OperandRef::local(src_code);
            }
            OperandShape::LlExt => {
                instr.dst = OperandRef::local(dst_code);
                instr.src = OperandRef::local(src_code);
                instr.immediate = u32::from(next());
            }
            OperandShape::Lr => {
                instr.dst = OperandRef::local(dst_code);
                instr.src = register(src_local, src_code);
            }
            OperandShape::LrConst => {
                instr.dst = OperandRef::local(dst_code);
                instr.src = register(src_local, src_code);
                instr.immediate = decode_const(&mut next);
            }
            OperandShape::PcRel => instr.immediate = decode_pc_relative(opcode, &mut next),
            OperandShape::PcAdr => {
                instr.n = ((opcode & 0x00FC) >> 2) as u8;
                instr.subtype = (((opcode & 0x0300) >> 6) | (opcode & 0x0003)) as u8;
            }
            OperandShape::Bare => {}
        }

        instr.length_words = words;
        instr
    }
}

/// Signed constant of `RRconst`/`LRconst` forms: 14 bits, or 30 bits over two words.
fn decode_const(next: &mut impl FnMut() -> u16) -> u32 {
    let first = u32::from(next());
    if first & 0x8000 != 0 {
        let second = u32::from(next());
        let value = ((first & 0x3FFF) << 16) | second;
        if first & 0x4000 != 0 {
            value | 0xC000_0000
        } else {
            value
        }
    } else {
        let value = first & 0x3FFF;
        if first & 0x4000 != 0 {
            value | 0xFFFF_C000
        } else {
            value
        }
    }
}

/// Displacement of `RRdis` forms and its 2-bit load/store sub-type.
fn decode_dis(next: &mut impl FnMut() -> u16) -> (u32, u8) {
    let first = u32::from(next());
    let subtype = ((first & 0x3000) >> 12) as u8;
    let displacement = if first & 0x8000 != 0 {
        let second = u32::from(next());
        let value = ((first & 0x0FFF) << 16) | second;
        if first & 0x4000 != 0 {
            value | 0xF000_0000
        } else {
            value
        }
    } else {
        let value = first & 0x0FFF;
        if first & 0x4000 != 0 {
            value | 0xFFFF_F000
        } else {
            value
        }
    };
    (displacement, subtype)
}

/// Unsigned limit of `RRlim` forms and its 3-bit `XM` sub-type.
fn decode_lim(next: &mut impl FnMut() -> u16) -> (u32, u8) {
    let first = u32::from(next());
    let subtype = ((first & 0x7000) >> 12) as u8;
    let limit = if first & 0x8000 != 0 {
        ((first & 0x0FFF) << 16) | u32::from(next())
    } else {
        first & 0x0FFF
    };
    (limit, subtype)
}

/// Immediate of `Rimm` forms.
fn decode_immediate(opcode: u16, next: &mut impl FnMut() -> u16) -> u32 {
    let nibble = u32::from(opcode & 0x000F);
    if opcode & 0x0100 == 0 {
        return nibble;
    }
    match nibble {
        0 => 16,
        1 => {
            let high = u32::from(next());
            (high << 16) | u32::from(next())
        }
        2 => u32::from(next()),
        3 => 0xFFFF_0000 | u32::from(next()),
        4 => 32,
        5 => 64,
        6 => 128,
        7 => 0x8000_0000,
        _ => 0xFFFF_FFF0 | nibble,
    }
}

/// Signed PC-relative offset: 7 bits in the opcode, or 23 bits with one extension.
fn decode_pc_relative(opcode: u16, next: &mut impl FnMut() -> u16) -> u32 {
    let opcode = u32::from(opcode);
    if opcode & 0x0080 != 0 {
        let ext = u32::from(next());
        let offset = ((opcode & 0x007F) << 16) | (ext & 0xFFFE);
        if ext & 1 != 0 {
            offset | 0xFF80_0000
        } else {
            offset
        }
    } else {
        let offset = opcode & 0x007E;
        if opcode & 1 != 0 {
            offset | 0xFFFF_FF80
        } else {
            offset
        }
    }
}
