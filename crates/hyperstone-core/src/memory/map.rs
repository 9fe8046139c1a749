//! Trap-entry regions selected by `MCR` bits 14..12.

/// Base address of the `MEM0` trap-entry region.
pub const MEM0_ENTRY: u32 = 0x0000_0000;
/// Base address of the `MEM1` trap-entry region.
pub const MEM1_ENTRY: u32 = 0x4000_0000;
/// Base address of the `MEM2` trap-entry region.
pub const MEM2_ENTRY: u32 = 0x8000_0000;
/// Base address of the internal-RAM trap-entry region.
pub const IRAM_ENTRY: u32 = 0xC000_0000;
/// Base address of the `MEM3` trap-entry region, selected at reset.
pub const MEM3_ENTRY: u32 = 0xFFFF_FF00;

/// Region holding the trap and exception vector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TrapEntryRegion {
    /// External memory area 0.
    Mem0,
    /// External memory area 1.
    Mem1,
    /// External memory area 2.
    Mem2,
    /// On-chip RAM.
    InternalRam,
    /// External memory area 3, at the top of the address space.
    #[default]
    Mem3,
}

impl TrapEntryRegion {
    /// Decodes the `MCR` trap-entry selector; values 4-6 are invalid.
    #[must_use]
    pub const fn from_mcr(mcr: u32) -> Option<Self> {
        match (mcr >> 12) & 7 {
            0 => Some(Self::Mem0),
            1 => Some(Self::Mem1),
            2 => Some(Self::Mem2),
            3 => Some(Self::InternalRam),
            7 => Some(Self::Mem3),
            _ => None,
        }
    }

    /// Base address of the region.
    #[must_use]
    pub const fn base(self) -> u32 {
        match self {
            Self::Mem0 => MEM0_ENTRY,
            Self::Mem1 => MEM1_ENTRY,
            Self::Mem2 => MEM2_ENTRY,
            Self::InternalRam => IRAM_ENTRY,
            Self::Mem3 => MEM3_ENTRY,
        }
    }

    /// Vector address of trap `number` (`0..=63`).
    ///
    /// `MEM3` vectors grow upward from the base; every other region stores the
    /// table in reverse order.
    #[must_use]
    pub const fn trap_vector(self, number: u8) -> u32 {
        let number = (number & 0x3F) as u32;
        match self {
            Self::Mem3 => self.base() | (number * 4),
            _ => self.base() | ((63 - number) * 4),
        }
    }

    /// Entry address of a software-emulated opcode (`0xC0..=0xCD`).
    #[must_use]
    pub const fn emulation_vector(self, opcode_byte: u8) -> u32 {
        match self {
            Self::Mem3 => (self.base() - 0x100) | (((opcode_byte & 0x0F) as u32) << 4),
            _ => self.base() | (0x10C | ((0xCF_u32.wrapping_sub(opcode_byte as u32) & 0xF) << 4)),
        }
    }
}
