//! Width-aware program and I/O space accessors layered over [`Bus`].
//!
//! Word addresses drop bits 1..0 and half-word addresses drop bit 0 before they
//! reach the host. On 16-bit bus variants a word access becomes two big-endian
//! half-word accesses.

use crate::{Bus, BusWidth};

/// Converts a load/store address into the I/O space word address.
#[must_use]
pub const fn io_address(addr: u32) -> u32 {
    (addr >> 11) & 0x7FFC
}

/// Reads an aligned word from program space.
pub fn read_word(bus: &mut dyn Bus, width: BusWidth, addr: u32) -> u32 {
    let addr = addr & !3;
    match width {
        BusWidth::Bits32 => bus.read_word(addr),
        BusWidth::Bits16 => {
            let high = u32::from(bus.read_half(addr));
            let low = u32::from(bus.read_half(addr.wrapping_add(2)));
            (high << 16) | low
        }
    }
}

/// Writes an aligned word to program space.
#[allow(clippy::cast_possible_truncation)]
pub fn write_word(bus: &mut dyn Bus, width: BusWidth, addr: u32, value: u32) {
    let addr = addr & !3;
    match width {
        BusWidth::Bits32 => bus.write_word(addr, value),
        BusWidth::Bits16 => {
            bus.write_half(addr, (value >> 16) as u16);
            bus.write_half(addr.wrapping_add(2), value as u16);
        }
    }
}

/// Reads an aligned half-word from program space.
pub fn read_half(bus: &mut dyn Bus, addr: u32) -> u16 {
    bus.read_half(addr & !1)
}

/// Writes an aligned half-word to program space.
pub fn write_half(bus: &mut dyn Bus, addr: u32, value: u16) {
    bus.write_half(addr & !1, value);
}

/// Reads a word from I/O space for a load/store address.
pub fn io_read(bus: &mut dyn Bus, addr: u32) -> u32 {
    bus.io_read_word(io_address(addr))
}

/// Writes a word to I/O space for a load/store address.
pub fn io_write(bus: &mut dyn Bus, addr: u32, value: u32) {
    bus.io_write_word(io_address(addr), value);
}
