//! Loads and stores: displacement, post-increment, stack-cached, I/O and `LR` forms.

use super::helpers::{read_operand, reserved, retired, source_or_zero, write_operand};
use super::ExecuteOutcome;
use crate::decoder::{DecodedInstruction, OperandRef};
use crate::memory::access::{io_read, io_write, read_half, read_word, write_half, write_word};
use crate::timing::{clocks, CycleCostKind};
use crate::{Bus, CoreState, FaultCode};

/// Word-class operation selected by displacement bits 1..0 of sub-type 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordClass {
    Word,
    Double,
    IoWord,
    IoDouble,
}

impl WordClass {
    const fn from_displacement(displacement: u32) -> Self {
        match displacement & 3 {
            0 => Self::Word,
            1 => Self::Double,
            2 => Self::IoWord,
            _ => Self::IoDouble,
        }
    }

    const fn cost(self) -> CycleCostKind {
        match self {
            Self::Word | Self::IoWord => CycleCostKind::Load,
            Self::Double | Self::IoDouble => CycleCostKind::LoadDouble,
        }
    }
}

/// Post-increment forms name a base register other than `PC` and `SR`.
fn base_is_special(operand: OperandRef) -> bool {
    operand.is_pc() || operand.is_sr()
}

fn displacement_base(state: &mut CoreState, operand: OperandRef) -> u32 {
    if operand.is_sr() {
        0
    } else {
        read_operand(state, operand)
    }
}

fn add_to_base(state: &mut CoreState, base: OperandRef, addr: u32, increment: u32) {
    write_operand(state, base, addr.wrapping_add(increment));
}

/// Physical local slot mirrored by a stack address at or above `SP`.
const fn stack_slot(addr: u32) -> u32 {
    (addr & 0xFC) >> 2
}

/// `LDxx.D Rs, Rd, dis`.
pub(super) fn load_displacement(
    state: &mut CoreState,
    bus: &mut dyn Bus,
    instr: &DecodedInstruction,
) -> ExecuteOutcome {
    let width = state.config.variant.bus_width();
    let base = displacement_base(state, instr.dst);
    let displacement = instr.immediate;
    let target = instr.src;

    match instr.subtype {
        0 => {
            let value = bus.read_byte(base.wrapping_add(displacement)) as i8 as i32 as u32;
            write_operand(state, target, value);
        }
        1 => {
            let value = u32::from(bus.read_byte(base.wrapping_add(displacement)));
            write_operand(state, target, value);
        }
        2 => {
            let half = read_half(bus, base.wrapping_add(displacement & !1));
            let value = if displacement & 1 != 0 {
                half as i16 as i32 as u32
            } else {
                u32::from(half)
            };
            write_operand(state, target, value);
        }
        _ => {
            let class = WordClass::from_displacement(displacement);
            let addr = base.wrapping_add(displacement & !3);
            match class {
                WordClass::Word => {
                    let value = read_word(bus, width, addr);
                    write_operand(state, target, value);
                }
                WordClass::Double => {
                    let high = read_word(bus, width, addr);
                    let low = read_word(bus, width, addr.wrapping_add(4));
                    write_operand(state, target, high);
                    write_operand(state, target.next(), low);
                }
                WordClass::IoWord => {
                    let value = io_read(bus, addr);
                    write_operand(state, target, value);
                }
                WordClass::IoDouble => {
                    let high = io_read(bus, addr);
                    let low = io_read(bus, addr.wrapping_add(4));
                    write_operand(state, target, high);
                    write_operand(state, target.next(), low);
                }
            }
            return retired(class.cost());
        }
    }
    retired(CycleCostKind::Load)
}

/// `LDxx.N Rs, Rd, dis` and `LDW.S`.
pub(super) fn load_post_increment(
    state: &mut CoreState,
    bus: &mut dyn Bus,
    instr: &DecodedInstruction,
) -> ExecuteOutcome {
    if base_is_special(instr.dst) {
        return reserved(state, instr, "post-increment load with PC or SR base");
    }
    let width = state.config.variant.bus_width();
    let base = instr.dst;
    let target = instr.src;
    let addr = read_operand(state, base);
    let displacement = instr.immediate;

    let (increment, kind) = match instr.subtype {
        0 => {
            let value = bus.read_byte(addr) as i8 as i32 as u32;
            write_operand(state, target, value);
            (displacement, CycleCostKind::Load)
        }
        1 => {
            let value = u32::from(bus.read_byte(addr));
            write_operand(state, target, value);
            (displacement, CycleCostKind::Load)
        }
        2 => {
            let half = read_half(bus, addr);
            let value = if displacement & 1 != 0 {
                half as i16 as i32 as u32
            } else {
                u32::from(half)
            };
            write_operand(state, target, value);
            (displacement & !1, CycleCostKind::Load)
        }
        _ => match displacement & 3 {
            0 => {
                let value = read_word(bus, width, addr);
                write_operand(state, target, value);
                (displacement & !3, CycleCostKind::Load)
            }
            1 => {
                let high = read_word(bus, width, addr);
                let low = read_word(bus, width, addr.wrapping_add(4));
                write_operand(state, target, high);
                write_operand(state, target.next(), low);
                if target.next() == base {
                    return retired(CycleCostKind::LoadDouble);
                }
                (displacement & !3, CycleCostKind::LoadDouble)
            }
            2 => return reserved(state, instr, "reserved post-increment load sub-type"),
            _ => {
                let value = if addr < state.arch.sp() {
                    read_word(bus, width, addr)
                } else {
                    state.arch.physical_local(stack_slot(addr))
                };
                write_operand(state, target, value);
                (displacement & !3, CycleCostKind::StackCached)
            }
        },
    };

    if target != base {
        add_to_base(state, base, addr, increment);
    }
    retired(kind)
}

fn signed_byte_range_error(value: u32) -> bool {
    !(-128..=127).contains(&(value as i32))
}

fn signed_half_range_error(value: u32) -> bool {
    !(-32768..=32767).contains(&(value as i32))
}

fn stored(kind: CycleCostKind, range_error: bool) -> ExecuteOutcome {
    if range_error {
        ExecuteOutcome::Exception {
            cause: FaultCode::RangeError,
            clocks: clocks(kind),
        }
    } else {
        retired(kind)
    }
}

/// `STxx.D Rd, dis, Rs`.
pub(super) fn store_displacement(
    state: &mut CoreState,
    bus: &mut dyn Bus,
    instr: &DecodedInstruction,
) -> ExecuteOutcome {
    let width = state.config.variant.bus_width();
    let base = displacement_base(state, instr.dst);
    let value = source_or_zero(state, instr.src);
    let displacement = instr.immediate;

    match instr.subtype {
        0 => {
            bus.write_byte(base.wrapping_add(displacement), value as u8);
            stored(CycleCostKind::Load, signed_byte_range_error(value))
        }
        1 => {
            bus.write_byte(base.wrapping_add(displacement), value as u8);
            retired(CycleCostKind::Load)
        }
        2 => {
            write_half(bus, base.wrapping_add(displacement & !1), value as u16);
            let checked = displacement & 1 != 0;
            stored(
                CycleCostKind::Load,
                checked && signed_half_range_error(value),
            )
        }
        _ => {
            let class = WordClass::from_displacement(displacement);
            let addr = base.wrapping_add(displacement & !3);
            match class {
                WordClass::Word => write_word(bus, width, addr, value),
                WordClass::Double => {
                    let low = source_or_zero(state, instr.src.next());
                    write_word(bus, width, addr, value);
                    write_word(bus, width, addr.wrapping_add(4), low);
                }
                WordClass::IoWord => io_write(bus, addr, value),
                WordClass::IoDouble => {
                    let low = source_or_zero(state, instr.src.next());
                    io_write(bus, addr, value);
                    io_write(bus, addr.wrapping_add(4), low);
                }
            }
            retired(class.cost())
        }
    }
}

/// `STxx.N Rd, dis, Rs` and `STW.S`.
pub(super) fn store_post_increment(
    state: &mut CoreState,
    bus: &mut dyn Bus,
    instr: &DecodedInstruction,
) -> ExecuteOutcome {
    if base_is_special(instr.dst) {
        return reserved(state, instr, "post-increment store with PC or SR base");
    }
    let width = state.config.variant.bus_width();
    let base = instr.dst;
    let addr = read_operand(state, base);
    let value = source_or_zero(state, instr.src);
    let displacement = instr.immediate;

    match instr.subtype {
        0 => {
            bus.write_byte(addr, value as u8);
            add_to_base(state, base, addr, displacement);
            stored(CycleCostKind::Load, signed_byte_range_error(value))
        }
        1 => {
            bus.write_byte(addr, value as u8);
            add_to_base(state, base, addr, displacement);
            retired(CycleCostKind::Load)
        }
        2 => {
            write_half(bus, addr, value as u16);
            add_to_base(state, base, addr, displacement & !1);
            let checked = displacement & 1 != 0;
            stored(
                CycleCostKind::Load,
                checked && signed_half_range_error(value),
            )
        }
        _ => match displacement & 3 {
            0 => {
                write_word(bus, width, addr, value);
                add_to_base(state, base, addr, displacement & !3);
                retired(CycleCostKind::Load)
            }
            1 => {
                let increment = displacement & !3;
                write_word(bus, width, addr, value);
                add_to_base(state, base, addr, increment);
                // The second register reads back after the base moved.
                let low = source_or_zero(state, instr.src.next());
                write_word(bus, width, addr.wrapping_add(4), low);
                retired(CycleCostKind::LoadDouble)
            }
            2 => reserved(state, instr, "reserved post-increment store sub-type"),
            _ => {
                if addr < state.arch.sp() {
                    write_word(bus, width, addr, value);
                } else {
                    state.arch.set_physical_local(stack_slot(addr), value);
                }
                add_to_base(state, base, addr, displacement & !3);
                retired(CycleCostKind::StackCached)
            }
        },
    }
}

/// Register-indirect `LR` forms: `LDW.R`, `LDD.R`, `LDW.P`, `LDD.P`.
pub(super) fn load_register(
    state: &mut CoreState,
    bus: &mut dyn Bus,
    instr: &DecodedInstruction,
    double: bool,
    post_increment: bool,
) -> ExecuteOutcome {
    let width = state.config.variant.bus_width();
    let base = instr.dst;
    let target = instr.src;
    let addr = read_operand(state, base);

    let high = read_word(bus, width, addr);
    write_operand(state, target, high);
    if double {
        let low = read_word(bus, width, addr.wrapping_add(4));
        write_operand(state, target.next(), low);
    }

    if post_increment {
        let aliased = target == base || (double && target.next() == base);
        if !aliased {
            add_to_base(state, base, addr, if double { 8 } else { 4 });
        }
    }
    retired(if double {
        CycleCostKind::LoadDouble
    } else {
        CycleCostKind::Load
    })
}

/// Register-indirect `LR` forms: `STW.R`, `STD.R`, `STW.P`, `STD.P`.
pub(super) fn store_register(
    state: &mut CoreState,
    bus: &mut dyn Bus,
    instr: &DecodedInstruction,
    double: bool,
    post_increment: bool,
) -> ExecuteOutcome {
    let width = state.config.variant.bus_width();
    let base = instr.dst;
    let addr = read_operand(state, base);
    let value = source_or_zero(state, instr.src);

    write_word(bus, width, addr, value);
    if post_increment {
        add_to_base(state, base, addr, if double { 8 } else { 4 });
    }
    if double {
        let low = source_or_zero(state, instr.src.next());
        write_word(bus, width, addr.wrapping_add(4), low);
    }
    retired(if double {
        CycleCostKind::LoadDouble
    } else {
        CycleCostKind::Load
    })
}
