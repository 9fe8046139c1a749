//! Sparse host bus and opcode builders shared by the integration suites.

#![allow(dead_code)]

use std::collections::HashMap;

use hyperstone_core::state::registers::{SR_L, SR_S};
use hyperstone_core::{Bus, CoreConfig, CoreState, IrqLine};

/// Big-endian byte-addressed memory that only stores bytes ever written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseBus {
    bytes: HashMap<u32, u8>,
    pub io_writes: Vec<(u32, u32)>,
    pub acknowledged: Vec<IrqLine>,
    pub half_reads: usize,
    pub word_reads: usize,
}

impl SparseBus {
    pub fn byte(&self, addr: u32) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    pub fn word(&self, addr: u32) -> u32 {
        u32::from_be_bytes([
            self.byte(addr),
            self.byte(addr.wrapping_add(1)),
            self.byte(addr.wrapping_add(2)),
            self.byte(addr.wrapping_add(3)),
        ])
    }

    pub fn poke_word(&mut self, addr: u32, value: u32) {
        for (offset, byte) in (0u32..).zip(value.to_be_bytes()) {
            self.bytes.insert(addr.wrapping_add(offset), byte);
        }
    }

    pub fn poke_half(&mut self, addr: u32, value: u16) {
        for (offset, byte) in (0u32..).zip(value.to_be_bytes()) {
            self.bytes.insert(addr.wrapping_add(offset), byte);
        }
    }

    /// Places instruction half-words back to back from `addr`.
    pub fn program(&mut self, addr: u32, words: &[u16]) {
        for (offset, word) in (0u32..).zip(words) {
            self.poke_half(addr.wrapping_add(offset * 2), *word);
        }
    }
}

impl Bus for SparseBus {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.byte(addr)
    }

    fn read_half(&mut self, addr: u32) -> u16 {
        self.half_reads += 1;
        u16::from_be_bytes([self.byte(addr), self.byte(addr.wrapping_add(1))])
    }

    fn read_word(&mut self, addr: u32) -> u32 {
        self.word_reads += 1;
        self.word(addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        self.bytes.insert(addr, value);
    }

    fn write_half(&mut self, addr: u32, value: u16) {
        self.poke_half(addr, value);
    }

    fn write_word(&mut self, addr: u32, value: u32) {
        self.poke_word(addr, value);
    }

    fn io_read_word(&mut self, _addr: u32) -> u32 {
        0
    }

    fn io_write_word(&mut self, addr: u32, value: u32) {
        self.io_writes.push((addr, value));
    }

    fn acknowledge_interrupt(&mut self, line: IrqLine) {
        self.acknowledged.push(line);
    }
}

/// Core out of reset, moved to user state with interrupts unlocked.
pub fn user_core(pc: u32) -> CoreState {
    user_core_with(&CoreConfig::default(), pc)
}

pub fn user_core_with(config: &CoreConfig, pc: u32) -> CoreState {
    let mut state = CoreState::with_config(config);
    state.arch.set_flag(SR_L | SR_S, false);
    state.arch.set_pc(pc);
    state
}

/// Register-register form. `dst_local`/`src_local` pick the local bank.
pub const fn rr(op: u8, dst_local: bool, dst: u8, src_local: bool, src: u8) -> u16 {
    let op = op | ((dst_local as u8) << 1) | (src_local as u8);
    ((op as u16) << 8) | (((dst & 0xF) as u16) << 4) | ((src & 0xF) as u16)
}

/// Register-immediate form with a 4-bit immediate (`1..=15`).
pub const fn rimm(op: u8, dst_local: bool, dst: u8, imm: u8) -> u16 {
    let op = op | ((dst_local as u8) << 1);
    ((op as u16) << 8) | (((dst & 0xF) as u16) << 4) | ((imm & 0xF) as u16)
}

/// Short PC-relative branch with an even offset in `-128..=126`.
pub const fn pc_rel(op: u8, offset: i8) -> u16 {
    let raw = offset as u8;
    let sign = (raw >> 7) as u16;
    ((op as u16) << 8) | ((raw & 0x7E) as u16) | sign
}

/// `TRAPxx` with condition code `code` (`4..=15`) and trap number `number`.
pub const fn trap(code: u8, number: u8) -> u16 {
    let high = ((code >> 2) & 3) as u16;
    0xFC00 | (high << 8) | (((number & 0x3F) as u16) << 2) | ((code & 3) as u16)
}

pub const MOV: u8 = 0x24;
pub const ADD: u8 = 0x28;
pub const SUB: u8 = 0x48;
pub const DIVU: u8 = 0x08;
pub const CMPI: u8 = 0x60;
pub const MOVI: u8 = 0x64;
pub const ADDI: u8 = 0x68;
pub const SHLI: u8 = 0xA8;
pub const RET: u8 = 0x04;
pub const CALL: u8 = 0xEE;
pub const DBR: u8 = 0xEC;
pub const BR: u8 = 0xFC;
pub const DO: u8 = 0xCF;
