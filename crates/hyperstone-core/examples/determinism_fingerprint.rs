//! Deterministic replay fingerprint generator used by CI cross-host comparison.
//!
//! Runs a short loop program twice from the same snapshot and prints a hash of
//! the final register file, timer and memory.

#![allow(clippy::pedantic, clippy::nursery)]

use hyperstone_core::{Bus, CoreSnapshot, CoreState};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const MEMORY_BYTES: usize = 0x1_0000;
const RUN_BUDGET: u32 = 400;

/// 64 KiB image mirrored across the whole address space.
#[derive(Clone)]
struct FlatBus {
    memory: Vec<u8>,
}

impl FlatBus {
    fn new() -> Self {
        Self {
            memory: vec![0; MEMORY_BYTES],
        }
    }

    fn index(addr: u32) -> usize {
        addr as usize & (MEMORY_BYTES - 1)
    }

    fn load(&mut self, addr: u32, words: &[u16]) {
        for (offset, word) in (0u32..).zip(words) {
            self.write_half(addr + offset * 2, *word);
        }
    }
}

impl Bus for FlatBus {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.memory[Self::index(addr)]
    }

    fn read_half(&mut self, addr: u32) -> u16 {
        u16::from_be_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }

    fn read_word(&mut self, addr: u32) -> u32 {
        let high = u32::from(self.read_half(addr));
        (high << 16) | u32::from(self.read_half(addr.wrapping_add(2)))
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        self.memory[Self::index(addr)] = value;
    }

    fn write_half(&mut self, addr: u32, value: u16) {
        let [high, low] = value.to_be_bytes();
        self.write_byte(addr, high);
        self.write_byte(addr.wrapping_add(1), low);
    }

    fn write_word(&mut self, addr: u32, value: u32) {
        self.write_half(addr, (value >> 16) as u16);
        self.write_half(addr.wrapping_add(2), value as u16);
    }

    fn io_read_word(&mut self, _addr: u32) -> u32 {
        0
    }

    fn io_write_word(&mut self, _addr: u32, _value: u32) {}
}

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn initial_machine() -> (CoreState, FlatBus) {
    let mut bus = FlatBus::new();
    bus.load(
        0x1000,
        &[
            0x643A, // MOVI G3, 10
            0x6440, // MOVI G4, 0
            0x6450, // MOVI G5, 0
            0x2843, // ADD G4, G3
            0x693F, // ADDI G3, -1
            0xF37B, // BNE -6
            0x9854, 0x3040, // STW.D G5, G4, 0x40
            0xBC44, // MUL G4, G4
            0xFC7F, // BR -2
        ],
    );
    let mut state = CoreState::default();
    state.arch.set_pc(0x1000);
    (state, bus)
}

fn run(snapshot: &CoreSnapshot, mut bus: FlatBus) -> (u32, CoreState, FlatBus) {
    let mut state = CoreState::default();
    state
        .restore(snapshot)
        .expect("snapshot produced by this build");
    let consumed = state.execute(&mut bus, RUN_BUDGET);
    (consumed, state, bus)
}

fn fingerprint() -> String {
    let (state, bus) = initial_machine();
    let snapshot = state.snapshot();

    let (consumed, first, first_bus) = run(&snapshot, bus.clone());
    let (replayed, second, second_bus) = run(&snapshot, bus);
    assert_eq!(consumed, replayed, "replay consumed different cycles");
    assert!(first == second, "replay diverged from first run");
    assert!(first_bus.memory == second_bus.memory, "replay wrote different memory");

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    hash_bytes(&mut hash, &consumed.to_le_bytes());
    for index in 0..32 {
        hash_bytes(&mut hash, &first.arch.global(index).to_le_bytes());
    }
    for slot in 0..64 {
        hash_bytes(&mut hash, &first.arch.physical_local(slot).to_le_bytes());
    }
    hash_bytes(&mut hash, &first.timer.counter().to_le_bytes());
    hash_bytes(&mut hash, &first.diag.instruction_count.to_le_bytes());
    hash_bytes(&mut hash, &first_bus.memory);

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
