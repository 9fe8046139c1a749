#![no_main]

use hyperstone_core::{Bus, CoreConfig, CoreState, CoreVariant, Decoder};
use libfuzzer_sys::fuzz_target;

/// Program memory backed by the fuzz input, repeated across the address space.
struct InputBus<'a> {
    image: &'a [u8],
    scratch: [u8; 256],
}

impl InputBus<'_> {
    fn byte(&self, addr: u32) -> u8 {
        let index = addr as usize;
        self.image[index % self.image.len()] ^ self.scratch[index & 0xFF]
    }
}

impl Bus for InputBus<'_> {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.byte(addr)
    }

    fn read_half(&mut self, addr: u32) -> u16 {
        u16::from_be_bytes([self.byte(addr), self.byte(addr.wrapping_add(1))])
    }

    fn read_word(&mut self, addr: u32) -> u32 {
        (u32::from(self.read_half(addr)) << 16) | u32::from(self.read_half(addr.wrapping_add(2)))
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        self.scratch[addr as usize & 0xFF] = value;
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

    fn io_read_word(&mut self, addr: u32) -> u32 {
        addr.rotate_left(7)
    }

    fn io_write_word(&mut self, _addr: u32, _value: u32) {}
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let mut words = data[2..].chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    let _ = Decoder::decode(u16::from_be_bytes([data[0], data[1]]), data[2] & 1 != 0, || {
        words.next().unwrap_or(0)
    });

    let variant = if data[3] & 1 == 0 {
        CoreVariant::E132XS
    } else {
        CoreVariant::E116XS
    };
    let config = CoreConfig {
        variant,
        timer_poll_skip: data[3] & 2 != 0,
    };
    let mut state = CoreState::with_config(&config);
    state.arch.set_pc(0);
    let mut bus = InputBus {
        image: &data[4..],
        scratch: [0; 256],
    };
    let _ = state.execute(&mut bus, 512);
});
