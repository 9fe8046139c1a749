/// Number of global registers (`G0..G31`).
pub const GLOBAL_REGISTER_COUNT: usize = 32;
/// Number of physical local registers in the windowed stack cache.
pub const LOCAL_REGISTER_COUNT: usize = 64;
/// Mask applied to every physical local index.
pub const LOCAL_INDEX_MASK: u32 = 0x3F;

/// `G0`, program counter.
pub const PC_REGISTER: u8 = 0;
/// `G1`, status register.
pub const SR_REGISTER: u8 = 1;
/// `G2`, floating-point exception register.
pub const FER_REGISTER: u8 = 2;
/// `G14`, high multiply-accumulate register.
pub const MAC_HIGH_REGISTER: u8 = 14;
/// `G15`, low multiply-accumulate register.
pub const MAC_LOW_REGISTER: u8 = 15;
/// `G18`, stack pointer.
pub const SP_REGISTER: u8 = 18;
/// `G19`, upper stack bound.
pub const UB_REGISTER: u8 = 19;
/// `G20`, bus control register (write-only).
pub const BCR_REGISTER: u8 = 20;
/// `G21`, timer prescaler register (write-only).
pub const TPR_REGISTER: u8 = 21;
/// `G22`, timer compare register.
pub const TCR_REGISTER: u8 = 22;
/// `G23`, timer register.
pub const TR_REGISTER: u8 = 23;
/// `G24`, watchdog compare register.
pub const WCR_REGISTER: u8 = 24;
/// `G25`, input status register.
pub const ISR_REGISTER: u8 = 25;
/// `G26`, function control register (write-only).
pub const FCR_REGISTER: u8 = 26;
/// `G27`, memory control register (write-only).
pub const MCR_REGISTER: u8 = 27;

/// `SR` carry flag.
pub const SR_C: u32 = 1 << 0;
/// `SR` zero flag.
pub const SR_Z: u32 = 1 << 1;
/// `SR` negative flag.
pub const SR_N: u32 = 1 << 2;
/// `SR` overflow flag.
pub const SR_V: u32 = 1 << 3;
/// `SR` cache-mode flag.
pub const SR_M: u32 = 1 << 4;
/// `SR` high-global flag: the next `MOV`/`MOVI` addresses `G16..G31`.
pub const SR_H: u32 = 1 << 5;
/// `SR` bit 6, always zero.
pub const SR_RESERVED: u32 = 1 << 6;
/// `SR` interrupt-mode flag.
pub const SR_I: u32 = 1 << 7;
/// `SR` floating-point trap enable field.
pub const SR_FTE: u32 = 0x1F << 8;
/// `SR` floating-point rounding mode field.
pub const SR_FRM: u32 = 0x3 << 13;
/// `SR` interrupt-lock flag.
pub const SR_L: u32 = 1 << 15;
/// `SR` trace-mode flag.
pub const SR_T: u32 = 1 << 16;
/// `SR` trace-pending flag.
pub const SR_P: u32 = 1 << 17;
/// `SR` supervisor-state flag.
pub const SR_S: u32 = 1 << 18;
/// `SR` instruction-length code field.
pub const SR_ILC: u32 = 0x3 << 19;
/// `SR` frame-length field.
pub const SR_FL: u32 = 0xF << 21;
/// `SR` frame-pointer field.
pub const SR_FP: u32 = 0x7F << 25;

const SR_ILC_SHIFT: u32 = 19;
const SR_FL_SHIFT: u32 = 21;
const SR_FP_SHIFT: u32 = 25;

/// Global and windowed local register file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ArchitecturalState {
    globals: [u32; GLOBAL_REGISTER_COUNT],
    locals: Box<[u32]>,
}

impl Default for ArchitecturalState {
    fn default() -> Self {
        Self {
            globals: [0; GLOBAL_REGISTER_COUNT],
            locals: vec![0; LOCAL_REGISTER_COUNT].into_boxed_slice(),
        }
    }
}

impl ArchitecturalState {
    /// Returns `true` when the local stack cache has its architectural size.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.locals.len() == LOCAL_REGISTER_COUNT
    }

    /// Raw global storage read, without any register-specific side effects.
    #[must_use]
    pub const fn global(&self, index: u8) -> u32 {
        self.globals[(index & 0x1F) as usize]
    }

    /// Raw global storage write, without any register-specific side effects.
    pub const fn set_global(&mut self, index: u8, value: u32) {
        self.globals[(index & 0x1F) as usize] = value;
    }

    /// Reads a local register through the current window (`(index + FP) mod 64`).
    #[must_use]
    pub fn local(&self, index: u32) -> u32 {
        self.physical_local(index.wrapping_add(self.fp()))
    }

    /// Writes a local register through the current window.
    pub fn set_local(&mut self, index: u32, value: u32) {
        self.set_physical_local(index.wrapping_add(self.fp()), value);
    }

    /// Reads a physical local slot, wrapping the index modulo 64.
    #[must_use]
    pub fn physical_local(&self, index: u32) -> u32 {
        self.locals[(index & LOCAL_INDEX_MASK) as usize]
    }

    /// Writes a physical local slot, wrapping the index modulo 64.
    pub fn set_physical_local(&mut self, index: u32, value: u32) {
        self.locals[(index & LOCAL_INDEX_MASK) as usize] = value;
    }

    /// Reads the `PC` register.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.globals[PC_REGISTER as usize]
    }

    /// Writes the `PC` register; bit 0 is always cleared.
    pub const fn set_pc(&mut self, value: u32) {
        self.globals[PC_REGISTER as usize] = value & !1;
    }

    /// Reads the full `SR` register.
    #[must_use]
    pub const fn sr(&self) -> u32 {
        self.globals[SR_REGISTER as usize]
    }

    /// Replaces the full `SR` register; bit 6 is always cleared.
    pub const fn set_sr(&mut self, value: u32) {
        self.globals[SR_REGISTER as usize] = value & !SR_RESERVED;
    }

    /// Returns `true` when every bit of `mask` is set in `SR`.
    #[must_use]
    pub const fn flag(&self, mask: u32) -> bool {
        (self.sr() & mask) == mask
    }

    /// Sets or clears the `SR` bits in `mask`.
    pub const fn set_flag(&mut self, mask: u32, enabled: bool) {
        let sr = self.sr();
        self.set_sr(if enabled { sr | mask } else { sr & !mask });
    }

    /// Carry flag as `0` or `1`.
    #[must_use]
    pub const fn carry(&self) -> u32 {
        self.sr() & SR_C
    }

    /// Supervisor flag as `0` or `1`, the form stored in return addresses.
    #[must_use]
    pub const fn supervisor_bit(&self) -> u32 {
        (self.sr() & SR_S) >> 18
    }

    /// Frame pointer field (`SR[31:25]`).
    #[must_use]
    pub const fn fp(&self) -> u32 {
        (self.sr() & SR_FP) >> SR_FP_SHIFT
    }

    /// Writes the frame pointer field, wrapping to 7 bits.
    pub const fn set_fp(&mut self, value: u32) {
        let sr = (self.sr() & !SR_FP) | ((value << SR_FP_SHIFT) & SR_FP);
        self.set_sr(sr);
    }

    /// Raw frame length field (`SR[24:21]`).
    #[must_use]
    pub const fn fl(&self) -> u32 {
        (self.sr() & SR_FL) >> SR_FL_SHIFT
    }

    /// Frame length in registers; a raw field of 0 means 16.
    #[must_use]
    pub const fn frame_len(&self) -> u32 {
        match self.fl() {
            0 => 16,
            fl => fl,
        }
    }

    /// Writes the frame length field, wrapping to 4 bits.
    pub const fn set_fl(&mut self, value: u32) {
        let sr = (self.sr() & !SR_FL) | ((value << SR_FL_SHIFT) & SR_FL);
        self.set_sr(sr);
    }

    /// Instruction length code of the last completed instruction.
    #[must_use]
    pub const fn ilc(&self) -> u32 {
        (self.sr() & SR_ILC) >> SR_ILC_SHIFT
    }

    /// Writes the instruction length code (1-3 half-words).
    pub const fn set_ilc(&mut self, words: u32) {
        let sr = (self.sr() & !SR_ILC) | ((words << SR_ILC_SHIFT) & SR_ILC);
        self.set_sr(sr);
    }

    /// Reads the stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.globals[SP_REGISTER as usize]
    }

    /// Writes the stack pointer; bits 1..0 are always cleared.
    pub const fn set_sp(&mut self, value: u32) {
        self.globals[SP_REGISTER as usize] = value & !3;
    }

    /// Reads the upper stack bound.
    #[must_use]
    pub const fn ub(&self) -> u32 {
        self.globals[UB_REGISTER as usize]
    }
}

/// Wraps a window distance into the signed 7-bit range `-64..=63`.
#[must_use]
pub const fn wrap_window_distance(value: i32) -> i32 {
    ((value + 64) & 0x7F) - 64
}

#[cfg(test)]
mod tests {
    use super::{
        wrap_window_distance, ArchitecturalState, SR_C, SR_FP, SR_N, SR_RESERVED, SR_S, SR_Z,
    };

    #[test]
    fn locals_are_addressed_through_the_frame_pointer() {
        let mut state = ArchitecturalState::default();
        state.set_fp(62);
        state.set_local(3, 0xCAFE_0001);

        assert_eq!(state.physical_local(1), 0xCAFE_0001);
        assert_eq!(state.local(3), 0xCAFE_0001);
    }

    #[test]
    fn pc_and_sp_drop_low_bits() {
        let mut state = ArchitecturalState::default();
        state.set_pc(0x1235);
        state.set_sp(0x8007);

        assert_eq!(state.pc(), 0x1234);
        assert_eq!(state.sp(), 0x8004);
    }

    #[test]
    fn sr_never_stores_bit_six() {
        let mut state = ArchitecturalState::default();
        state.set_sr(u32::MAX);
        assert_eq!(state.sr() & SR_RESERVED, 0);
    }

    #[test]
    fn field_accessors_do_not_disturb_neighbouring_bits() {
        let mut state = ArchitecturalState::default();
        state.set_flag(SR_C | SR_Z | SR_S, true);
        state.set_fp(0x7F);
        state.set_fl(6);
        state.set_ilc(3);

        assert_eq!(state.fp(), 0x7F);
        assert_eq!(state.fl(), 6);
        assert_eq!(state.ilc(), 3);
        assert!(state.flag(SR_C | SR_Z | SR_S));
        assert!(!state.flag(SR_N));
        assert_eq!(state.sr() & SR_FP, SR_FP);
        assert_eq!(state.supervisor_bit(), 1);
    }

    #[test]
    fn zero_frame_length_means_sixteen() {
        let mut state = ArchitecturalState::default();
        state.set_fl(0);
        assert_eq!(state.frame_len(), 16);
        state.set_fl(2);
        assert_eq!(state.frame_len(), 2);
    }

    #[test]
    fn window_distance_wraps_into_signed_seven_bits() {
        assert_eq!(wrap_window_distance(0), 0);
        assert_eq!(wrap_window_distance(-1), -1);
        assert_eq!(wrap_window_distance(63), 63);
        assert_eq!(wrap_window_distance(64), -64);
        assert_eq!(wrap_window_distance(-65), 63);
        assert_eq!(wrap_window_distance(100), -28);
    }
}
