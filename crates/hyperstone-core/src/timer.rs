//! On-chip timer (`TR`, `TCR`, `TPR`).
//!
//! The counter advances in whole ticks from the clocks each instruction consumes.
//! `TPR` bits 23..16 hold the prescaler (`clocks_per_tick = prescale + 2`) and bits
//! 26 and up hold the clock-scale exponent, masked per chip variant. A `TPR` write
//! with bit 31 set is applied at the next tick boundary instead of immediately.

/// `TPR` bit requesting the reprogram to wait for the next tick.
pub const TPR_DEFERRED: u32 = 1 << 31;

/// Clocks per tick after reset.
pub const RESET_CLOCKS_PER_TICK: u32 = 2;

/// Timer counter, compare latch and prescaler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimerState {
    counter: u32,
    compare: u32,
    clocks_per_tick: u32,
    clock_scale: u8,
    residual_clocks: u32,
    deferred_tpr: Option<u32>,
    pending: bool,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            counter: 0,
            compare: 0,
            clocks_per_tick: RESET_CLOCKS_PER_TICK,
            clock_scale: 0,
            residual_clocks: 0,
            deferred_tpr: None,
            pending: false,
        }
    }
}

impl TimerState {
    /// Current `TR` value.
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Reloads `TR`.
    pub const fn write_counter(&mut self, value: u32) {
        self.counter = value;
        self.residual_clocks = 0;
    }

    /// Current `TCR` value.
    #[must_use]
    pub const fn compare(&self) -> u32 {
        self.compare
    }

    /// Writes `TCR`.
    pub const fn write_compare(&mut self, value: u32) {
        self.compare = value;
    }

    /// Core clocks per timer tick.
    #[must_use]
    pub const fn clocks_per_tick(&self) -> u32 {
        self.clocks_per_tick
    }

    /// Shift applied to core clocks to obtain charged cycles.
    #[must_use]
    pub const fn clock_scale(&self) -> u8 {
        self.clock_scale
    }

    /// Returns `true` while the timer interrupt is latched.
    #[must_use]
    pub const fn pending(&self) -> bool {
        self.pending
    }

    /// Clears the latched timer interrupt once it has been taken.
    pub const fn acknowledge(&mut self) {
        self.pending = false;
    }

    /// Handles a `TPR` write; `scale_mask` comes from the chip variant.
    pub fn write_prescaler(&mut self, value: u32, scale_mask: u8) {
        if value & TPR_DEFERRED == 0 {
            self.deferred_tpr = None;
            self.apply_prescaler(value, scale_mask);
        } else {
            self.deferred_tpr = Some(value & !TPR_DEFERRED);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn apply_prescaler(&mut self, value: u32, scale_mask: u8) {
        self.clocks_per_tick = ((value >> 16) & 0xFF) + 2;
        self.clock_scale = ((value >> 26) as u8) & scale_mask;
    }

    /// Advances the timer by `clocks` unscaled core clocks.
    pub fn advance(&mut self, clocks: u32, scale_mask: u8) {
        self.residual_clocks = self.residual_clocks.saturating_add(clocks);
        while self.residual_clocks >= self.clocks_per_tick {
            self.residual_clocks -= self.clocks_per_tick;
            if let Some(value) = self.deferred_tpr.take() {
                self.apply_prescaler(value, scale_mask);
            }
            self.counter = self.counter.wrapping_add(1);
            if self.counter == self.compare {
                self.pending = true;
            }
        }
    }
}
