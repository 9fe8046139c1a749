//! External interrupt lines and the fixed priority resolver.

use crate::CoreError;

/// External interrupt input line, sampled into `ISR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IrqLine {
    /// `INT1`, `ISR` bit 0.
    Int1,
    /// `INT2`, `ISR` bit 1.
    Int2,
    /// `INT3`, `ISR` bit 2.
    Int3,
    /// `INT4`, `ISR` bit 3.
    Int4,
    /// `IO1`, `ISR` bit 4.
    Io1,
    /// `IO2`, `ISR` bit 5.
    Io2,
    /// `IO3`, `ISR` bit 6.
    Io3,
}

/// Number of external interrupt lines.
pub const IRQ_LINE_COUNT: u8 = 7;

impl IrqLine {
    /// Every line in `ISR` bit order.
    pub const ALL: [Self; IRQ_LINE_COUNT as usize] = [
        Self::Int1,
        Self::Int2,
        Self::Int3,
        Self::Int4,
        Self::Io1,
        Self::Io2,
        Self::Io3,
    ];

    /// `ISR` bit mask for this line.
    #[must_use]
    pub const fn isr_mask(self) -> u32 {
        1 << (self as u32)
    }

    /// Trap number the line vectors through.
    #[must_use]
    pub const fn trap_number(self) -> u8 {
        match self {
            Self::Int1 => 53,
            Self::Int2 => 52,
            Self::Int3 => 51,
            Self::Int4 => 50,
            Self::Io1 => 49,
            Self::Io2 => 48,
            Self::Io3 => 54,
        }
    }

    /// `FCR` bits that inhibit the line.
    const fn fcr_inhibit(self) -> u32 {
        match self {
            Self::Int1 => 0x1000_0000,
            Self::Int2 => 0x2000_0000,
            Self::Int3 => 0x4000_0000,
            Self::Int4 => 0x8000_0000,
            Self::Io1 => 0x0000_0005,
            Self::Io2 => 0x0000_0050,
            Self::Io3 => 0x0000_0500,
        }
    }
}

impl TryFrom<u8> for IrqLine {
    type Error = CoreError;

    /// Host line numbers `0..7` map to `INT1`-`INT4` (0-3) then `IO1`-`IO3` (4-6).
    /// The timer is internal and has no line number; 7 and above are rejected.
    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(CoreError::InvalidIrqLine(index))
    }
}

/// Trap number of the timer interrupt.
pub const TRAPNO_TIMER: u8 = 55;

/// Interrupt source accepted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptSource {
    /// External input line.
    External(IrqLine),
    /// On-chip timer compare match.
    Timer,
}

impl InterruptSource {
    /// Trap number the source vectors through.
    #[must_use]
    pub const fn trap_number(self) -> u8 {
        match self {
            Self::External(line) => line.trap_number(),
            Self::Timer => TRAPNO_TIMER,
        }
    }
}

// Bits 21..20 pick the timer slot; bit 23 set never matches a slot and masks it.
const FCR_TIMER_PRIORITY: u32 = 0x00B0_0000;

/// Picks the highest-priority interrupt that is asserted and not inhibited.
///
/// The timer's position in the order is selected by `FCR` bits 21..20, and `FCR`
/// bit 23 masks it entirely.
#[must_use]
pub fn highest_priority(isr: u32, fcr: u32, timer_pending: bool) -> Option<InterruptSource> {
    let line_ready = |line: IrqLine| isr & line.isr_mask() != 0 && fcr & line.fcr_inhibit() == 0;
    let timer_ready = |slot: u32| timer_pending && fcr & FCR_TIMER_PRIORITY == slot;

    if line_ready(IrqLine::Io3) {
        return Some(InterruptSource::External(IrqLine::Io3));
    }
    let interleaved = [
        (0x0030_0000, IrqLine::Int1),
        (0x0020_0000, IrqLine::Int2),
        (0x0010_0000, IrqLine::Int3),
        (0x0000_0000, IrqLine::Int4),
    ];
    for (timer_slot, line) in interleaved {
        if timer_ready(timer_slot) {
            return Some(InterruptSource::Timer);
        }
        if line_ready(line) {
            return Some(InterruptSource::External(line));
        }
    }
    [IrqLine::Io1, IrqLine::Io2]
        .into_iter()
        .find(|line| line_ready(*line))
        .map(InterruptSource::External)
}

#[cfg(test)]
mod tests {
    use super::{highest_priority, InterruptSource, IrqLine, TRAPNO_TIMER};
    use crate::CoreError;

    const ALL_LINES: u32 = 0x7F;

    #[test]
    fn io3_outranks_everything() {
        assert_eq!(
            highest_priority(ALL_LINES, 0x0030_0000, true),
            Some(InterruptSource::External(IrqLine::Io3))
        );
    }

    #[test]
    fn timer_priority_slot_is_selected_by_fcr() {
        let isr = IrqLine::Int1.isr_mask() | IrqLine::Int2.isr_mask();
        assert_eq!(
            highest_priority(isr, 0x0030_0000, true),
            Some(InterruptSource::Timer)
        );
        assert_eq!(
            highest_priority(isr, 0x0020_0000, true),
            Some(InterruptSource::External(IrqLine::Int1))
        );
        assert_eq!(
            highest_priority(IrqLine::Int2.isr_mask(), 0x0020_0000, true),
            Some(InterruptSource::Timer)
        );
    }

    #[test]
    fn fcr_inhibit_bits_skip_lines() {
        let isr = IrqLine::Int1.isr_mask() | IrqLine::Io2.isr_mask();
        assert_eq!(
            highest_priority(isr, 0x1000_0000, false),
            Some(InterruptSource::External(IrqLine::Io2))
        );
        assert_eq!(highest_priority(isr, 0x1000_0050, false), None);
    }

    #[test]
    fn lowest_priority_order_ends_with_io1_then_io2() {
        let isr = IrqLine::Io1.isr_mask() | IrqLine::Io2.isr_mask();
        assert_eq!(
            highest_priority(isr, 0, false),
            Some(InterruptSource::External(IrqLine::Io1))
        );
    }

    #[test]
    fn line_index_conversion_rejects_out_of_range() {
        let lines: Vec<IrqLine> = (0u8..7).filter_map(|n| IrqLine::try_from(n).ok()).collect();
        assert_eq!(
            lines,
            vec![
                IrqLine::Int1,
                IrqLine::Int2,
                IrqLine::Int3,
                IrqLine::Int4,
                IrqLine::Io1,
                IrqLine::Io2,
                IrqLine::Io3,
            ]
        );
        assert_eq!(IrqLine::try_from(7), Err(CoreError::InvalidIrqLine(7)));
    }

    #[test]
    fn trap_numbers_follow_vector_table() {
        assert_eq!(InterruptSource::Timer.trap_number(), TRAPNO_TIMER);
        assert_eq!(IrqLine::Int1.trap_number(), 53);
        assert_eq!(IrqLine::Io2.trap_number(), 48);
    }
}
