//! Saturating execution counters kept alongside the architectural state.

use crate::{FaultClass, FaultCode};

/// Core-owned diagnostic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DiagCounters {
    /// The last fault raised, if any.
    pub last_fault_code: Option<FaultCode>,
    /// `PC` of the instruction that raised the last fault.
    pub last_fault_pc: u32,
    /// Range-class exceptions.
    pub fault_count_range: u32,
    /// Privilege-class exceptions.
    pub fault_count_privilege: u32,
    /// Frame-class exceptions.
    pub fault_count_frame: u32,
    /// Trace exceptions.
    pub fault_count_trace: u32,
    /// Fatal faults latched.
    pub fault_count_fatal: u32,
    /// Instructions executed to completion or exception.
    pub instruction_count: u64,
    /// `TRAPxx` instructions that vectored.
    pub trap_count: u32,
    /// Interrupts accepted.
    pub interrupt_count: u32,
    /// Software-emulated opcodes entered.
    pub software_count: u32,
    /// Reserved or illegal operand encodings executed as no-ops.
    pub reserved_count: u32,
}

impl DiagCounters {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fault, updating the last-fault fields and its class counter.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_fault(&mut self, code: FaultCode, pc: u32) {
        self.last_fault_code = Some(code);
        self.last_fault_pc = pc;
        let counter = match code.class() {
            FaultClass::Range => &mut self.fault_count_range,
            FaultClass::Privilege => &mut self.fault_count_privilege,
            FaultClass::Frame => &mut self.fault_count_frame,
            FaultClass::Trace => &mut self.fault_count_trace,
            FaultClass::Fatal => &mut self.fault_count_fatal,
        };
        *counter = counter.saturating_add(1);
    }

    /// Counts one executed instruction.
    pub const fn record_instruction(&mut self) {
        self.instruction_count = self.instruction_count.saturating_add(1);
    }

    /// Counts one vectored `TRAPxx`.
    pub const fn record_trap(&mut self) {
        self.trap_count = self.trap_count.saturating_add(1);
    }

    /// Counts one accepted interrupt.
    pub const fn record_interrupt(&mut self) {
        self.interrupt_count = self.interrupt_count.saturating_add(1);
    }

    /// Counts one software-emulated opcode.
    pub const fn record_software(&mut self) {
        self.software_count = self.software_count.saturating_add(1);
    }

    /// Counts one reserved encoding.
    pub const fn record_reserved(&mut self) {
        self.reserved_count = self.reserved_count.saturating_add(1);
    }

    /// Returns the counter for a fault class.
    #[must_use]
    pub const fn fault_count(&self, class: FaultClass) -> u32 {
        match class {
            FaultClass::Range => self.fault_count_range,
            FaultClass::Privilege => self.fault_count_privilege,
            FaultClass::Frame => self.fault_count_frame,
            FaultClass::Trace => self.fault_count_trace,
            FaultClass::Fatal => self.fault_count_fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DiagCounters;
    use crate::{FaultClass, FaultCode};

    #[test]
    fn record_fault_updates_last_fault_and_class_counter() {
        let mut diag = DiagCounters::new();
        diag.record_fault(FaultCode::PrivilegeError, 0x1000);
        diag.record_fault(FaultCode::RangeError, 0x2000);

        assert_eq!(diag.last_fault_code, Some(FaultCode::RangeError));
        assert_eq!(diag.last_fault_pc, 0x2000);
        assert_eq!(diag.fault_count(FaultClass::Privilege), 1);
        assert_eq!(diag.fault_count(FaultClass::Range), 1);
        assert_eq!(diag.fault_count(FaultClass::Frame), 0);
    }

    #[test]
    fn counters_saturate() {
        let mut diag = DiagCounters {
            fault_count_frame: u32::MAX,
            instruction_count: u64::MAX,
            interrupt_count: u32::MAX,
            ..DiagCounters::default()
        };
        diag.record_fault(FaultCode::FrameError, 0);
        diag.record_instruction();
        diag.record_interrupt();

        assert_eq!(diag.fault_count_frame, u32::MAX);
        assert_eq!(diag.instruction_count, u64::MAX);
        assert_eq!(diag.interrupt_count, u32::MAX);
    }
}
