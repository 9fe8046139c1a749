use thiserror::Error;

/// Fault classes used for diagnostics aggregation and dispatch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Operand or result outside the permitted range.
    Range,
    /// Supervisor-only state touched from user mode.
    Privilege,
    /// Register-window spill crossed the upper stack bound.
    Frame,
    /// Single-step trace exception.
    Trace,
    /// Unrecoverable condition that halts the core.
    Fatal,
}

/// Exception taxonomy raised by instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// CHK, XM, DIVx, signed arithmetic overflow or signed narrow store out of range.
    #[error("range error")]
    RangeError = 0x01,
    /// Privileged state change attempted from user mode.
    #[error("privilege error")]
    PrivilegeError = 0x02,
    /// FRAME spilled registers while the stack pointer was at or above the upper bound.
    #[error("frame error")]
    FrameError = 0x03,
    /// Trace mode single-step exception.
    #[error("trace exception")]
    TraceException = 0x04,
    /// `DO` hardware-loop opcode, which the core does not model.
    #[error("unsupported hardware loop instruction")]
    UnsupportedHardwareLoop = 0x05,
}

/// Trap number shared by range, privilege and frame errors.
pub const TRAPNO_RANGE_ERROR: u8 = 60;
/// Trap number of the trace exception.
pub const TRAPNO_TRACE_EXCEPTION: u8 = 57;

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::RangeError),
            0x02 => Some(Self::PrivilegeError),
            0x03 => Some(Self::FrameError),
            0x04 => Some(Self::TraceException),
            0x05 => Some(Self::UnsupportedHardwareLoop),
            _ => None,
        }
    }

    /// Returns the diagnostics fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::RangeError => FaultClass::Range,
            Self::PrivilegeError => FaultClass::Privilege,
            Self::FrameError => FaultClass::Frame,
            Self::TraceException => FaultClass::Trace,
            Self::UnsupportedHardwareLoop => FaultClass::Fatal,
        }
    }

    /// Faults that halt the core instead of entering an exception vector.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::UnsupportedHardwareLoop)
    }

    /// Trap number used to vector this fault, or `None` for terminal faults.
    #[must_use]
    pub const fn trap_number(self) -> Option<u8> {
        match self {
            Self::RangeError | Self::PrivilegeError | Self::FrameError => {
                Some(TRAPNO_RANGE_ERROR)
            }
            Self::TraceException => Some(TRAPNO_TRACE_EXCEPTION),
            Self::UnsupportedHardwareLoop => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FaultClass, FaultCode, TRAPNO_RANGE_ERROR, TRAPNO_TRACE_EXCEPTION};

    #[test]
    fn stable_code_roundtrip_is_bijective_for_defined_values() {
        for code in 0x01u8..=0x05 {
            let fault = FaultCode::from_u8(code).expect("defined taxonomy code");
            assert_eq!(fault.as_u8(), code);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(FaultCode::from_u8(0x00).is_none());
        assert!(FaultCode::from_u8(0x06).is_none());
    }

    #[test]
    fn only_hardware_loop_is_terminal() {
        assert!(FaultCode::UnsupportedHardwareLoop.is_terminal());
        assert!(!FaultCode::RangeError.is_terminal());
        assert!(!FaultCode::TraceException.is_terminal());
    }

    #[test]
    fn range_privilege_and_frame_share_one_vector() {
        assert_eq!(FaultCode::RangeError.trap_number(), Some(TRAPNO_RANGE_ERROR));
        assert_eq!(FaultCode::PrivilegeError.trap_number(), Some(TRAPNO_RANGE_ERROR));
        assert_eq!(FaultCode::FrameError.trap_number(), Some(TRAPNO_RANGE_ERROR));
        assert_eq!(
            FaultCode::TraceException.trap_number(),
            Some(TRAPNO_TRACE_EXCEPTION)
        );
        assert_eq!(FaultCode::UnsupportedHardwareLoop.trap_number(), None);
    }

    #[test]
    fn class_mapping_matches_fault_taxonomy() {
        assert_eq!(FaultCode::RangeError.class(), FaultClass::Range);
        assert_eq!(FaultCode::PrivilegeError.class(), FaultClass::Privilege);
        assert_eq!(FaultCode::FrameError.class(), FaultClass::Frame);
        assert_eq!(FaultCode::TraceException.class(), FaultClass::Trace);
        assert_eq!(FaultCode::UnsupportedHardwareLoop.class(), FaultClass::Fatal);
    }
}
