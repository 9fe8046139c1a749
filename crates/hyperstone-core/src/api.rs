//! Public host-facing API contracts for embedding the core.

use thiserror::Error;

use crate::diag::DiagCounters;
use crate::interrupt::{InterruptSource, IrqLine};
use crate::memory::TrapEntryRegion;
use crate::state::registers::{
    ISR_REGISTER, LOCAL_REGISTER_COUNT, MCR_REGISTER, PC_REGISTER, SR_L, SR_REGISTER, SR_S,
    SP_REGISTER, TCR_REGISTER, TPR_REGISTER, TR_REGISTER, UB_REGISTER,
};
use crate::state::{ArchitecturalState, DelaySlot, RunState, GLOBAL_REGISTER_COUNT};
use crate::timer::TimerState;
use crate::FaultCode;

/// Trap number of the reset vector.
pub const TRAPNO_RESET: u8 = 62;

/// External data bus width of a chip variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusWidth {
    /// Word accesses are composed from two half-word bus cycles.
    Bits16,
    /// Word accesses are single bus cycles.
    Bits32,
}

/// Supported members of the processor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum CoreVariant {
    E116T,
    E116XT,
    E116XS,
    E116XSR,
    E132N,
    E132T,
    E132XN,
    E132XT,
    #[default]
    E132XS,
    E132XSR,
    Gms30C2116,
    Gms30C2132,
    Gms30C2216,
    Gms30C2232,
}

impl CoreVariant {
    /// External bus width.
    #[must_use]
    pub const fn bus_width(self) -> BusWidth {
        match self {
            Self::E116T
            | Self::E116XT
            | Self::E116XS
            | Self::E116XSR
            | Self::Gms30C2116
            | Self::Gms30C2216 => BusWidth::Bits16,
            Self::E132N
            | Self::E132T
            | Self::E132XN
            | Self::E132XT
            | Self::E132XS
            | Self::E132XSR
            | Self::Gms30C2132
            | Self::Gms30C2232 => BusWidth::Bits32,
        }
    }

    /// Mask applied to the `TPR` clock-scale field.
    #[must_use]
    pub const fn clock_scale_mask(self) -> u8 {
        match self {
            Self::E116T
            | Self::E132N
            | Self::E132T
            | Self::Gms30C2116
            | Self::Gms30C2132
            | Self::Gms30C2216
            | Self::Gms30C2232 => 0,
            Self::E116XT | Self::E132XN | Self::E132XT => 3,
            Self::E116XS | Self::E116XSR | Self::E132XS | Self::E132XSR => 7,
        }
    }
}

/// Top-level configuration for a core instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Chip variant being emulated.
    pub variant: CoreVariant,
    /// Burns half a timer tick on every `TR` read to shorten polling loops.
    pub timer_poll_skip: bool,
}

/// Host bus consumed by the core.
///
/// Program-space addresses arrive already aligned to the access size.
pub trait Bus {
    /// Reads a byte from program space.
    fn read_byte(&mut self, addr: u32) -> u8;
    /// Reads a big-endian half-word from program space.
    fn read_half(&mut self, addr: u32) -> u16;
    /// Reads a big-endian word from program space.
    fn read_word(&mut self, addr: u32) -> u32;
    /// Writes a byte to program space.
    fn write_byte(&mut self, addr: u32, value: u8);
    /// Writes a big-endian half-word to program space.
    fn write_half(&mut self, addr: u32, value: u16);
    /// Writes a big-endian word to program space.
    fn write_word(&mut self, addr: u32, value: u32);
    /// Reads a word from I/O space.
    fn io_read_word(&mut self, addr: u32) -> u32;
    /// Writes a word to I/O space.
    fn io_write_word(&mut self, addr: u32, value: u32);

    /// Called once each time an external interrupt line is accepted.
    fn acknowledge_interrupt(&mut self, _line: IrqLine) {}
}

/// Errors reported by the host-facing control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CoreError {
    /// Snapshot was produced by an incompatible schema revision.
    #[error("unsupported snapshot version {0}")]
    UnsupportedSnapshotVersion(u16),
    /// Snapshot state does not have the architectural register layout.
    #[error("snapshot register layout is malformed")]
    MalformedSnapshot,
    /// Register identifier is out of range.
    #[error("register {0:?} does not exist")]
    InvalidRegister(RegisterId),
    /// Interrupt line index is out of range.
    #[error("interrupt line {0} does not exist")]
    InvalidIrqLine(u8),
}

/// Symbolic register identifier used by the debugger surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterId {
    /// Global register `G0..G31`.
    Global(u8),
    /// Local register relative to the current frame pointer, `L0..L63`.
    Local(u8),
    /// Physical local register slot `0..63`, ignoring the frame pointer.
    PhysicalLocal(u8),
}

impl RegisterId {
    /// Program counter.
    pub const PC: Self = Self::Global(PC_REGISTER);
    /// Status register.
    pub const SR: Self = Self::Global(SR_REGISTER);
    /// Stack pointer.
    pub const SP: Self = Self::Global(SP_REGISTER);
    /// Upper stack bound.
    pub const UB: Self = Self::Global(UB_REGISTER);

    const fn in_range(self) -> bool {
        match self {
            Self::Global(index) => (index as usize) < GLOBAL_REGISTER_COUNT,
            Self::Local(index) | Self::PhysicalLocal(index) => {
                (index as usize) < LOCAL_REGISTER_COUNT
            }
        }
    }
}

/// Output status from one instruction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Instruction completed normally.
    Retired {
        /// Cycles charged after clock scaling.
        cycles: u32,
    },
    /// A `TRAPxx` instruction vectored.
    TrapDispatch {
        /// Trap number taken.
        trap_number: u8,
        /// Cycles charged after clock scaling.
        cycles: u32,
    },
    /// An instruction raised an exception that vectored.
    ExceptionDispatch {
        /// Exception raised.
        cause: FaultCode,
        /// Cycles charged after clock scaling.
        cycles: u32,
    },
    /// An interrupt was accepted at the boundary.
    InterruptDispatch {
        /// Interrupt source accepted.
        source: InterruptSource,
        /// Cycles charged after clock scaling.
        cycles: u32,
    },
    /// A software-emulated opcode entered its emulation routine.
    SoftwareDispatch {
        /// Opcode high byte.
        opcode: u8,
        /// Cycles charged after clock scaling.
        cycles: u32,
    },
    /// A terminal fault is latched; nothing executed.
    Fault {
        /// Latched fault.
        cause: FaultCode,
    },
}

impl StepOutcome {
    /// Cycles consumed by this step.
    #[must_use]
    pub const fn cycles(self) -> u32 {
        match self {
            Self::Retired { cycles }
            | Self::TrapDispatch { cycles, .. }
            | Self::ExceptionDispatch { cycles, .. }
            | Self::InterruptDispatch { cycles, .. }
            | Self::SoftwareDispatch { cycles, .. } => cycles,
            Self::Fault { .. } => 0,
        }
    }
}

/// Stable snapshot schema identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum SnapshotVersion {
    /// Initial schema revision.
    V1 = 1,
}

impl SnapshotVersion {
    /// Converts a wire value to a known snapshot version.
    #[must_use]
    pub const fn from_u16(version: u16) -> Option<Self> {
        match version {
            1 => Some(Self::V1),
            _ => None,
        }
    }

    /// Wire value of this version.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Versioned whole-state context blob.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreSnapshot {
    /// Snapshot schema version as written on the wire.
    pub version: u16,
    /// Complete core state.
    pub state: CoreState,
}

/// Complete core state: registers, timer, delay slot and control latches.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreState {
    /// Configuration the state was created with.
    pub config: CoreConfig,
    /// Global and local register file.
    pub arch: ArchitecturalState,
    /// On-chip timer.
    pub timer: TimerState,
    /// Delayed-branch record.
    pub delay: DelaySlot,
    /// Region holding the trap vector table.
    pub trap_entry: TrapEntryRegion,
    /// Instruction issues left before interrupts may be accepted.
    pub interrupt_block: u8,
    /// Current execution state.
    pub run_state: RunState,
    /// Diagnostic counters.
    pub diag: DiagCounters,
    /// Extra clocks charged to the current instruction by `TR` polling.
    pub stall_clocks: u32,
}

impl Default for CoreState {
    fn default() -> Self {
        Self::with_config(&CoreConfig::default())
    }
}

impl CoreState {
    /// Creates a core in its reset state.
    #[must_use]
    pub fn with_config(config: &CoreConfig) -> Self {
        let mut state = Self {
            config: *config,
            arch: ArchitecturalState::default(),
            timer: TimerState::default(),
            delay: DelaySlot::Idle,
            trap_entry: TrapEntryRegion::Mem3,
            interrupt_block: 0,
            run_state: RunState::Running,
            diag: DiagCounters::default(),
            stall_clocks: 0,
        };
        state.reset();
        state
    }

    /// Applies reset semantics.
    ///
    /// The core resumes at the `MEM3` reset vector in supervisor state with
    /// interrupts locked, `FP = 0` and `FL = 2`. `L0` holds the return `PC|S`
    /// and `L1` the `SR`. Input line levels held in `ISR` survive reset.
    pub fn reset(&mut self) {
        let input_lines = self.arch.global(ISR_REGISTER);
        self.arch = ArchitecturalState::default();
        self.arch.set_global(ISR_REGISTER, input_lines);
        self.timer = TimerState::default();
        self.delay = DelaySlot::Idle;
        self.trap_entry = TrapEntryRegion::Mem3;
        self.interrupt_block = 0;
        self.run_state = RunState::Running;
        self.stall_clocks = 0;

        self.arch.set_fl(2);
        self.arch.set_fp(0);
        self.arch.set_flag(SR_S | SR_L, true);
        self.arch.set_ilc(1);
        self.arch.set_pc(self.trap_entry.trap_vector(TRAPNO_RESET));

        let return_pc = self.arch.pc() | self.arch.supervisor_bit();
        self.arch.set_local(0, return_pc);
        let sr = self.arch.sr();
        self.arch.set_local(1, sr);
    }

    /// Drives an external interrupt input line.
    pub fn set_irq_line(&mut self, line: IrqLine, asserted: bool) {
        let isr = self.arch.global(ISR_REGISTER);
        let isr = if asserted {
            isr | line.isr_mask()
        } else {
            isr & !line.isr_mask()
        };
        self.arch.set_global(ISR_REGISTER, isr);
    }

    /// Returns `true` when the line is currently asserted.
    #[must_use]
    pub const fn irq_line(&self, line: IrqLine) -> bool {
        self.arch.global(ISR_REGISTER) & line.isr_mask() != 0
    }

    /// Reads a register for the debugger surface.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRegister`] when `id` is out of range.
    pub fn register(&self, id: RegisterId) -> Result<u32, CoreError> {
        if !id.in_range() {
            return Err(CoreError::InvalidRegister(id));
        }
        Ok(match id {
            RegisterId::Global(TR_REGISTER) => self.timer.counter(),
            RegisterId::Global(index) => self.arch.global(index),
            RegisterId::Local(index) => self.arch.local(u32::from(index)),
            RegisterId::PhysicalLocal(index) => self.arch.physical_local(u32::from(index)),
        })
    }

    /// Writes a register for the debugger surface.
    ///
    /// `SR` is replaced in full, including `FP` and `FL`. Timer and
    /// memory-control registers keep their side effects.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRegister`] when `id` is out of range.
    pub fn set_register(&mut self, id: RegisterId, value: u32) -> Result<(), CoreError> {
        if !id.in_range() {
            return Err(CoreError::InvalidRegister(id));
        }
        match id {
            RegisterId::Global(PC_REGISTER) => self.arch.set_pc(value),
            RegisterId::Global(SR_REGISTER) => self.arch.set_sr(value),
            RegisterId::Global(ISR_REGISTER) => self.arch.set_global(ISR_REGISTER, value),
            RegisterId::Global(
                index @ (SP_REGISTER | UB_REGISTER | TR_REGISTER | TCR_REGISTER | TPR_REGISTER
                | MCR_REGISTER),
            ) => crate::execute::write_global(self, index, value),
            RegisterId::Global(index) => self.arch.set_global(index, value),
            RegisterId::Local(index) => self.arch.set_local(u32::from(index), value),
            RegisterId::PhysicalLocal(index) => {
                self.arch.set_physical_local(u32::from(index), value);
            }
        }
        Ok(())
    }

    /// Captures the whole state as a versioned context blob.
    #[must_use]
    pub fn snapshot(&self) -> CoreSnapshot {
        CoreSnapshot {
            version: SnapshotVersion::V1.as_u16(),
            state: self.clone(),
        }
    }

    /// Replaces the whole state with a previously captured context blob.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedSnapshotVersion`] for unknown schema
    /// versions and [`CoreError::MalformedSnapshot`] when the register layout
    /// does not match.
    pub fn restore(&mut self, snapshot: &CoreSnapshot) -> Result<(), CoreError> {
        if SnapshotVersion::from_u16(snapshot.version).is_none() {
            return Err(CoreError::UnsupportedSnapshotVersion(snapshot.version));
        }
        if !snapshot.state.arch.is_well_formed() {
            return Err(CoreError::MalformedSnapshot);
        }
        self.clone_from(&snapshot.state);
        Ok(())
    }

    /// Applies an active delayed branch before `PC` is read or replaced.
    pub fn resolve_delay_slot(&mut self) {
        if let Some(target) = self.delay.active_target() {
            self.arch.set_pc(target);
            self.delay = DelaySlot::Idle;
        }
    }

    /// Runs instructions until at least `cycle_budget` cycles are consumed.
    ///
    /// Returns the cycles actually consumed.
    pub fn execute(&mut self, bus: &mut dyn Bus, cycle_budget: u32) -> u32 {
        crate::execute::execute(self, bus, cycle_budget)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BusWidth, CoreConfig, CoreError, CoreState, CoreVariant, RegisterId, SnapshotVersion,
        StepOutcome,
    };
    use crate::interrupt::IrqLine;
    use crate::state::registers::{SR_L, SR_S};
    use crate::{DelaySlot, FaultCode, RunState};

    #[test]
    fn default_config_targets_e132xs_without_poll_skip() {
        let config = CoreConfig::default();
        assert_eq!(config.variant, CoreVariant::E132XS);
        assert!(!config.timer_poll_skip);
    }

    #[test]
    fn variants_report_bus_width_and_scale_mask() {
        assert_eq!(CoreVariant::E116XT.bus_width(), BusWidth::Bits16);
        assert_eq!(CoreVariant::Gms30C2216.bus_width(), BusWidth::Bits16);
        assert_eq!(CoreVariant::E132XSR.bus_width(), BusWidth::Bits32);
        assert_eq!(CoreVariant::E132N.clock_scale_mask(), 0);
        assert_eq!(CoreVariant::E132XT.clock_scale_mask(), 3);
        assert_eq!(CoreVariant::E116XS.clock_scale_mask(), 7);
    }

    #[test]
    fn reset_enters_mem3_vector_in_supervisor_state() {
        let state = CoreState::default();

        assert_eq!(state.arch.pc(), 0xFFFF_FFF8);
        assert_eq!(state.arch.fp(), 0);
        assert_eq!(state.arch.fl(), 2);
        assert_eq!(state.arch.ilc(), 1);
        assert!(state.arch.flag(SR_S | SR_L));
        assert_eq!(state.arch.local(0), 0xFFFF_FFF9);
        assert_eq!(state.arch.local(1), state.arch.sr());
        assert_eq!(state.timer.clocks_per_tick(), 2);
    }

    #[test]
    fn reset_clears_latches_but_keeps_input_lines() {
        let mut state = CoreState::default();
        state.set_irq_line(IrqLine::Int2, true);
        state.delay = DelaySlot::Pending(0x100);
        state.interrupt_block = 2;
        state.run_state = RunState::FaultLatched(FaultCode::UnsupportedHardwareLoop);

        state.reset();

        assert_eq!(state.delay, DelaySlot::Idle);
        assert_eq!(state.interrupt_block, 0);
        assert_eq!(state.run_state, RunState::Running);
        assert!(state.irq_line(IrqLine::Int2));
    }

    #[test]
    fn register_surface_rejects_out_of_range_ids() {
        let mut state = CoreState::default();
        assert_eq!(
            state.register(RegisterId::Global(32)),
            Err(CoreError::InvalidRegister(RegisterId::Global(32)))
        );
        assert_eq!(
            state.set_register(RegisterId::Local(64), 0),
            Err(CoreError::InvalidRegister(RegisterId::Local(64)))
        );
    }

    #[test]
    fn register_surface_reads_windowed_and_physical_locals() {
        let mut state = CoreState::default();
        state
            .set_register(RegisterId::SR, 5 << 25)
            .expect("sr write");
        state
            .set_register(RegisterId::Local(2), 0xABCD)
            .expect("local write");

        assert_eq!(state.register(RegisterId::PhysicalLocal(7)), Ok(0xABCD));
        assert_eq!(state.register(RegisterId::Local(2)), Ok(0xABCD));
    }

    #[test]
    fn register_surface_masks_pc_and_sp() {
        let mut state = CoreState::default();
        state.set_register(RegisterId::PC, 0x1001).expect("pc write");
        state.set_register(RegisterId::SP, 0x2003).expect("sp write");

        assert_eq!(state.register(RegisterId::PC), Ok(0x1000));
        assert_eq!(state.register(RegisterId::SP), Ok(0x2000));
    }

    #[test]
    fn snapshot_restore_roundtrips_and_checks_version() {
        let mut state = CoreState::default();
        state.arch.set_global(5, 0x55);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.version, SnapshotVersion::V1.as_u16());

        let mut other = CoreState::default();
        other.restore(&snapshot).expect("restore should succeed");
        assert_eq!(other, state);

        let mut stale = snapshot;
        stale.version = 9;
        assert_eq!(
            other.restore(&stale),
            Err(CoreError::UnsupportedSnapshotVersion(9))
        );
    }

    #[test]
    fn resolve_delay_slot_only_applies_active_targets() {
        let mut state = CoreState::default();
        state.delay = DelaySlot::Pending(0x400);
        state.resolve_delay_slot();
        assert_eq!(state.delay, DelaySlot::Pending(0x400));

        state.delay = DelaySlot::Active(0x400);
        state.resolve_delay_slot();
        assert_eq!(state.arch.pc(), 0x400);
        assert_eq!(state.delay, DelaySlot::Idle);
    }

    #[test]
    fn fault_outcome_consumes_no_cycles() {
        let outcome = StepOutcome::Fault {
            cause: FaultCode::UnsupportedHardwareLoop,
        };
        assert_eq!(outcome.cycles(), 0);
        assert_eq!(StepOutcome::Retired { cycles: 3 }.cycles(), 3);
    }
}
