//! Instruction-accurate CPU core for the Hyperstone E1-32XS RISC family.

/// Public host-facing API contract and integration types.
pub mod api;
pub use api::{
    Bus, BusWidth, CoreConfig, CoreError, CoreSnapshot, CoreState, CoreVariant, RegisterId,
    SnapshotVersion, StepOutcome, TRAPNO_RESET,
};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{ArchitecturalState, DelaySlot, RunState};

/// Fault taxonomy for exceptions and terminal faults.
pub mod fault;
pub use fault::{FaultClass, FaultCode};

/// Saturating execution counters.
pub mod diag;
pub use diag::DiagCounters;

/// External interrupt lines and priority resolution.
pub mod interrupt;
pub use interrupt::{InterruptSource, IrqLine};

/// On-chip timer model.
pub mod timer;
pub use timer::TimerState;

/// Bus-facing memory helpers and trap-entry regions.
pub mod memory;
pub use memory::TrapEntryRegion;

/// Opcode classification tables and branch conditions.
pub mod encoding;
pub use encoding::{classify_opcode, Condition, OpcodeEncoding};

/// Instruction decode pipeline with operand and extension-word resolution.
pub mod decoder;
pub use decoder::{DecodedInstruction, Decoder, OperandRef};

/// Deterministic instruction clock-cost table and lookup helpers.
pub mod timing;
pub use timing::{cycle_cost, CycleCostKind, CYCLE_COST_TABLE};

/// Trap, exception, interrupt and software-emulation entry sequences.
pub mod dispatch;

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{execute, execute_instruction, step_one, ExecuteOutcome, FlagsUpdate};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
