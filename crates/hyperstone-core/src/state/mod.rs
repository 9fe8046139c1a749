//! Architectural CPU state model primitives.

/// Delayed-branch record.
pub mod delay;
/// Global and windowed local register file.
pub mod registers;
/// Host-observable execution state.
pub mod run_state;

pub use delay::DelaySlot;
pub use registers::{ArchitecturalState, GLOBAL_REGISTER_COUNT, LOCAL_REGISTER_COUNT};
pub use run_state::RunState;
