//! Bus-facing memory helpers and the trap-entry region map.

/// Width-aware program and I/O space accessors.
pub mod access;
/// Trap-entry regions and vector address computation.
pub mod map;

pub use access::io_address;
pub use map::{TrapEntryRegion, IRAM_ENTRY, MEM0_ENTRY, MEM1_ENTRY, MEM2_ENTRY, MEM3_ENTRY};
