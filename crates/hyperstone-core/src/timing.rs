/// Instruction and dispatch forms that have fixed clock costs in the core.
///
/// Costs are in core clocks before the TPR clock-scale shift is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleCostKind {
    /// Register/immediate ALU, move, compare and logic class.
    Alu,
    /// `MOVD` and `RET`.
    MoveDouble,
    /// `DIVU` / `DIVS`.
    Divide,
    /// `MUL` with both operands in signed 16-bit range.
    MulShort,
    /// `MUL` with a wide operand.
    MulLong,
    /// `MULU` / `MULS` with both operands in 16-bit range.
    MulDoubleShort,
    /// `MULU` / `MULS` with a wide operand.
    MulDoubleLong,
    /// `TESTLZ`.
    TestLeadingZeros,
    /// Single-word load or store.
    Load,
    /// Double-word load or store.
    LoadDouble,
    /// Stack-cached `LDW.S` / `STW.S`.
    StackCached,
    /// Conditional branch when the condition is false.
    BranchNotTaken,
    /// Branch that transfers control.
    BranchTaken,
    /// Delayed branch, taken or not.
    DelayedBranch,
    /// `CALL`.
    Call,
    /// `FRAME`.
    Frame,
    /// `EXTEND` DSP operation.
    Extend,
    /// `TRAPxx` issue.
    TrapIssue,
    /// Trap, exception or interrupt entry sequence.
    DispatchEntry,
    /// Software-emulated opcode entry sequence.
    SoftwareEntry,
}

/// Single source-of-truth clock-cost table.
pub const CYCLE_COST_TABLE: &[(CycleCostKind, u16)] = &[
    (CycleCostKind::Alu, 1),
    (CycleCostKind::MoveDouble, 2),
    (CycleCostKind::Divide, 36),
    (CycleCostKind::MulShort, 3),
    (CycleCostKind::MulLong, 5),
    (CycleCostKind::MulDoubleShort, 4),
    (CycleCostKind::MulDoubleLong, 6),
    (CycleCostKind::TestLeadingZeros, 2),
    (CycleCostKind::Load, 1),
    (CycleCostKind::LoadDouble, 2),
    (CycleCostKind::StackCached, 3),
    (CycleCostKind::BranchNotTaken, 1),
    (CycleCostKind::BranchTaken, 2),
    (CycleCostKind::DelayedBranch, 1),
    (CycleCostKind::Call, 1),
    (CycleCostKind::Frame, 1),
    (CycleCostKind::Extend, 1),
    (CycleCostKind::TrapIssue, 1),
    (CycleCostKind::DispatchEntry, 2),
    (CycleCostKind::SoftwareEntry, 6),
];

/// Looks up the clock cost for a cycle-cost kind.
#[must_use]
pub fn cycle_cost(kind: CycleCostKind) -> Option<u16> {
    CYCLE_COST_TABLE
        .iter()
        .find_map(|(entry_kind, cycles)| (*entry_kind == kind).then_some(*cycles))
}

/// Table lookup that falls back to one clock for kinds missing from the table.
#[must_use]
pub(crate) fn clocks(kind: CycleCostKind) -> u32 {
    u32::from(cycle_cost(kind).unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{clocks, cycle_cost, CycleCostKind, CYCLE_COST_TABLE};

    #[test]
    fn table_contains_unique_kinds() {
        let kinds: HashSet<_> = CYCLE_COST_TABLE.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds.len(), CYCLE_COST_TABLE.len());
    }

    #[test]
    fn table_values_match_canonical_costs() {
        assert_eq!(cycle_cost(CycleCostKind::Alu), Some(1));
        assert_eq!(cycle_cost(CycleCostKind::Divide), Some(36));
        assert_eq!(cycle_cost(CycleCostKind::MulShort), Some(3));
        assert_eq!(cycle_cost(CycleCostKind::MulDoubleLong), Some(6));
        assert_eq!(cycle_cost(CycleCostKind::BranchTaken), Some(2));
        assert_eq!(cycle_cost(CycleCostKind::DispatchEntry), Some(2));
        assert_eq!(cycle_cost(CycleCostKind::SoftwareEntry), Some(6));
    }

    #[test]
    fn every_table_entry_resolves_via_lookup() {
        for (kind, expected_cycles) in CYCLE_COST_TABLE {
            assert_eq!(cycle_cost(*kind), Some(*expected_cycles));
            assert_eq!(clocks(*kind), u32::from(*expected_cycles));
        }
    }
}
