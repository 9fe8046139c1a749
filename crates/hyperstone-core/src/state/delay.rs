/// Delayed-branch record checked at instruction boundaries.
///
/// A taken `DBxx` arms `Pending`. The next instruction boundary promotes it to
/// `Active`, meaning the instruction now executing sits in the delay slot. Once
/// that instruction completes the core jumps to the stored target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DelaySlot {
    /// No delayed branch in flight.
    #[default]
    Idle,
    /// A delayed branch was taken by the instruction that just completed.
    Pending(u32),
    /// The current instruction executes in the delay slot of a branch to the target.
    Active(u32),
}

impl DelaySlot {
    /// Promotes `Pending` to `Active` at an instruction boundary.
    #[must_use]
    pub const fn promoted(self) -> Self {
        match self {
            Self::Pending(target) => Self::Active(target),
            other => other,
        }
    }

    /// Returns `true` while a delayed branch is pending or active.
    #[must_use]
    pub const fn in_flight(self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Target of an active delay slot.
    #[must_use]
    pub const fn active_target(self) -> Option<u32> {
        match self {
            Self::Active(target) => Some(target),
            Self::Idle | Self::Pending(_) => None,
        }
    }
}
