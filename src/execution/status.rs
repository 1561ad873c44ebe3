//! Run and Step States
//!
//! ```text
//! Fresh ──┐                 per step:
//!         ├──> (steps) ──>  Pending ──> Running ──> Completed
//! Resumed ┘       │                        └──────> Failed
//!                 ├──> AllDone
//!                 └──> Halted
//! ```
//!
//! Steps already recorded in the progress file go straight from `Pending` to
//! `Skipped`.

use std::fmt;

/// Where a workflow run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// No earlier progress was found
    Fresh,

    /// Earlier progress with at least one completed step was loaded
    Resumed,

    /// Every step is complete (terminal)
    AllDone,

    /// A step failed or progress could not be saved (terminal)
    Halted,
}

impl RunPhase {
    /// Returns true for `AllDone` and `Halted`.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::AllDone | Self::Halted)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fresh => "fresh",
            Self::Resumed => "resumed",
            Self::AllDone => "all done",
            Self::Halted => "halted",
        };
        f.write_str(name)
    }
}

/// Where a single step stands within the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Skipped,
    Failed,
}

impl StepStatus {
    /// Returns true once the step will not change again in this run.
    #[inline]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Failed)
    }

    /// Returns true if this status may be followed by `next`.
    pub const fn can_become(self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Skipped)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
