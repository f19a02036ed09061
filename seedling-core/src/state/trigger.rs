//! Triggers that drive run state transitions

use crate::error::RunError;

/// Things that happen to a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    // Lifecycle
    /// Run started
    Start,
    /// Carousel homed
    Homed,

    // Per-plate protocol
    /// Current plate is selected for imaging
    SelectPlate,
    /// Current plate is not selected and is passed through
    SkipPlate,
    /// Settle period elapsed
    SettleElapsed,
    /// Capture finished, successfully or with a skipped capture
    CaptureDone,
    /// Advance finished and more plates remain in this cycle
    PlatesRemaining,
    /// Advance wrapped back to plate 1
    CycleFinished,

    // Scheduling
    /// Cycle interval elapsed
    IntervalElapsed,
    /// Duration or cycle limit reached
    RunFinished,

    // Shutdown
    /// Cancel was requested
    CancelRequested,
    /// Outputs are off and the motor is stationary
    HardwareSafed,
    /// Unrecoverable fault
    Fault(RunError),
}
