//! State machine definition
//!
//! Every hardware action of the runner happens inside one of these
//! states; the runner moves between them only through
//! [`RunState::transition`].

use super::trigger::Trigger;
use crate::error::RunError;

/// Run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunState {
    /// Constructed, not started
    #[default]
    Idle,
    /// Seeking the home reference
    Homing,
    /// Between plates, deciding what to do with the current one
    Running,
    /// Illumination on, waiting for the plate to settle
    Settling,
    /// Focusing and capturing
    Capturing,
    /// Moving to the next plate
    Advancing,
    /// Cycle done, waiting for the next cycle start
    WaitingForNextCycle,
    /// Cancel requested, safing hardware
    Cancelling,
    /// Run finished, normally or cancelled
    Completed,
    /// Run aborted by a fault
    Failed(RunError),
}

impl RunState {
    /// Check if the motor may move in this state
    pub fn motor_allowed(&self) -> bool {
        matches!(self, RunState::Homing | RunState::Advancing)
    }

    /// Check if illumination may be on in this state
    pub fn illumination_allowed(&self) -> bool {
        matches!(self, RunState::Settling | RunState::Capturing)
    }

    /// Check if this is a fault state
    pub fn is_failed(&self) -> bool {
        matches!(self, RunState::Failed(_))
    }

    /// Check if the run is over
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed(_))
    }

    /// Short name for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "Idle",
            RunState::Homing => "Homing",
            RunState::Running => "Running",
            RunState::Settling => "Settling",
            RunState::Capturing => "Capturing",
            RunState::Advancing => "Advancing",
            RunState::WaitingForNextCycle => "WaitingForNextCycle",
            RunState::Cancelling => "Cancelling",
            RunState::Completed => "Completed",
            RunState::Failed(_) => "Failed",
        }
    }

    /// Process a trigger and return the next state
    ///
    /// Triggers that do not apply to the current state leave it unchanged.
    pub fn transition(self, trigger: Trigger) -> Self {
        use RunState::*;
        use Trigger::*;

        match (self, trigger) {
            // Terminal states never change
            (Completed, _) | (Failed(_), _) => self,

            // Cancellation from any live state
            (Cancelling, HardwareSafed) => Completed,
            (Cancelling, Fault(e)) => Failed(e),
            (_, CancelRequested) => Cancelling,

            // Startup
            (Idle, Start) => Homing,
            (Homing, Homed) => Running,
            (Homing, Fault(e)) => Failed(e),

            // Plate protocol
            (Running, SelectPlate) => Settling,
            (Running, SkipPlate) => Advancing,
            (Running, Fault(e)) => Failed(e),
            (Settling, SettleElapsed) => Capturing,
            (Settling, Fault(e)) => Failed(e),
            (Capturing, CaptureDone) => Advancing,
            (Capturing, Fault(e)) => Failed(e),
            (Advancing, PlatesRemaining) => Running,
            (Advancing, CycleFinished) => WaitingForNextCycle,
            (Advancing, RunFinished) => Completed,
            (Advancing, Fault(e)) => Failed(e),

            // Scheduling
            (WaitingForNextCycle, IntervalElapsed) => Running,
            (WaitingForNextCycle, RunFinished) => Completed,
            (WaitingForNextCycle, Fault(e)) => Failed(e),

            // Default: stay in current state
            _ => self,
        }
    }
}
