//! Stepper motor driver trait
//!
//! This trait abstracts over STEP/DIR style drivers (A4988, DRV8825,
//! TMC2209 in standalone mode, etc.)

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Motor rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Clockwise rotation (carousel forward)
    #[default]
    Clockwise,
    /// Counter-clockwise rotation
    CounterClockwise,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// Pulse rate used for the next steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StepRate {
    /// Fast rate used while seeking the home reference
    Seek,
    /// Slow rate used for indexing and alignment
    #[default]
    Precise,
}

/// Errors that can occur with stepper operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperError {
    /// A STEP, DIR or ENABLE line could not be driven
    PinFault,
    /// The driver asserted its fault line
    DriverFault,
}

/// Trait for stepper motor drivers
///
/// Steps are issued one at a time so the caller can interleave sensor
/// reads. A pulse is never interrupted once started.
#[allow(async_fn_in_trait)]
pub trait StepperDriver {
    /// Energize or release the motor
    ///
    /// When disabled, the motor is free to rotate and does not hold position.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), StepperError>;

    /// Check if the motor is energized
    fn is_enabled(&self) -> bool;

    /// Set the rotation direction
    fn set_direction(&mut self, dir: Direction) -> Result<(), StepperError>;

    /// Select the pulse rate for subsequent steps
    fn set_rate(&mut self, rate: StepRate);

    /// Issue one complete step pulse
    async fn step(&mut self) -> Result<(), StepperError>;

    /// Check the driver fault line
    fn is_faulted(&mut self) -> bool;
}
