//! Run-level error taxonomy
//!
//! Each hardware layer has its own small error enum. They all collapse into
//! [`RunError`], which is what the runner reports in `RunFailed` events and
//! the `Failed` state.

use core::fmt;

use crate::motion::MotorError;
use crate::traits::{CameraError, IlluminationError, SensorError, StepperError};

/// Errors that end or degrade an experiment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunError {
    /// A carousel move was requested before homing
    NotHomed,
    /// Hall reference not found within the homing step limit
    HomingTimeout,
    /// Stepper driver or position sensor failure
    MotorFault,
    /// Marker not re-acquired within the drift retry limit
    DriftCorrectionFailed,
    /// Camera failure
    CaptureError(CameraError),
    /// LED output failure
    IlluminationFault,
    /// The run was cancelled
    CancelledByUser,
}

impl RunError {
    /// Human-readable reason
    pub const fn reason(&self) -> &'static str {
        match self {
            RunError::NotHomed => "carousel is not homed",
            RunError::HomingTimeout => "home reference not detected",
            RunError::MotorFault => "motor fault",
            RunError::DriftCorrectionFailed => "drift correction did not re-align the carousel",
            RunError::CaptureError(e) => e.as_str(),
            RunError::IlluminationFault => "illumination fault",
            RunError::CancelledByUser => "cancelled by user",
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl From<MotorError> for RunError {
    fn from(e: MotorError) -> Self {
        match e {
            MotorError::NotHomed => RunError::NotHomed,
            MotorError::HomingTimeout => RunError::HomingTimeout,
            MotorError::Stepper(_) | MotorError::Sensor(_) | MotorError::InvalidGeometry => {
                RunError::MotorFault
            }
            MotorError::Cancelled => RunError::CancelledByUser,
        }
    }
}

impl From<StepperError> for RunError {
    fn from(_: StepperError) -> Self {
        RunError::MotorFault
    }
}

impl From<SensorError> for RunError {
    fn from(_: SensorError) -> Self {
        RunError::MotorFault
    }
}

impl From<IlluminationError> for RunError {
    fn from(_: IlluminationError) -> Self {
        RunError::IlluminationFault
    }
}

impl From<CameraError> for RunError {
    fn from(e: CameraError) -> Self {
        RunError::CaptureError(e)
    }
}
