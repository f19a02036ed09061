//! LED panel output trait

use crate::config::IlluminationMode;

/// Errors that can occur driving an LED channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IlluminationError {
    /// The channel output could not be driven
    OutputFailed(IlluminationMode),
}

/// Two-channel LED panel
///
/// Implementations switch one channel at a time. Mutual exclusion between
/// channels is enforced by [`IlluminationController`](crate::illumination::IlluminationController).
pub trait LedOutputs {
    /// Drive one channel on or off
    fn set(&mut self, channel: IlluminationMode, on: bool) -> Result<(), IlluminationError>;

    /// Last commanded state of a channel
    fn is_on(&self, channel: IlluminationMode) -> bool;
}
