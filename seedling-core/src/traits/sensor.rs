//! Carousel position sensor trait

/// Errors that can occur reading a position sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// The input line could not be read
    ReadFailed,
}

/// Hall-effect home reference plus optical alignment marker
///
/// Both sensors are binary. Implementations hide the electrical polarity:
/// `true` always means triggered or aligned.
pub trait PositionSensors {
    /// Hall-effect home reference is triggered
    fn home_triggered(&mut self) -> Result<bool, SensorError>;

    /// Optical marker is aligned with the current plate
    fn marker_aligned(&mut self) -> Result<bool, SensorError>;
}
