//! GPIO position sensors
//!
//! The hall-effect home reference and the optical (ITR20001) marker sensor
//! are both open-collector outputs on pulled-up inputs: the line reads low
//! while the sensor is triggered.

use embedded_hal::digital::InputPin;
use seedling_core::config::{PinAssignment, PinConfig};
use seedling_core::traits::{PositionSensors, SensorError};

use crate::level::sense;

/// Hall reference plus optical marker on two input lines
pub struct GpioPositionSensors<H, O> {
    hall: H,
    optical: O,
    hall_config: PinConfig,
    optical_config: PinConfig,
}

impl<H: InputPin, O: InputPin> GpioPositionSensors<H, O> {
    /// Create sensors with explicit line polarities
    pub fn new(hall: H, hall_config: PinConfig, optical: O, optical_config: PinConfig) -> Self {
        Self {
            hall,
            optical,
            hall_config,
            optical_config,
        }
    }

    /// Create sensors with the polarities from the machine pin assignment
    pub fn from_pins(hall: H, optical: O, pins: &PinAssignment) -> Self {
        Self::new(hall, pins.hall_sensor, optical, pins.optical_sensor)
    }
}

impl<H: InputPin, O: InputPin> PositionSensors for GpioPositionSensors<H, O> {
    fn home_triggered(&mut self) -> Result<bool, SensorError> {
        sense(&mut self.hall, &self.hall_config).map_err(|_| SensorError::ReadFailed)
    }

    fn marker_aligned(&mut self) -> Result<bool, SensorError> {
        sense(&mut self.optical, &self.optical_config).map_err(|_| SensorError::ReadFailed)
    }
}
