//! Hardware configuration types
//!
//! These types define the machine-level configuration: pin assignment,
//! carousel geometry and motion limits, and runner timings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::{CameraSettings, ExperimentConfig, DEFAULT_SETTLE_MS, PLATE_COUNT};

/// Pin configuration with optional inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO line number
    pub pin: u8,
    /// Line is active-low
    pub inverted: bool,
    /// Enable pull-up bias
    pub pull_up: bool,
}

impl PinConfig {
    /// Active-high line without bias
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: false,
        }
    }

    /// Active-low output
    pub const fn inverted(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
            pull_up: false,
        }
    }

    /// Active-low input with pull-up, as used by the reference sensors
    pub const fn pulled_up_active_low(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
            pull_up: true,
        }
    }
}

/// GPIO assignment for the whole machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinAssignment {
    /// Stepper driver enable (active-low on the reference board)
    pub motor_enable: PinConfig,
    /// Stepper STEP line
    pub motor_step: PinConfig,
    /// Stepper DIR line
    pub motor_dir: PinConfig,
    /// Hall-effect home reference
    pub hall_sensor: PinConfig,
    /// Optical alignment marker
    pub optical_sensor: PinConfig,
    /// Green LED panel
    pub led_green: PinConfig,
    /// Infrared LED panel
    pub led_infrared: PinConfig,
    /// Stepper driver FAULT output, when the board exposes one
    pub motor_fault: Option<PinConfig>,
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self {
            motor_enable: PinConfig::inverted(21),
            motor_step: PinConfig::new(20),
            motor_dir: PinConfig::new(16),
            hall_sensor: PinConfig::pulled_up_active_low(26),
            optical_sensor: PinConfig::pulled_up_active_low(19),
            led_green: PinConfig::new(12),
            led_infrared: PinConfig::new(13),
            motor_fault: None,
        }
    }
}

/// Carousel geometry and motion limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CarouselConfig {
    /// Microsteps per full carousel revolution
    pub steps_per_revolution: u32,
    /// Maximum steps spent seeking the hall reference before HomingTimeout
    pub homing_step_limit: u32,
    /// Maximum precise steps spent aligning to the optical marker while homing
    pub marker_search_limit: u16,
    /// Maximum single-step corrections at the plate 6 to 1 wrap
    pub drift_retry_limit: u16,
}

impl CarouselConfig {
    /// Steps between adjacent plates
    pub const fn steps_per_plate(&self) -> u32 {
        self.steps_per_revolution / PLATE_COUNT as u32
    }
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            // 800 steps per 60 degrees
            steps_per_revolution: 4800,
            homing_step_limit: 12_000,
            marker_search_limit: 2000,
            drift_retry_limit: 20,
        }
    }
}

/// Runner timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunnerTimings {
    /// Default settle time applied to experiments parsed without one
    pub settle_ms: u32,
    /// Autofocus convergence timeout before capturing anyway
    pub autofocus_timeout_ms: u32,
    /// Interval between autofocus state polls
    pub focus_poll_ms: u32,
    /// Sleep granularity; cancellation is observed within one tick
    pub tick_ms: u32,
    /// Consecutive failed drift corrections that fail the run
    pub max_consecutive_drift_failures: u8,
}

impl Default for RunnerTimings {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
            autofocus_timeout_ms: 3000,
            focus_poll_ms: 50,
            tick_ms: 100,
            max_consecutive_drift_failures: 3,
        }
    }
}

/// Complete machine configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MachineConfig {
    /// Carousel geometry and limits
    pub carousel: CarouselConfig,
    /// Runner timings
    pub timings: RunnerTimings,
    /// GPIO assignment
    pub pins: PinAssignment,
    /// Camera tuning applied at run start
    pub camera: CameraSettings,
    /// Default experiment, if the config defines one
    pub experiment: Option<ExperimentConfig>,
}

impl MachineConfig {
    /// Create a config with reference board defaults
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_geometry() {
        let carousel = CarouselConfig::default();
        assert_eq!(carousel.steps_per_plate(), 800);
        assert!(carousel.homing_step_limit > carousel.steps_per_revolution);
    }

    #[test]
    fn test_reference_pins() {
        let pins = PinAssignment::default();
        assert_eq!(pins.motor_step.pin, 20);
        assert!(pins.motor_enable.inverted);
        assert!(pins.hall_sensor.inverted && pins.hall_sensor.pull_up);
        assert_eq!(pins.led_infrared.pin, 13);
        assert_eq!(pins.motor_fault, None);
    }
}
