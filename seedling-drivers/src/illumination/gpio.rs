//! GPIO LED panel
//!
//! Green and infrared panels switched through one output line each
//! (directly or via a MOSFET). The panel only drives lines; keeping the
//! channels mutually exclusive is the illumination controller's job.

use embedded_hal::digital::OutputPin;
use seedling_core::config::{IlluminationMode, PinAssignment, PinConfig};
use seedling_core::traits::{IlluminationError, LedOutputs};

use crate::level::drive;

/// Two-channel LED panel on two output lines
pub struct GpioLedPanel<G, I> {
    green: G,
    infrared: I,
    green_config: PinConfig,
    infrared_config: PinConfig,
    green_on: bool,
    infrared_on: bool,
}

impl<G: OutputPin, I: OutputPin> GpioLedPanel<G, I> {
    /// Create a panel and drive both channels off
    pub fn new(
        green: G,
        green_config: PinConfig,
        infrared: I,
        infrared_config: PinConfig,
    ) -> Result<Self, IlluminationError> {
        let mut panel = Self {
            green,
            infrared,
            green_config,
            infrared_config,
            green_on: false,
            infrared_on: false,
        };
        panel.set(IlluminationMode::Green, false)?;
        panel.set(IlluminationMode::Infrared, false)?;
        Ok(panel)
    }

    /// Create a panel with the polarities from the machine pin assignment
    pub fn from_pins(
        green: G,
        infrared: I,
        pins: &PinAssignment,
    ) -> Result<Self, IlluminationError> {
        Self::new(green, pins.led_green, infrared, pins.led_infrared)
    }
}

impl<G: OutputPin, I: OutputPin> LedOutputs for GpioLedPanel<G, I> {
    fn set(&mut self, channel: IlluminationMode, on: bool) -> Result<(), IlluminationError> {
        let result = match channel {
            IlluminationMode::Green => drive(&mut self.green, &self.green_config, on).is_ok(),
            IlluminationMode::Infrared => {
                drive(&mut self.infrared, &self.infrared_config, on).is_ok()
            }
        };
        if !result {
            return Err(IlluminationError::OutputFailed(channel));
        }

        match channel {
            IlluminationMode::Green => self.green_on = on,
            IlluminationMode::Infrared => self.infrared_on = on,
        }
        Ok(())
    }

    fn is_on(&self, channel: IlluminationMode) -> bool {
        match channel {
            IlluminationMode::Green => self.green_on,
            IlluminationMode::Infrared => self.infrared_on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Log, MockPin};
    use core::cell::Cell;

    #[test]
    fn test_panel_starts_dark() {
        let log = Log::default();
        let (g, ir) = (Cell::new(true), Cell::new(true));
        let panel = GpioLedPanel::from_pins(
            MockPin::new("green", &log, &g),
            MockPin::new("ir", &log, &ir),
            &PinAssignment::default(),
        )
        .unwrap();

        assert!(!panel.is_on(IlluminationMode::Green));
        assert!(!panel.is_on(IlluminationMode::Infrared));
        assert_eq!(*log.borrow(), [("green", false), ("ir", false)]);
    }

    #[test]
    fn test_channels_switch_independently() {
        let log = Log::default();
        let (g, ir) = (Cell::new(false), Cell::new(false));
        let mut panel = GpioLedPanel::from_pins(
            MockPin::new("green", &log, &g),
            MockPin::new("ir", &log, &ir),
            &PinAssignment::default(),
        )
        .unwrap();

        panel.set(IlluminationMode::Infrared, true).unwrap();
        assert!(ir.get());
        assert!(!g.get());
        assert!(panel.is_on(IlluminationMode::Infrared));

        panel.set(IlluminationMode::Infrared, false).unwrap();
        assert!(!ir.get());
    }

    #[test]
    fn test_inverted_channel() {
        let log = Log::default();
        let (g, ir) = (Cell::new(false), Cell::new(false));
        let mut panel = GpioLedPanel::new(
            MockPin::new("green", &log, &g),
            PinConfig::inverted(12),
            MockPin::new("ir", &log, &ir),
            PinConfig::new(13),
        )
        .unwrap();

        assert!(g.get());
        panel.set(IlluminationMode::Green, true).unwrap();
        assert!(!g.get());
    }

    #[test]
    fn test_write_failure_keeps_state() {
        let log = Log::default();
        let (g, ir) = (Cell::new(false), Cell::new(false));
        let mut panel = GpioLedPanel::from_pins(
            MockPin::new("green", &log, &g),
            MockPin::new("ir", &log, &ir),
            &PinAssignment::default(),
        )
        .unwrap();
        panel.green.fail = true;

        assert_eq!(
            panel.set(IlluminationMode::Green, true),
            Err(IlluminationError::OutputFailed(IlluminationMode::Green))
        );
        assert!(!panel.is_on(IlluminationMode::Green));
    }
}
