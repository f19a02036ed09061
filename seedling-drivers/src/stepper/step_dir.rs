//! STEP/DIR stepper driver
//!
//! Drives an A4988/DRV8825-style driver board through three GPIO lines.
//! Each step is one full high/low period on STEP; the half period is set
//! by the selected [`StepRate`].
//!
//! Some boards expose a FAULT output. When `motor_fault` is assigned it is
//! polled before every pulse through [`StepperDriver::is_faulted`]; boards
//! without one leave it unassigned and pass [`NoFault`].

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use seedling_core::config::{PinAssignment, PinConfig};
use seedling_core::traits::{Direction, StepRate, StepperDriver, StepperError};

use crate::level::{drive, sense};

/// Half period at the seek rate, in microseconds
pub const SEEK_HALF_PERIOD_US: u32 = 1000;

/// Half period at the precise rate, in microseconds
pub const PRECISE_HALF_PERIOD_US: u32 = 2500;

/// STEP/DIR driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepDirConfig {
    /// ENABLE line polarity
    pub enable: PinConfig,
    /// DIR line polarity; active means clockwise
    pub dir: PinConfig,
    /// STEP line polarity
    pub step: PinConfig,
    /// FAULT line polarity; active means faulted. `None` when not wired
    pub fault: Option<PinConfig>,
    /// STEP half period at [`StepRate::Seek`]
    pub seek_half_period_us: u32,
    /// STEP half period at [`StepRate::Precise`]
    pub precise_half_period_us: u32,
}

impl Default for StepDirConfig {
    fn default() -> Self {
        Self::from_pins(&PinAssignment::default())
    }
}

impl StepDirConfig {
    /// Take line polarities from the machine pin assignment
    pub fn from_pins(pins: &PinAssignment) -> Self {
        Self {
            enable: pins.motor_enable,
            dir: pins.motor_dir,
            step: pins.motor_step,
            fault: pins.motor_fault,
            seek_half_period_us: SEEK_HALF_PERIOD_US,
            precise_half_period_us: PRECISE_HALF_PERIOD_US,
        }
    }

    /// Half period for a rate
    pub fn half_period_us(&self, rate: StepRate) -> u32 {
        match rate {
            StepRate::Seek => self.seek_half_period_us,
            StepRate::Precise => self.precise_half_period_us,
        }
    }
}

/// Stand-in fault input for boards without a FAULT line
///
/// Never read when the config has no fault line assigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFault;

impl ErrorType for NoFault {
    type Error = Infallible;
}

impl InputPin for NoFault {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// STEP/DIR stepper driver
pub struct StepDirDriver<EN, DIR, STEP, FAULT, D> {
    enable_pin: EN,
    dir_pin: DIR,
    step_pin: STEP,
    fault_pin: FAULT,
    delay: D,
    config: StepDirConfig,
    enabled: bool,
    direction: Direction,
    rate: StepRate,
}

impl<EN, DIR, STEP, FAULT, D> StepDirDriver<EN, DIR, STEP, FAULT, D>
where
    EN: OutputPin,
    DIR: OutputPin,
    STEP: OutputPin,
    FAULT: InputPin,
    D: DelayNs,
{
    /// Create a driver and put the lines in a safe state
    ///
    /// The driver starts disabled with STEP idle and DIR set clockwise.
    pub fn new(
        enable_pin: EN,
        dir_pin: DIR,
        step_pin: STEP,
        fault_pin: FAULT,
        delay: D,
        config: StepDirConfig,
    ) -> Result<Self, StepperError> {
        let mut driver = Self {
            enable_pin,
            dir_pin,
            step_pin,
            fault_pin,
            delay,
            config,
            enabled: false,
            direction: Direction::Clockwise,
            rate: StepRate::Precise,
        };
        drive(&mut driver.step_pin, &driver.config.step, false)
            .map_err(|_| StepperError::PinFault)?;
        driver.set_direction(Direction::Clockwise)?;
        driver.set_enabled(false)?;
        Ok(driver)
    }

    /// Selected rate
    pub fn rate(&self) -> StepRate {
        self.rate
    }

    /// Selected direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Driver configuration
    pub fn config(&self) -> &StepDirConfig {
        &self.config
    }
}

impl<EN, DIR, STEP, FAULT, D> StepperDriver for StepDirDriver<EN, DIR, STEP, FAULT, D>
where
    EN: OutputPin,
    DIR: OutputPin,
    STEP: OutputPin,
    FAULT: InputPin,
    D: DelayNs,
{
    fn set_enabled(&mut self, enabled: bool) -> Result<(), StepperError> {
        drive(&mut self.enable_pin, &self.config.enable, enabled)
            .map_err(|_| StepperError::PinFault)?;
        self.enabled = enabled;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_direction(&mut self, dir: Direction) -> Result<(), StepperError> {
        drive(&mut self.dir_pin, &self.config.dir, dir == Direction::Clockwise)
            .map_err(|_| StepperError::PinFault)?;
        self.direction = dir;
        Ok(())
    }

    fn set_rate(&mut self, rate: StepRate) {
        self.rate = rate;
    }

    async fn step(&mut self) -> Result<(), StepperError> {
        if !self.enabled {
            return Err(StepperError::DriverFault);
        }
        let half_period = self.config.half_period_us(self.rate);

        drive(&mut self.step_pin, &self.config.step, true).map_err(|_| StepperError::PinFault)?;
        self.delay.delay_us(half_period).await;
        drive(&mut self.step_pin, &self.config.step, false).map_err(|_| StepperError::PinFault)?;
        self.delay.delay_us(half_period).await;
        Ok(())
    }

    fn is_faulted(&mut self) -> bool {
        let Some(fault) = self.config.fault else {
            return false;
        };
        // An unreadable fault line is treated as a fault
        sense(&mut self.fault_pin, &fault).unwrap_or(true)
    }
}
