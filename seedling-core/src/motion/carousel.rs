//! Six-plate carousel
//!
//! Owns the stepper and the position sensors. Tracks where the carousel is
//! in plate terms and is the only place [`MotorState`] changes, apart from
//! the corrective steps the [`DriftCorrector`] applies at the wrap.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::drift::{DriftCorrector, DriftReport};
use crate::config::{CarouselConfig, PlateIndex, PLATE_COUNT};
use crate::runner::CancelToken;
use crate::traits::{Direction, PositionSensors, SensorError, StepRate, StepperDriver, StepperError};

/// Carousel position bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotorState {
    /// Pulses issued since the last homing
    pub steps_since_home: u32,
    /// Plate under the camera
    pub current_plate: PlateIndex,
    /// Position is known
    pub homed: bool,
}

impl Default for MotorState {
    fn default() -> Self {
        Self {
            steps_since_home: 0,
            current_plate: PlateIndex::FIRST,
            homed: false,
        }
    }
}

/// Result of a homing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HomingReport {
    /// Fast steps until the hall reference fired
    pub seek_steps: u32,
    /// Precise steps from the hall reference to the optical marker
    pub align_steps: u16,
    /// The optical marker was found within the search limit
    pub marker_found: bool,
}

/// Carousel motion errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorError {
    /// Move requested before homing
    NotHomed,
    /// Hall reference not found within the homing step limit
    HomingTimeout,
    /// Stepper driver failure
    Stepper(StepperError),
    /// Position sensor failure
    Sensor(SensorError),
    /// Revolution too short to put a step between adjacent plates
    InvalidGeometry,
    /// Homing stopped on request
    Cancelled,
}

impl From<StepperError> for MotorError {
    fn from(e: StepperError) -> Self {
        MotorError::Stepper(e)
    }
}

impl From<SensorError> for MotorError {
    fn from(e: SensorError) -> Self {
        MotorError::Sensor(e)
    }
}

/// Issue one pulse, refusing when the driver reports a fault
pub(crate) async fn pulse<S: StepperDriver>(stepper: &mut S) -> Result<(), MotorError> {
    if stepper.is_faulted() {
        return Err(MotorError::Stepper(StepperError::DriverFault));
    }
    stepper.step().await?;
    Ok(())
}

fn check_cancel(cancel: &CancelToken) -> Result<(), MotorError> {
    if cancel.is_cancelled() {
        info!("homing cancelled");
        return Err(MotorError::Cancelled);
    }
    Ok(())
}

/// Six-plate carousel driven by a stepper
pub struct Carousel<S, P> {
    stepper: S,
    sensors: P,
    config: CarouselConfig,
    drift: DriftCorrector,
    state: MotorState,
}

impl<S, P> Carousel<S, P>
where
    S: StepperDriver,
    P: PositionSensors,
{
    /// Create an unhomed carousel
    pub fn new(stepper: S, sensors: P, config: CarouselConfig) -> Self {
        Self {
            stepper,
            sensors,
            drift: DriftCorrector::new(config.drift_retry_limit),
            config,
            state: MotorState::default(),
        }
    }

    /// Position bookkeeping
    pub fn state(&self) -> MotorState {
        self.state
    }

    /// Plate under the camera
    pub fn current_plate(&self) -> PlateIndex {
        self.state.current_plate
    }

    /// Check if the position is known
    pub fn is_homed(&self) -> bool {
        self.state.homed
    }

    /// Geometry and limits
    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    /// Find the home position
    ///
    /// Seeks the hall reference at the fast rate, then creeps to the
    /// optical marker at the precise rate. An unfound marker is only
    /// reported; the hall reference alone is good enough to run on.
    ///
    /// `cancel` is checked before every pulse. A cancelled homing leaves
    /// the carousel unhomed.
    pub async fn home(&mut self, cancel: &CancelToken) -> Result<HomingReport, MotorError> {
        self.state = MotorState::default();
        info!("homing carousel");

        self.stepper.set_enabled(true)?;
        self.stepper.set_direction(Direction::Clockwise)?;
        self.stepper.set_rate(StepRate::Seek);

        let mut seek_steps: u32 = 0;
        while !self.sensors.home_triggered()? {
            if seek_steps >= self.config.homing_step_limit {
                self.stepper.set_rate(StepRate::Precise);
                error!("home reference not found after {} steps", seek_steps);
                return Err(MotorError::HomingTimeout);
            }
            check_cancel(cancel)?;
            pulse(&mut self.stepper).await?;
            seek_steps += 1;
        }
        debug!("hall reference after {} steps", seek_steps);

        self.stepper.set_rate(StepRate::Precise);

        let mut align_steps: u16 = 0;
        let marker_found = loop {
            if self.sensors.marker_aligned()? {
                break true;
            }
            if align_steps >= self.config.marker_search_limit {
                break false;
            }
            check_cancel(cancel)?;
            pulse(&mut self.stepper).await?;
            align_steps += 1;
        };

        if marker_found {
            debug!("optical marker after {} steps", align_steps);
        } else {
            warn!("optical marker not found within {} steps", align_steps);
        }

        self.state = MotorState {
            steps_since_home: 0,
            current_plate: PlateIndex::FIRST,
            homed: true,
        };
        info!("carousel homed");

        Ok(HomingReport {
            seek_steps,
            align_steps,
            marker_found,
        })
    }

    /// Issue exactly `steps` forward pulses
    pub async fn advance(&mut self, steps: u32) -> Result<(), MotorError> {
        if !self.state.homed {
            return Err(MotorError::NotHomed);
        }
        if steps == 0 {
            return Ok(());
        }

        self.stepper.set_direction(Direction::Clockwise)?;
        self.stepper.set_rate(StepRate::Precise);

        for _ in 0..steps {
            pulse(&mut self.stepper).await?;
            self.state.steps_since_home = self.state.steps_since_home.wrapping_add(1);
        }
        Ok(())
    }

    /// Move one plate forward
    ///
    /// On the plate 6 to plate 1 wrap the drift correction always runs and
    /// its report is returned, even when no correction was needed. Plate 1
    /// is assumed after the wrap whether or not the marker was found.
    pub async fn advance_to_next_plate(&mut self) -> Result<DriftReport, MotorError> {
        if !self.state.homed {
            return Err(MotorError::NotHomed);
        }

        let steps = self.config.steps_per_plate();
        if steps == 0 {
            error!(
                "{} steps per revolution cannot index {} plates",
                self.config.steps_per_revolution,
                PLATE_COUNT
            );
            return Err(MotorError::InvalidGeometry);
        }

        let wrapping = self.state.current_plate.is_last();
        self.advance(steps).await?;
        self.state.current_plate = self.state.current_plate.next();
        trace!("at plate {}", self.state.current_plate.get());

        if !wrapping {
            return Ok(DriftReport::not_wrapped());
        }

        self.drift
            .correct(&mut self.stepper, &mut self.sensors, &mut self.state)
            .await
    }

    /// Advance until `target` is under the camera
    ///
    /// Returns the drift report of the wrap, if one was crossed.
    pub async fn goto_plate(
        &mut self,
        target: PlateIndex,
    ) -> Result<Option<DriftReport>, MotorError> {
        if !self.state.homed {
            return Err(MotorError::NotHomed);
        }

        let mut wrap = None;
        for _ in 0..PLATE_COUNT {
            if self.state.current_plate == target {
                break;
            }
            let report = self.advance_to_next_plate().await?;
            if report.plate_wrapped {
                wrap = Some(report);
            }
        }
        Ok(wrap)
    }

    /// Stop moving and keep holding torque
    ///
    /// Pulses are never interrupted, so the carousel is already stationary
    /// between calls; this only checks the driver is still healthy.
    pub fn halt(&mut self) -> Result<(), MotorError> {
        if self.stepper.is_faulted() {
            return Err(MotorError::Stepper(StepperError::DriverFault));
        }
        debug!(
            "carousel halted at plate {} (enabled: {})",
            self.state.current_plate.get(),
            self.stepper.is_enabled()
        );
        Ok(())
    }

    /// De-energize the motor
    ///
    /// The carousel can be pushed by hand afterwards, so the position is no
    /// longer trusted.
    pub fn release(&mut self) -> Result<(), MotorError> {
        self.state.homed = false;
        self.stepper.set_enabled(false)?;
        info!("carousel released");
        Ok(())
    }
}
