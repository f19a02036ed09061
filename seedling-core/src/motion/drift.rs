//! Drift correction at the plate 6 to plate 1 wrap
//!
//! Missed steps accumulate over a revolution. At the wrap the optical
//! marker should sit exactly under the sensor; if it does not, single
//! forward pulses are issued until it does, bounded by a retry limit.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::carousel::{pulse, MotorError, MotorState};
use crate::traits::{PositionSensors, StepperDriver};

/// Outcome of one plate advance with respect to drift correction
///
/// Produced for every wrap, including when no correction was needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriftReport {
    /// The advance crossed from plate 6 to plate 1
    pub plate_wrapped: bool,
    /// Corrective single steps issued
    pub extra_steps_applied: u16,
    /// The marker was found within the retry limit
    pub aligned: bool,
}

impl DriftReport {
    /// Report for an advance that did not wrap
    pub const fn not_wrapped() -> Self {
        Self {
            plate_wrapped: false,
            extra_steps_applied: 0,
            aligned: true,
        }
    }

    /// Wrap completed with the marker found
    pub const fn is_corrected(&self) -> bool {
        self.plate_wrapped && self.aligned
    }
}

/// Marker re-alignment engine
#[derive(Debug, Clone, Copy)]
pub struct DriftCorrector {
    retry_limit: u16,
}

impl DriftCorrector {
    /// Create a corrector issuing at most `retry_limit` corrective steps
    pub const fn new(retry_limit: u16) -> Self {
        Self { retry_limit }
    }

    /// Retry bound
    pub const fn retry_limit(&self) -> u16 {
        self.retry_limit
    }

    /// Step forward until the optical marker is aligned
    ///
    /// Every corrective pulse is counted in `state.steps_since_home`.
    /// Running out of retries is not an error: the report comes back with
    /// `aligned == false` and the caller decides what that means.
    pub async fn correct<S, P>(
        &self,
        stepper: &mut S,
        sensors: &mut P,
        state: &mut MotorState,
    ) -> Result<DriftReport, MotorError>
    where
        S: StepperDriver,
        P: PositionSensors,
    {
        let mut extra: u16 = 0;

        let aligned = loop {
            if sensors.marker_aligned()? {
                break true;
            }
            if extra >= self.retry_limit {
                break false;
            }
            pulse(stepper).await?;
            extra += 1;
            state.steps_since_home = state.steps_since_home.wrapping_add(1);
        };

        if aligned {
            debug!("drift corrected with {} extra steps", extra);
        } else {
            warn!("marker not found after {} corrective steps", extra);
        }

        Ok(DriftReport {
            plate_wrapped: true,
            extra_steps_applied: extra,
            aligned,
        })
    }
}
