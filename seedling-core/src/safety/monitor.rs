//! Drift failure monitor
//!
//! A single failed drift correction is survivable: the carousel assumes
//! plate 1 and the next wrap gets another chance. Several in a row mean
//! the carousel has lost its position for good.

use crate::error::RunError;
use crate::motion::DriftReport;

/// Consecutive failed corrections that fail the run
pub const DEFAULT_MAX_DRIFT_FAILURES: u8 = 3;

/// Safety condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// All conditions normal
    Ok,
    /// Correction failed, run continues
    Warning {
        /// Failed corrections in a row so far
        consecutive: u8,
    },
    /// Safety condition violated
    Fault(RunError),
}

/// Tracks consecutive failed drift corrections
#[derive(Debug, Clone)]
pub struct DriftMonitor {
    max_consecutive: u8,
    consecutive: u8,
}

impl Default for DriftMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DRIFT_FAILURES)
    }
}

impl DriftMonitor {
    /// Create a monitor failing after `max_consecutive` failures in a row
    pub fn new(max_consecutive: u8) -> Self {
        Self {
            max_consecutive: max_consecutive.max(1),
            consecutive: 0,
        }
    }

    /// Failed corrections in a row
    pub fn consecutive_failures(&self) -> u8 {
        self.consecutive
    }

    /// Forget past failures
    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Account for one advance
    ///
    /// Advances that did not wrap do not affect the count.
    pub fn record(&mut self, report: &DriftReport) -> SafetyStatus {
        if !report.plate_wrapped {
            return SafetyStatus::Ok;
        }

        if report.aligned {
            self.consecutive = 0;
            return SafetyStatus::Ok;
        }

        self.consecutive = self.consecutive.saturating_add(1);
        if self.consecutive >= self.max_consecutive {
            SafetyStatus::Fault(RunError::DriftCorrectionFailed)
        } else {
            SafetyStatus::Warning {
                consecutive: self.consecutive,
            }
        }
    }
}
