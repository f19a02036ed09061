//! Carousel motion
//!
//! Homing, plate indexing and drift correction on top of the stepper and
//! position sensor traits.

pub mod carousel;
pub mod drift;

pub use carousel::{Carousel, HomingReport, MotorError, MotorState};
pub use drift::{DriftCorrector, DriftReport};
