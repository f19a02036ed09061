//! Board-agnostic core logic for the Seedling Imager
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware capability traits (stepper, position sensors, LEDs, camera, clock)
//! - Carousel motor model with homing and plate indexing
//! - Drift correction at the plate 6 to plate 1 wrap
//! - Illumination and capture sequencing
//! - Run state machine and the experiment runner
//! - Configuration types and the machine config parser

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the logging macros are visible to every module below
#[macro_use]
mod fmt;

pub mod capture;
pub mod config;
pub mod error;
pub mod illumination;
pub mod motion;
pub mod runner;
pub mod safety;
pub mod state;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use error::RunError;
