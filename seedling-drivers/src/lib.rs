//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in seedling-core on top of `embedded-hal` 1.0 digital pins:
//!
//! - Stepper driver (STEP/DIR/ENABLE with optional fault input)
//! - Position sensors (hall reference and optical marker)
//! - Two-channel LED panel (green and infrared)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod illumination;
pub mod sensor;
pub mod stepper;

mod level;

#[cfg(test)]
mod mock;
