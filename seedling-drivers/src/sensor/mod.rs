//! Position sensor implementations

pub mod gpio;

pub use gpio::GpioPositionSensors;
