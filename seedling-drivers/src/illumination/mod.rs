//! LED panel implementations

pub mod gpio;

pub use gpio::GpioLedPanel;
