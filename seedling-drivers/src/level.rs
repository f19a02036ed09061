//! Logical level helpers shared by the GPIO drivers

use embedded_hal::digital::{InputPin, OutputPin};
use seedling_core::config::PinConfig;

/// Drive `pin` to the logical `active` level, honoring inversion
pub(crate) fn drive<P: OutputPin>(
    pin: &mut P,
    config: &PinConfig,
    active: bool,
) -> Result<(), P::Error> {
    if active != config.inverted {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

/// Read the logical level of `pin`, honoring inversion
pub(crate) fn sense<P: InputPin>(pin: &mut P, config: &PinConfig) -> Result<bool, P::Error> {
    Ok(pin.is_high()? != config.inverted)
}
