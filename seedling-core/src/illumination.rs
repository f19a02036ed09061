//! Illumination controller
//!
//! Keeps the two LED channels mutually exclusive. Switching always drives
//! the other channel off before the requested one goes on.

use crate::config::IlluminationMode;
use crate::traits::{IlluminationError, LedOutputs};

/// Break-before-make controller over a two-channel LED panel
pub struct IlluminationController<L> {
    leds: L,
    active: Option<IlluminationMode>,
}

impl<L: LedOutputs> IlluminationController<L> {
    /// Wrap an LED panel; both channels are assumed off
    pub fn new(leds: L) -> Self {
        Self { leds, active: None }
    }

    /// Channel currently on, if any
    pub fn active(&self) -> Option<IlluminationMode> {
        self.active
    }

    /// Select a channel, or `None` for dark
    pub fn set_channel(&mut self, mode: Option<IlluminationMode>) -> Result<(), IlluminationError> {
        match mode {
            None => self.all_off(),
            Some(channel) => {
                let other = channel.other();
                if self.leds.is_on(other) || self.active == Some(other) {
                    self.leds.set(other, false)?;
                }
                self.active = None;
                self.leds.set(channel, true)?;
                self.active = Some(channel);
                trace!("illumination {}", channel.as_str());
                Ok(())
            }
        }
    }

    /// Drive both channels off
    ///
    /// Both channels are attempted even if the first one fails; the first
    /// error is returned.
    pub fn all_off(&mut self) -> Result<(), IlluminationError> {
        let green = self.leds.set(IlluminationMode::Green, false);
        let infrared = self.leds.set(IlluminationMode::Infrared, false);
        self.active = None;

        if let Err(e) = green.and(infrared) {
            error!("failed to switch illumination off");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLeds, Op, World};

    #[test]
    fn test_break_before_make() {
        let world = World::new();
        let mut illum = IlluminationController::new(FakeLeds::new(&world));

        illum.set_channel(Some(IlluminationMode::Green)).unwrap();
        illum.set_channel(Some(IlluminationMode::Infrared)).unwrap();

        assert_eq!(
            world.ops(),
            [
                Op::Led(IlluminationMode::Green, true),
                Op::Led(IlluminationMode::Green, false),
                Op::Led(IlluminationMode::Infrared, true),
            ]
        );
        assert!(!world.leds_overlapped.get());
        assert_eq!(illum.active(), Some(IlluminationMode::Infrared));
    }

    #[test]
    fn test_none_turns_everything_off() {
        let world = World::new();
        let mut illum = IlluminationController::new(FakeLeds::new(&world));

        illum.set_channel(Some(IlluminationMode::Infrared)).unwrap();
        illum.set_channel(None).unwrap();

        assert_eq!(illum.active(), None);
        assert_eq!(
            world.ops()[1..],
            [
                Op::Led(IlluminationMode::Green, false),
                Op::Led(IlluminationMode::Infrared, false),
            ]
        );
    }

    #[test]
    fn test_all_off_attempts_both_channels() {
        let world = World::new();
        let mut illum = IlluminationController::new(FakeLeds::new(&world));
        illum.set_channel(Some(IlluminationMode::Infrared)).unwrap();
        world.led_fail.set(Some(IlluminationMode::Green));

        assert_eq!(
            illum.all_off(),
            Err(IlluminationError::OutputFailed(IlluminationMode::Green))
        );
        assert_eq!(
            world.ops().last(),
            Some(&Op::Led(IlluminationMode::Infrared, false))
        );
    }

    #[test]
    fn test_failed_switch_leaves_no_active_channel() {
        let world = World::new();
        let mut illum = IlluminationController::new(FakeLeds::new(&world));
        world.led_fail.set(Some(IlluminationMode::Green));

        assert!(illum.set_channel(Some(IlluminationMode::Green)).is_err());
        assert_eq!(illum.active(), None);
    }
}
