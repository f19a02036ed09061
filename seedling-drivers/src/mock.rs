//! Mock GPIO lines for driver tests

use core::cell::{Cell, RefCell};
use std::vec::Vec;

use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin, OutputPin};

/// Pin event log: (line, level)
pub type Log = RefCell<Vec<(&'static str, bool)>>;

#[derive(Debug)]
pub struct MockPinError;

impl Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Output line that logs every write, or input line reading `level`
pub struct MockPin<'a> {
    pub name: &'static str,
    pub log: &'a Log,
    pub level: &'a Cell<bool>,
    pub fail: bool,
}

impl<'a> MockPin<'a> {
    pub fn new(name: &'static str, log: &'a Log, level: &'a Cell<bool>) -> Self {
        Self {
            name,
            log,
            level,
            fail: false,
        }
    }

    fn write(&mut self, high: bool) -> Result<(), MockPinError> {
        if self.fail {
            return Err(MockPinError);
        }
        self.level.set(high);
        self.log.borrow_mut().push((self.name, high));
        Ok(())
    }
}

impl ErrorType for MockPin<'_> {
    type Error = MockPinError;
}

impl OutputPin for MockPin<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl InputPin for MockPin<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.fail {
            return Err(MockPinError);
        }
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}
