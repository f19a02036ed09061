//! Cooperative cancellation

use core::sync::atomic::{AtomicBool, Ordering};

/// Cancellation flag shared between the runner and whoever controls it
///
/// The runner polls it at safe points only: after homing, between sleep
/// ticks, after each capture and after each advance. A step pulse or an
/// exposure in progress is always allowed to finish.
#[derive(Debug, Default)]
pub struct CancelToken {
    requested: AtomicBool,
}

impl CancelToken {
    /// Create an untriggered token (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Re-arm the token for another run
    pub fn reset(&self) {
        self.requested.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TOKEN: CancelToken = CancelToken::new();

    #[test]
    fn test_cancel_and_reset() {
        assert!(!TOKEN.is_cancelled());
        TOKEN.cancel();
        assert!(TOKEN.is_cancelled());
        TOKEN.reset();
        assert!(!TOKEN.is_cancelled());
    }
}
