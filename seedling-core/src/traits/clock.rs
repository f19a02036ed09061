//! Wall clock trait

/// Monotonic millisecond clock
///
/// Used for cycle scheduling and capture timestamps. Sleeping goes through
/// an [`embedded_hal_async::delay::DelayNs`] provider instead.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed epoch
    fn now_ms(&self) -> u64;
}
