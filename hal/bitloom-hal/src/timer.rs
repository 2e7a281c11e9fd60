//! Time base abstraction
//!
//! The I2C engine bounds every busy-wait with a deadline measured on a
//! free-running millisecond counter. The counter is advanced by an
//! interrupt that keeps firing while the engine spins.

/// Free-running millisecond time source
///
/// The value wraps at `u32::MAX`; consumers must compare instants with
/// wrapping arithmetic.
pub trait TickSource {
    /// Milliseconds since the counter was started
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `start`, tolerant of counter wrap-around
    fn elapsed_since(&self, start: u32) -> u32 {
        self.now_ms().wrapping_sub(start)
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
