//! Millisecond tick counter
//!
//! Incremented once per millisecond from the SysTick interrupt and read from
//! thread context. The I2C engine uses it as the time base for its poll
//! deadlines, which works because the interrupt keeps firing while the
//! engine busy-waits.

use bitloom_hal::TickSource;
use portable_atomic::{AtomicU32, Ordering};

/// Free-running millisecond counter
///
/// Wraps after ~49.7 days; use [`TickCounter::elapsed_since`] for
/// durations.
#[derive(Debug)]
pub struct TickCounter {
    ticks: AtomicU32,
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounter {
    /// Create a counter starting at zero
    ///
    /// `const` so it can back a `static` shared with an interrupt handler.
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Advance by one millisecond (call from the tick interrupt)
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Current tick value
    pub fn now_ms(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Restart counting from zero
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
    }

    /// Milliseconds since `start`
    pub fn elapsed_since(&self, start: u32) -> u32 {
        self.now_ms().wrapping_sub(start)
    }
}

impl TickSource for TickCounter {
    fn now_ms(&self) -> u32 {
        TickCounter::now_ms(self)
    }
}
