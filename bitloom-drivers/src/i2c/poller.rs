//! Bounded status-flag polling
//!
//! Every phase of an I2C transaction waits for one status flag while
//! watching for the two abort conditions the peripheral can latch. The
//! wait gives up after `max_polls` samples or `timeout_ms` milliseconds,
//! whichever comes first, so a wedged bus turns into an error instead of a
//! hang.

use bitloom_hal::{I2cConfig, RegisterPort, StatusFlag, TickSource};

/// Abort condition latched by the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AbortCause {
    /// Target answered with NACK
    AcknowledgeFailure,
    /// Another master won the bus
    ArbitrationLost,
}

/// Result of a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitOutcome {
    /// The awaited flag is set
    Ready,
    /// An abort flag was seen before the awaited flag
    Aborted(AbortCause),
    /// Poll budget exhausted
    TimedOut,
}

/// Limits applied to every wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollBudget {
    /// Maximum number of status samples
    pub max_polls: u32,
    /// Maximum time spent waiting, in milliseconds
    pub timeout_ms: u32,
}

impl From<&I2cConfig> for PollBudget {
    fn from(config: &I2cConfig) -> Self {
        Self {
            max_polls: config.max_polls.max(1),
            timeout_ms: config.timeout_ms,
        }
    }
}

/// Spins on status flags against a time source
pub struct StatusPoller<T> {
    clock: T,
    budget: PollBudget,
}

impl<T: TickSource> StatusPoller<T> {
    /// Create a poller using `clock` for deadlines
    pub fn new(clock: T, budget: PollBudget) -> Self {
        Self { clock, budget }
    }

    /// Give the time source back
    pub fn into_clock(self) -> T {
        self.clock
    }

    /// Wait until `flag` is set
    ///
    /// Abort flags are sampled before `flag` on every iteration, and
    /// arbitration loss takes precedence over a NACK: once the bus is
    /// lost the NACK is meaningless.
    pub fn wait_for<P: RegisterPort>(&self, port: &mut P, flag: StatusFlag) -> WaitOutcome {
        self.spin(|| {
            if port.is_arbitration_lost() {
                Some(WaitOutcome::Aborted(AbortCause::ArbitrationLost))
            } else if port.is_acknowledge_failure() {
                Some(WaitOutcome::Aborted(AbortCause::AcknowledgeFailure))
            } else if port.is_set(flag) {
                Some(WaitOutcome::Ready)
            } else {
                None
            }
        })
    }

    /// Wait until the bus is released by whoever holds it
    ///
    /// Only `Ready` or `TimedOut` are returned.
    pub fn wait_while_busy<P: RegisterPort>(&self, port: &mut P) -> WaitOutcome {
        self.spin(|| (!port.is_bus_busy()).then_some(WaitOutcome::Ready))
    }

    fn spin(&self, mut sample: impl FnMut() -> Option<WaitOutcome>) -> WaitOutcome {
        let start = self.clock.now_ms();
        let mut polls: u32 = 0;

        loop {
            if let Some(outcome) = sample() {
                return outcome;
            }

            polls = polls.saturating_add(1);
            if polls >= self.budget.max_polls
                || self.clock.elapsed_since(start) >= self.budget.timeout_ms
            {
                return WaitOutcome::TimedOut;
            }
        }
    }
}
