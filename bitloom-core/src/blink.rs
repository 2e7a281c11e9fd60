//! LED blink schedule
//!
//! The heartbeat LED alternates on/off at a fixed period. The schedule
//! only decides *when* to switch; applying the action to a pin is left to
//! `bitloom_drivers::led::StatusLed`.

/// Default half-period of the heartbeat LED
pub const LED_FLASH_PERIOD_MS: u32 = 500;

/// Action the main loop should apply to the LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedAction {
    /// Switch the LED on
    TurnOn,
    /// Switch the LED off
    TurnOff,
}

impl LedAction {
    /// The action that follows this one
    pub fn next(self) -> Self {
        match self {
            LedAction::TurnOn => LedAction::TurnOff,
            LedAction::TurnOff => LedAction::TurnOn,
        }
    }
}

/// Blink timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlinkConfig {
    /// Time between two actions in milliseconds (must be non-zero)
    pub period_ms: u32,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            period_ms: LED_FLASH_PERIOD_MS,
        }
    }
}

/// Decides when the LED toggles
///
/// The first action (`TurnOn`) is due at the tick the schedule was started
/// at, then one action every `period_ms`. If the caller falls behind by
/// several periods it receives a single action and the schedule
/// re-aligns to the period grid.
#[derive(Debug, Clone)]
pub struct BlinkSchedule {
    period_ms: u32,
    next_due_ms: u32,
    next_action: LedAction,
}

impl BlinkSchedule {
    /// Create a schedule whose first action is due at `start_ms`
    pub fn new(config: BlinkConfig, start_ms: u32) -> Self {
        Self {
            period_ms: config.period_ms.max(1),
            next_due_ms: start_ms,
            next_action: LedAction::TurnOn,
        }
    }

    /// Action that will be returned at the next boundary
    pub fn pending_action(&self) -> LedAction {
        self.next_action
    }

    /// Tick at which the next action becomes due
    pub fn next_due_ms(&self) -> u32 {
        self.next_due_ms
    }

    /// Check the schedule against the current time
    ///
    /// Returns the action to apply if a period boundary has been reached
    /// since the previous call.
    pub fn poll(&mut self, now_ms: u32) -> Option<LedAction> {
        let late_by = now_ms.wrapping_sub(self.next_due_ms);
        // Anything in the upper half of the u32 range is "not yet due"
        if late_by > u32::MAX / 2 {
            return None;
        }

        let missed_periods = late_by / self.period_ms;
        self.next_due_ms = self
            .next_due_ms
            .wrapping_add(self.period_ms.wrapping_mul(missed_periods + 1));

        let action = self.next_action;
        self.next_action = action.next();
        Some(action)
    }
}
