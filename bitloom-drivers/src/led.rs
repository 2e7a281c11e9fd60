//! Status LED output
//!
//! Drives an indicator LED from a GPIO pin. The Bluepill's PC13 LED is
//! wired to 3V3, so it lights when the pin is LOW.

use bitloom_core::LedAction;
use bitloom_hal::OutputPin;

/// LED on a GPIO pin
pub struct StatusLed<P> {
    pin: P,
    /// If true, LED ON = pin LOW
    active_low: bool,
    /// Current logical state (true = lit)
    on: bool,
}

impl<P: OutputPin> StatusLed<P> {
    /// Create a new status LED, initially off
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin to control
    /// - `active_low`: If true, the LED is lit when the pin is LOW
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut led = Self {
            pin,
            active_low,
            on: false,
        };
        led.set_on(false);
        led
    }

    /// LED lit when the pin is HIGH
    pub fn new_active_high(pin: P) -> Self {
        Self::new(pin, false)
    }

    /// LED lit when the pin is LOW
    pub fn new_active_low(pin: P) -> Self {
        Self::new(pin, true)
    }

    /// Switch the LED
    pub fn set_on(&mut self, on: bool) {
        self.on = on;
        self.pin.set_state(on != self.active_low);
    }

    /// Apply a scheduled action
    pub fn apply(&mut self, action: LedAction) {
        self.set_on(action == LedAction::TurnOn);
    }

    /// Flip the LED
    pub fn toggle(&mut self) {
        self.set_on(!self.on);
    }

    /// Whether the LED is lit
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Give the pin back
    pub fn release(self) -> P {
        self.pin
    }
}
