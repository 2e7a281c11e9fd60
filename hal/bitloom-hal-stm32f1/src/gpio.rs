//! GPIO outputs for STM32F1

use bitloom_hal::OutputPin;
use embassy_stm32::gpio::Output;

/// Push-pull output driving an indicator LED
///
/// On the Bluepill this is PC13, wired active-low.
pub struct LedPin<'d> {
    pin: Output<'d>,
}

impl<'d> LedPin<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self { pin }
    }
}

impl OutputPin for LedPin<'_> {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}
