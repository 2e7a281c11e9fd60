//! Driver implementations for BitLoom
//!
//! Every driver here is generic over the `bitloom-hal` traits, so it runs
//! against the STM32F1 registers on target and against simulated
//! peripherals in host tests.
//!
//! - [`i2c`] - polled I2C master transaction engine
//! - [`led`] - status LED on a GPIO output
//! - [`uart`] - interrupt-fed UART byte buffers

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod i2c;
pub mod led;
pub mod uart;
