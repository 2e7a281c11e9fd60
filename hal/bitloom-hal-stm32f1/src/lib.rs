//! STM32F1-specific HAL for BitLoom firmware
//!
//! Implements the `bitloom-hal` traits on STM32F1 chips:
//!
//! - STM32F103C8 (Bluepill)
//!
//! # Features
//!
//! - `stm32f103c8` - Enable support for STM32F103C8T6
//! - `stm32f103cb` - Enable support for STM32F103CBT6
//! - `defmt` - Enable debug formatting support
//!
//! # Usage
//!
//! `embassy-stm32` brings up clocks, pins and peripheral clocks; the types
//! here then hand the registers to BitLoom drivers:
//!
//! - [`i2c::Stm32I2cPort`] - I2C v1 flags for the polled master engine
//! - [`gpio::LedPin`] - status LED output
//! - [`systick`] - 1 kHz SysTick for the firmware tick counter

#![no_std]

pub mod gpio;
pub mod i2c;
pub mod systick;

pub use gpio::LedPin;
pub use i2c::{ConfigError, StandardTiming, Stm32I2cPort};
