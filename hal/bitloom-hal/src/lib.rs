//! BitLoom Hardware Abstraction Layer
//!
//! This crate defines the hardware capabilities that chip-specific HALs
//! (STM32F1, host mocks, ...) provide to the rest of the workspace. The
//! drivers only ever talk to hardware through these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (bitloom-firmware)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  bitloom-drivers (I2C engine, LED, ...) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  bitloom-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ bitloom-hal-  │
//!             │   stm32f1     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital output
//! - [`i2c::RegisterPort`] - Flag-level access to an I2C master peripheral
//! - [`timer::TickSource`] - Millisecond time base
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod timer;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::OutputPin;
pub use i2c::{I2cConfig, RegisterPort, StatusFlag, StatusFlags};
pub use timer::TickSource;
pub use uart::{UartRx, UartTx};
