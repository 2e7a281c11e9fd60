//! Board-agnostic core logic for BitLoom firmware
//!
//! This crate contains the pieces of application logic that do not touch
//! hardware registers:
//!
//! - Millisecond tick counter shared between the SysTick interrupt and
//!   thread context
//! - LED blink schedule driven by that counter

#![no_std]
#![deny(unsafe_code)]

pub mod blink;
pub mod tick;

pub use blink::{BlinkConfig, BlinkSchedule, LedAction};
pub use tick::TickCounter;
