//! Polled I2C master
//!
//! - [`I2cMaster`] - transaction engine over a [`bitloom_hal::RegisterPort`]
//! - [`StatusPoller`] - bounded flag waits shared by every phase
//! - [`SharedI2c`] - hands one engine to several contexts, refusing
//!   re-entrant use
//!
//! ```ignore
//! let mut i2c = I2cMaster::new(port, &TICKS, I2cConfig::default());
//! let mut id = [0u8; 2];
//! i2c.read_register(0x50, 0x00, &mut id)?;
//! ```

mod error;
mod master;
mod poller;
mod shared;

#[cfg(test)]
mod mock;

pub use error::{BusError, I2cError};
pub use master::{BusState, Direction, I2cMaster, MAX_ADDRESS};
pub use poller::{AbortCause, PollBudget, StatusPoller, WaitOutcome};
pub use shared::SharedI2c;
