//! One I2C engine, several users
//!
//! The engine itself is not re-entrant: a transaction started from an
//! interrupt while thread code is mid-transaction would corrupt both.
//! `SharedI2c` puts the engine behind a blocking mutex and a `RefCell`, so
//! a second borrow from the same context fails with
//! [`BusError::Reentrant`] instead of interleaving register accesses.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::error::BusError;

/// Bus shared between contexts
pub struct SharedI2c<M: RawMutex, B> {
    bus: Mutex<M, RefCell<B>>,
}

impl<M: RawMutex, B> SharedI2c<M, B> {
    /// Wrap `bus`, usable in a `static`
    pub const fn new(bus: B) -> Self {
        Self {
            bus: Mutex::new(RefCell::new(bus)),
        }
    }

    /// Run `f` with exclusive access to the bus
    ///
    /// Fails with [`BusError::Reentrant`] when called from inside another
    /// `with` on the same bus.
    pub fn with<R, E>(&self, f: impl FnOnce(&mut B) -> Result<R, E>) -> Result<R, BusError<E>> {
        self.bus.lock(|cell| {
            let mut bus = cell.try_borrow_mut().map_err(|_| BusError::Reentrant)?;
            f(&mut bus).map_err(BusError::I2c)
        })
    }

    /// Give the bus back
    pub fn into_inner(self) -> B {
        self.bus.into_inner().into_inner()
    }
}
