//! I2C transaction outcomes

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Why a transaction did not complete
///
/// Every variant is recoverable: the engine has already released the bus
/// (stop issued, abort flags cleared) when one of these is returned, and
/// the caller decides whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// Target did not acknowledge its address
    AddressNacked,
    /// Target refused a data byte
    DataNacked,
    /// Another master took the bus
    ArbitrationLost,
    /// Bus never went idle, no start condition was issued
    BusBusyTimeout,
    /// A status flag never showed up within the poll budget
    PollTimeout,
    /// Address does not fit in 7 bits
    InvalidAddress,
}

impl embedded_hal::i2c::Error for I2cError {
    fn kind(&self) -> ErrorKind {
        match self {
            I2cError::AddressNacked => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            I2cError::DataNacked => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            I2cError::ArbitrationLost => ErrorKind::ArbitrationLoss,
            I2cError::BusBusyTimeout | I2cError::PollTimeout | I2cError::InvalidAddress => {
                ErrorKind::Other
            }
        }
    }
}

/// Errors from a bus shared through [`super::SharedI2c`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E> {
    /// The bus is already inside a transaction on this context
    Reentrant,
    /// The transaction itself failed
    I2c(E),
}

impl<E> From<E> for BusError<E> {
    fn from(e: E) -> Self {
        BusError::I2c(e)
    }
}

impl<E: embedded_hal::i2c::Error> embedded_hal::i2c::Error for BusError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            BusError::Reentrant => ErrorKind::Bus,
            BusError::I2c(e) => e.kind(),
        }
    }
}
