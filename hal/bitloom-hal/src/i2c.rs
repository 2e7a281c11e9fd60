//! I2C master peripheral abstractions
//!
//! The transaction engine in `bitloom-drivers` is written against
//! [`RegisterPort`], a flag-level view of an I2C master peripheral. A chip
//! HAL maps each capability onto its status/control registers; tests map
//! them onto a simulated register file.

/// Status bits reported by the I2C peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StatusFlag {
    /// Start (or repeated start) condition generated
    StartGenerated = 1 << 0,
    /// Address sent and acknowledged by the target
    AddressAcknowledged = 1 << 1,
    /// Shift register and holding register both drained
    ByteTransferComplete = 1 << 2,
    /// Holding register empty, a new byte can be written
    DataRegisterEmpty = 1 << 3,
    /// A received byte is waiting in the holding register
    DataRegisterNotEmpty = 1 << 4,
    /// Target did not acknowledge the last address or data byte
    AcknowledgeFailure = 1 << 5,
    /// Another master won the bus
    ArbitrationLost = 1 << 6,
    /// Bus is held by a transaction (ours or someone else's)
    BusBusy = 1 << 7,
}

impl StatusFlag {
    /// All flags, in bit order
    pub const ALL: [StatusFlag; 8] = [
        StatusFlag::StartGenerated,
        StatusFlag::AddressAcknowledged,
        StatusFlag::ByteTransferComplete,
        StatusFlag::DataRegisterEmpty,
        StatusFlag::DataRegisterNotEmpty,
        StatusFlag::AcknowledgeFailure,
        StatusFlag::ArbitrationLost,
        StatusFlag::BusBusy,
    ];

    /// Bit mask of this flag inside a [`StatusFlags`] snapshot
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// Snapshot of the peripheral status bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags(u8);

impl StatusFlags {
    /// Snapshot with no flag set
    pub const EMPTY: Self = Self(0);

    /// Raw bit representation
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether `flag` is set in this snapshot
    pub const fn contains(self, flag: StatusFlag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// Return a copy with `flag` set to `value`
    #[must_use]
    pub const fn with(self, flag: StatusFlag, value: bool) -> Self {
        if value {
            Self(self.0 | flag.mask())
        } else {
            Self(self.0 & !flag.mask())
        }
    }

    /// Check whether either abort condition is latched
    pub const fn has_abort(self) -> bool {
        self.contains(StatusFlag::AcknowledgeFailure) || self.contains(StatusFlag::ArbitrationLost)
    }
}

/// Flag-level access to an I2C master peripheral
///
/// Reads take `&mut self`: on most controllers reading a status register
/// is one half of a flag-clearing sequence, so sampling is not free of
/// side effects.
///
/// The engine assumes exclusive ownership of the port for the duration of
/// a transaction; implementations do not need any internal locking.
pub trait RegisterPort {
    /// Bus is held by a transaction
    fn is_bus_busy(&mut self) -> bool;

    /// Request a start (or repeated start) condition
    fn set_start(&mut self);

    /// Request a stop condition
    fn set_stop(&mut self);

    /// Enable or disable acknowledging received bytes
    fn set_acknowledge(&mut self, enabled: bool);

    /// Make the ACK bit apply to the byte after the one being received
    ///
    /// Only used for two-byte reads (POS on STM32F1).
    fn set_acknowledge_position(&mut self, next: bool);

    /// Start condition has been generated
    fn is_start_generated(&mut self) -> bool;

    /// Address byte has been acknowledged by the target
    fn is_address_acknowledged(&mut self) -> bool;

    /// Shift register finished a byte and the data register can't take it
    ///
    /// Transmitting: the last byte left and nothing new is queued.
    /// Receiving: one byte waits in the data register and the next one is
    /// complete in the shift register, with SCL stretched.
    fn is_byte_transfer_complete(&mut self) -> bool;

    /// Holding register can accept a new byte
    fn is_data_register_empty(&mut self) -> bool;

    /// Holding register contains a received byte
    fn is_data_register_not_empty(&mut self) -> bool;

    /// Target refused the last address or data byte
    fn is_acknowledge_failure(&mut self) -> bool;

    /// Arbitration lost to another master
    fn is_arbitration_lost(&mut self) -> bool;

    /// Load a byte into the holding register
    fn write_data(&mut self, byte: u8);

    /// Take the received byte out of the holding register
    fn read_data(&mut self) -> u8;

    /// Clear the address-acknowledged condition
    ///
    /// On STM32F1 this is the SR1-then-SR2 read sequence.
    fn clear_address_flag(&mut self);

    /// Clear a latched acknowledge failure
    fn clear_acknowledge_failure(&mut self);

    /// Clear a latched arbitration loss
    fn clear_arbitration_lost(&mut self);

    /// Sample a single flag
    fn is_set(&mut self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::StartGenerated => self.is_start_generated(),
            StatusFlag::AddressAcknowledged => self.is_address_acknowledged(),
            StatusFlag::ByteTransferComplete => self.is_byte_transfer_complete(),
            StatusFlag::DataRegisterEmpty => self.is_data_register_empty(),
            StatusFlag::DataRegisterNotEmpty => self.is_data_register_not_empty(),
            StatusFlag::AcknowledgeFailure => self.is_acknowledge_failure(),
            StatusFlag::ArbitrationLost => self.is_arbitration_lost(),
            StatusFlag::BusBusy => self.is_bus_busy(),
        }
    }

    /// Sample every flag into a snapshot
    fn status(&mut self) -> StatusFlags {
        StatusFlag::ALL
            .iter()
            .fold(StatusFlags::EMPTY, |acc, &flag| acc.with(flag, self.is_set(flag)))
    }
}

/// I2C master configuration
///
/// Only standard mode is supported; `frequency` is carried so chip HALs
/// can validate it against what they are able to program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// SCL frequency in Hz
    pub frequency: u32,
    /// Upper bound for any single wait, in milliseconds
    pub timeout_ms: u32,
    /// Upper bound for the number of status samples in a single wait
    pub max_polls: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz), 25 ms per wait
    ///
    /// One byte takes 90 µs at 100 kHz; 25 ms also covers targets that
    /// stretch the clock while committing a page write.
    pub const STANDARD: Self = Self {
        frequency: 100_000,
        timeout_ms: 25,
        max_polls: 100_000,
    };

    /// Same bus timing with a different per-wait timeout
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Same bus timing with a different per-wait poll budget
    #[must_use]
    pub const fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }
}
