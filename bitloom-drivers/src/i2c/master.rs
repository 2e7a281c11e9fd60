//! Polled I2C master transaction engine
//!
//! Drives a [`RegisterPort`] through complete master-transmit and
//! master-receive sequences:
//!
//! ```text
//! bus idle? ─► START ─► SB ─► ADDR+W ─► ADDR ─► data … ─► BTF ─► STOP
//!                                 │                  │
//!                                 └── NACK / ARLO ───┴─► STOP + error
//! ```
//!
//! Every wait is bounded by the configured [`PollBudget`]; every failure
//! after a start condition issues exactly one stop and clears the latched
//! abort flags before returning, so the next transaction starts on a clean
//! bus.
//!
//! The engine owns its port and every operation takes `&mut self`: only
//! one transaction can be in flight per engine. Use
//! [`super::SharedI2c`] to hand the bus to several contexts.

use bitloom_hal::{I2cConfig, RegisterPort, StatusFlag, TickSource};
use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

use super::error::I2cError;
use super::poller::{AbortCause, PollBudget, StatusPoller, WaitOutcome};

/// Highest valid 7-bit address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Transaction progress
///
/// Lives only for the duration of one engine call; nothing survives
/// between transactions except the physical bus state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    /// No start issued yet
    Idle,
    /// Start requested, waiting for the start flag
    StartPending,
    /// Address written, waiting for the target to acknowledge
    AddressPending,
    /// Streaming data bytes
    DataPending,
    /// Stop requested
    StopPending,
}

/// Direction bit of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write,
    Read,
}

impl Direction {
    /// Address byte for `address` with this direction
    pub fn address_byte(self, address: u8) -> u8 {
        match self {
            Direction::Write => address << 1,
            Direction::Read => (address << 1) | 1,
        }
    }
}

/// What follows the last byte of a read group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadEnd {
    Stop,
    Restart,
}

/// I2C master over a register port
pub struct I2cMaster<P, T> {
    port: P,
    poller: StatusPoller<T>,
    config: I2cConfig,
}

impl<P: RegisterPort, T: TickSource> I2cMaster<P, T> {
    /// Create an engine over `port`, timing waits with `clock`
    pub fn new(port: P, clock: T, config: I2cConfig) -> Self {
        Self {
            port,
            poller: StatusPoller::new(clock, PollBudget::from(&config)),
            config,
        }
    }

    /// Configuration the engine was built with
    pub fn config(&self) -> &I2cConfig {
        &self.config
    }

    /// Direct access to the port, e.g. for bus recovery
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Tear the engine down and return its parts
    pub fn release(self) -> (P, T) {
        (self.port, self.poller.into_clock())
    }

    /// Write `data` to the target at `address`
    ///
    /// An empty `data` only runs the address phase, which makes it a
    /// presence check.
    pub fn master_transmit(&mut self, address: u8, data: &[u8]) -> Result<(), I2cError> {
        self.run(address, |txn| txn.write_phase(address, data.iter().copied()))
    }

    /// Write `register` followed by `data` to the target at `address`
    pub fn master_transmit_register(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), I2cError> {
        self.run(address, |txn| {
            let bytes = core::iter::once(register).chain(data.iter().copied());
            txn.write_phase(address, bytes)
        })
    }

    /// Read `out.len()` bytes starting at `register`
    ///
    /// Writes the register selector, issues a repeated start and reads
    /// back with the last byte NACKed. With an empty `out` only the
    /// register pointer is written.
    pub fn read_register(
        &mut self,
        address: u8,
        register: u8,
        out: &mut [u8],
    ) -> Result<(), I2cError> {
        self.run(address, |txn| {
            txn.write_phase(address, core::iter::once(register))?;
            if out.is_empty() {
                return Ok(());
            }
            let count = out.len();
            txn.read_phase(address, out.iter_mut(), count, ReadEnd::Stop)
        })
    }

    /// Read `out.len()` bytes from the target at `address`
    pub fn master_receive(&mut self, address: u8, out: &mut [u8]) -> Result<(), I2cError> {
        self.run(address, |txn| {
            let count = out.len();
            txn.read_phase(address, out.iter_mut(), count, ReadEnd::Stop)
        })
    }

    /// Check whether a target answers at `address`
    pub fn probe(&mut self, address: u8) -> Result<(), I2cError> {
        self.master_transmit(address, &[])
    }

    /// Run `body` as one transaction: bus-idle check before, stop after
    fn run(
        &mut self,
        address: u8,
        body: impl FnOnce(&mut Transaction<'_, P, T>) -> Result<(), I2cError>,
    ) -> Result<(), I2cError> {
        if address > MAX_ADDRESS {
            return Err(I2cError::InvalidAddress);
        }

        let mut txn = Transaction::new(&mut self.port, &self.poller);
        txn.wait_bus_idle()?;

        match body(&mut txn) {
            Ok(()) => {
                txn.stop();
                Ok(())
            }
            Err(e) => {
                txn.abort();
                Err(e)
            }
        }
    }
}

/// One transaction in flight
///
/// Tracks where the sequence is so a failure can be classified and
/// unwound with a single stop.
struct Transaction<'a, P, T> {
    port: &'a mut P,
    poller: &'a StatusPoller<T>,
    state: BusState,
    started: bool,
    stopped: bool,
    restart_pending: bool,
    /// POS is set and has to be cleared before the next transaction
    position_set: bool,
    /// A data byte went out since the last address byte
    data_sent: bool,
}

impl<'a, P: RegisterPort, T: TickSource> Transaction<'a, P, T> {
    fn new(port: &'a mut P, poller: &'a StatusPoller<T>) -> Self {
        Self {
            port,
            poller,
            state: BusState::Idle,
            started: false,
            stopped: false,
            restart_pending: false,
            position_set: false,
            data_sent: false,
        }
    }

    fn wait_bus_idle(&mut self) -> Result<(), I2cError> {
        match self.poller.wait_while_busy(self.port) {
            WaitOutcome::Ready => Ok(()),
            _ => Err(I2cError::BusBusyTimeout),
        }
    }

    /// Wait for `flag`, classifying aborts by the current phase
    fn wait(&mut self, flag: StatusFlag) -> Result<(), I2cError> {
        match self.poller.wait_for(self.port, flag) {
            WaitOutcome::Ready => Ok(()),
            WaitOutcome::TimedOut => Err(I2cError::PollTimeout),
            WaitOutcome::Aborted(AbortCause::ArbitrationLost) => Err(I2cError::ArbitrationLost),
            WaitOutcome::Aborted(AbortCause::AcknowledgeFailure) => match self.state {
                BusState::AddressPending => Err(I2cError::AddressNacked),
                BusState::DataPending => Err(I2cError::DataNacked),
                // Outside a byte phase the flag was latched by whatever
                // byte went out last
                BusState::Idle | BusState::StartPending | BusState::StopPending => {
                    if self.data_sent {
                        Err(I2cError::DataNacked)
                    } else {
                        Err(I2cError::AddressNacked)
                    }
                }
            },
        }
    }

    /// Start, or repeated start when one is already queued
    fn start(&mut self) -> Result<(), I2cError> {
        self.state = BusState::StartPending;
        self.started = true;
        if self.restart_pending {
            self.restart_pending = false;
        } else {
            self.port.set_start();
        }
        self.wait(StatusFlag::StartGenerated)
    }

    /// Send the address byte and wait for the target's ACK
    ///
    /// The address flag is left set; the caller clears it once the
    /// direction-specific setup is done.
    fn address(&mut self, address: u8, direction: Direction) -> Result<(), I2cError> {
        self.state = BusState::AddressPending;
        self.data_sent = false;
        self.port.write_data(direction.address_byte(address));
        self.wait(StatusFlag::AddressAcknowledged)
    }

    /// Start + address + `bytes` back to back, ending on BTF
    fn write_phase(
        &mut self,
        address: u8,
        bytes: impl Iterator<Item = u8>,
    ) -> Result<(), I2cError> {
        self.start()?;
        self.address(address, Direction::Write)?;
        self.port.clear_address_flag();
        self.state = BusState::DataPending;

        let mut bytes = bytes.peekable();
        let mut any = false;

        while let Some(byte) = bytes.next() {
            any = true;
            self.wait(StatusFlag::DataRegisterEmpty)?;
            self.port.write_data(byte);
            self.data_sent = true;

            // Both registers drained already: queue the next byte now
            // instead of paying another poll round-trip
            if bytes.peek().is_some() && self.port.is_byte_transfer_complete() {
                if let Some(next) = bytes.next() {
                    self.port.write_data(next);
                }
            }
        }

        if any {
            self.wait(StatusFlag::ByteTransferComplete)?;
        }
        Ok(())
    }

    /// Start + address with read bit + receive `count` bytes into `slots`
    ///
    /// The NACK and the stop for the last byte must be set up before that
    /// byte finishes, however late the engine gets to run. The tail of the
    /// read is therefore only touched while the peripheral holds SCL low
    /// with both registers full (byte-transfer-complete), never by racing
    /// the bus:
    ///
    /// - one byte: ACK off before the address flag is cleared, then stop;
    /// - two bytes: ACK applies to the next byte (POS), ACK off right
    ///   after the address flag, both bytes read once they are in;
    /// - more: stream until three remain, then NACK with byte N-2 and N-1
    ///   held, and stop with N-1 and N held.
    fn read_phase<'b>(
        &mut self,
        address: u8,
        slots: impl Iterator<Item = &'b mut u8>,
        count: usize,
        end: ReadEnd,
    ) -> Result<(), I2cError> {
        self.start()?;
        self.address(address, Direction::Read)?;
        self.state = BusState::DataPending;

        let mut slots = slots.take(count);

        match count {
            0 | 1 => {
                // ACK/NACK for the first byte is decided by the ACK bit in
                // force when the address flag is cleared
                self.port.set_acknowledge(false);
                self.port.clear_address_flag();
                self.finish_read(end);
                if let Some(slot) = slots.next() {
                    self.receive(slot)?;
                }
            }
            2 => {
                self.port.set_acknowledge(true);
                self.port.set_acknowledge_position(true);
                self.position_set = true;
                self.port.clear_address_flag();
                self.port.set_acknowledge(false);

                self.wait(StatusFlag::ByteTransferComplete)?;
                self.finish_read(end);
                for slot in slots {
                    *slot = self.port.read_data();
                }
                self.port.set_acknowledge_position(false);
                self.position_set = false;
            }
            _ => {
                self.port.set_acknowledge(true);
                self.port.clear_address_flag();

                for slot in slots.by_ref().take(count - 3) {
                    self.receive(slot)?;
                }

                // N-2 in DR, N-1 in the shift register
                self.wait(StatusFlag::ByteTransferComplete)?;
                self.port.set_acknowledge(false);
                if let Some(slot) = slots.next() {
                    *slot = self.port.read_data();
                }

                // N-1 in DR, N in the shift register, NACK sent
                self.wait(StatusFlag::ByteTransferComplete)?;
                self.finish_read(end);
                for slot in slots {
                    *slot = self.port.read_data();
                }
            }
        }
        Ok(())
    }

    /// Wait for one received byte and store it
    fn receive(&mut self, slot: &mut u8) -> Result<(), I2cError> {
        self.wait(StatusFlag::DataRegisterNotEmpty)?;
        *slot = self.port.read_data();
        Ok(())
    }

    /// Queue whatever follows the byte currently being received
    fn finish_read(&mut self, end: ReadEnd) {
        match end {
            ReadEnd::Stop => self.stop(),
            ReadEnd::Restart => {
                self.port.set_start();
                self.restart_pending = true;
            }
        }
    }

    /// Issue the stop condition once
    fn stop(&mut self) {
        if self.started && !self.stopped {
            self.state = BusState::StopPending;
            self.port.set_stop();
            self.stopped = true;
        }
        self.state = BusState::Idle;
    }

    /// Unwind after a failure: release the bus and clear latched aborts
    fn abort(&mut self) {
        if self.position_set {
            self.port.set_acknowledge_position(false);
            self.position_set = false;
        }
        if self.port.is_acknowledge_failure() {
            self.port.clear_acknowledge_failure();
        }
        if self.port.is_arbitration_lost() {
            self.port.clear_arbitration_lost();
        }
        self.stop();
    }

    /// Execute embedded-hal operations as one transaction
    ///
    /// Adjacent operations of the same kind share one address phase; a
    /// change of kind issues a repeated start.
    fn operations(&mut self, address: u8, ops: &mut [Operation<'_>]) -> Result<(), I2cError> {
        let mut rest = ops;

        while !rest.is_empty() {
            let is_read = matches!(rest[0], Operation::Read(_));
            let len = rest
                .iter()
                .take_while(|op| matches!(op, Operation::Read(_)) == is_read)
                .count();
            let (group, tail) = core::mem::take(&mut rest).split_at_mut(len);
            rest = tail;

            if is_read {
                let count = group
                    .iter()
                    .map(|op| match op {
                        Operation::Read(buf) => buf.len(),
                        Operation::Write(_) => 0,
                    })
                    .sum();
                let end = if rest.is_empty() {
                    ReadEnd::Stop
                } else {
                    ReadEnd::Restart
                };
                let slots = group
                    .iter_mut()
                    .filter_map(|op| match op {
                        Operation::Read(buf) => Some(buf.iter_mut()),
                        Operation::Write(_) => None,
                    })
                    .flatten();
                self.read_phase(address, slots, count, end)?;
            } else {
                let bytes = group
                    .iter()
                    .filter_map(|op| match op {
                        Operation::Write(bytes) => Some(bytes.iter().copied()),
                        Operation::Read(_) => None,
                    })
                    .flatten();
                self.write_phase(address, bytes)?;
            }
        }
        Ok(())
    }
}

impl<P: RegisterPort, T: TickSource> ErrorType for I2cMaster<P, T> {
    type Error = I2cError;
}

impl<P: RegisterPort, T: TickSource> I2c for I2cMaster<P, T> {
    fn read(&mut self, address: SevenBitAddress, read: &mut [u8]) -> Result<(), Self::Error> {
        self.master_receive(address, read)
    }

    fn write(&mut self, address: SevenBitAddress, write: &[u8]) -> Result<(), Self::Error> {
        self.master_transmit(address, write)
    }

    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run(address, |txn| txn.operations(address, operations))
    }
}
