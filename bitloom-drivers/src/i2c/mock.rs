//! Simulated I2C peripheral for host tests
//!
//! `MockPort` models an STM32-style byte-mode master: a holding register in
//! front of a shift register in both directions, latched ACK-failure and
//! arbitration-lost flags, and an address flag that has to be cleared
//! explicitly. Every status sample clocks the simulated bus forward, so the
//! engine sees flags change only while it polls.
//!
//! Reception stalls with SCL low once the data register and the shift
//! register both hold a byte, as the real peripheral does. The ACK sent
//! for a byte is the ACK bit in force when the byte finishes, or, with
//! the position bit set, when it started.

use std::collections::VecDeque;
use std::vec::Vec;

use core::cell::Cell;

use bitloom_hal::{RegisterPort, StatusFlag, TickSource};

/// Something the engine did to the port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    Stop,
    Write(u8),
    Read(u8),
    Ack(bool),
    Position(bool),
    ClearAddress,
}

impl Event {
    /// Events that put something on the wire
    pub fn is_bus_event(&self) -> bool {
        matches!(
            self,
            Event::Start | Event::Stop | Event::Write(_) | Event::Read(_)
        )
    }
}

/// Byte in the receive shift register
#[derive(Debug, Clone, Copy)]
struct RxShift {
    byte: u8,
    progress: u32,
    /// ACK bit when the byte started
    ack_at_start: bool,
    done: bool,
}

pub struct MockPort {
    pub events: Vec<Event>,
    /// Bytes the target returns in receiver mode
    pub rx: VecDeque<u8>,
    /// ACK sent for each received byte, in order
    pub rx_acks: Vec<bool>,
    /// Data bytes that fully left the shift register
    pub wire: Vec<u8>,
    /// Protocol misuse (write into a full holding register, read from an
    /// empty one, data before the address flag was cleared)
    pub violations: usize,

    busy_samples: u32,
    nack_address: bool,
    nack_data_at: Option<usize>,
    lose_arbitration_at_write: Option<usize>,
    lose_arbitration_on_start: bool,
    nack_on_start: Option<usize>,
    stuck: Option<StatusFlag>,
    shift_samples: u32,
    rx_samples: u32,
    read_delay: u32,
    samples: [u32; 8],
    starts: usize,

    start_generated: bool,
    start_queued: bool,
    address_acked: bool,
    address_cleared: bool,
    ack_failure: bool,
    arbitration_lost: bool,
    receiving: bool,
    rx_nacked: bool,
    ack: bool,
    position: bool,
    writes: usize,
    holding: Option<u8>,
    shift: Option<u8>,
    shift_progress: u32,
    rx_holding: Option<u8>,
    rx_shift: Option<RxShift>,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            rx: VecDeque::new(),
            rx_acks: Vec::new(),
            wire: Vec::new(),
            violations: 0,
            busy_samples: 0,
            nack_address: false,
            nack_data_at: None,
            lose_arbitration_at_write: None,
            lose_arbitration_on_start: false,
            nack_on_start: None,
            stuck: None,
            shift_samples: 1,
            rx_samples: 1,
            read_delay: 0,
            samples: [0; 8],
            starts: 0,
            start_generated: false,
            start_queued: false,
            address_acked: false,
            address_cleared: false,
            ack_failure: false,
            arbitration_lost: false,
            receiving: false,
            rx_nacked: false,
            ack: true,
            position: false,
            writes: 0,
            holding: None,
            shift: None,
            shift_progress: 0,
            rx_holding: None,
            rx_shift: None,
        }
    }

    /// Bus reports busy for the first `samples` checks
    pub fn busy_for(mut self, samples: u32) -> Self {
        self.busy_samples = samples;
        self
    }

    pub fn busy_forever(self) -> Self {
        self.busy_for(u32::MAX)
    }

    /// Target ignores its address
    pub fn nack_address(mut self) -> Self {
        self.nack_address = true;
        self
    }

    /// Target NACKs the `n`th data byte (1-based)
    pub fn nack_data_byte(mut self, n: usize) -> Self {
        self.nack_data_at = Some(n);
        self
    }

    /// Arbitration is lost on the `n`th `write_data` call (1 = address)
    pub fn lose_arbitration_at_write(mut self, n: usize) -> Self {
        self.lose_arbitration_at_write = Some(n);
        self
    }

    /// Arbitration is lost while generating the start condition
    pub fn lose_arbitration_on_start(mut self) -> Self {
        self.lose_arbitration_on_start = true;
        self
    }

    /// Acknowledge failure is already latched when the `n`th start is
    /// requested (1-based), as if left over from the byte before
    pub fn latch_nack_on_start(mut self, n: usize) -> Self {
        self.nack_on_start = Some(n);
        self
    }

    /// `flag` never reads as set
    pub fn stuck(mut self, flag: StatusFlag) -> Self {
        self.stuck = Some(flag);
        self
    }

    /// Number of status samples a byte needs to shift out
    pub fn shift_samples(mut self, samples: u32) -> Self {
        self.shift_samples = samples.max(1);
        self
    }

    /// Number of status samples a byte needs to shift in
    pub fn receive_samples(mut self, samples: u32) -> Self {
        self.rx_samples = samples.max(1);
        self
    }

    /// Bus keeps clocking for `samples` steps after every data register
    /// read before the engine gets to react
    pub fn delay_after_read(mut self, samples: u32) -> Self {
        self.read_delay = samples;
        self
    }

    /// Target data for receiver mode
    pub fn with_rx(mut self, bytes: &[u8]) -> Self {
        self.rx.extend(bytes.iter().copied());
        self
    }

    /// Put the port in transmitter mode with the address phase done
    pub fn begin_write_for_test(&mut self) {
        self.address_cleared = true;
        self.receiving = false;
    }

    pub fn latch_acknowledge_failure(&mut self) {
        self.ack_failure = true;
    }

    pub fn latch_arbitration_lost(&mut self) {
        self.arbitration_lost = true;
    }

    /// Whether a received byte is still sitting in the data or shift register
    pub fn pending_rx(&self) -> bool {
        self.rx_holding.is_some() || self.rx_shift.is_some()
    }

    /// Whether any abort flag is still latched
    pub fn abort_latched(&self) -> bool {
        self.ack_failure || self.arbitration_lost
    }

    /// How many times `flag` was sampled
    pub fn samples_of(&self, flag: StatusFlag) -> u32 {
        self.samples[flag.mask().trailing_zeros() as usize]
    }

    /// Only the events that reach the wire, in order
    pub fn bus_events(&self) -> Vec<Event> {
        self.events
            .iter()
            .copied()
            .filter(Event::is_bus_event)
            .collect()
    }

    pub fn count(&self, event: Event) -> usize {
        self.events.iter().filter(|&&e| e == event).count()
    }

    /// Data bytes written after the first address byte
    pub fn data_writes(&self) -> Vec<u8> {
        self.events
            .iter()
            .skip_while(|e| !matches!(e, Event::ClearAddress))
            .filter_map(|e| match e {
                Event::Write(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    fn generate_start(&mut self) {
        self.start_generated = true;
        self.rx_nacked = false;
        self.address_acked = false;
        self.address_cleared = false;
        self.receiving = false;
    }

    /// Start shifting in the next target byte
    fn begin_receive(&mut self) {
        if self.rx_nacked || self.rx_shift.is_some() {
            return;
        }
        if let Some(byte) = self.rx.pop_front() {
            self.rx_shift = Some(RxShift {
                byte,
                progress: 0,
                ack_at_start: self.ack,
                done: false,
            });
        }
    }

    /// Move a finished byte from the shift register into an empty DR
    fn unload_receive_shift(&mut self) {
        if self.rx_holding.is_some() {
            return;
        }
        if let Some(shift) = self.rx_shift {
            if shift.done {
                self.rx_holding = Some(shift.byte);
                self.rx_shift = None;
            }
        }
    }

    fn clock_receiver(&mut self) {
        self.unload_receive_shift();
        if self.receiving && self.address_cleared {
            self.begin_receive();
        }

        if let Some(shift) = self.rx_shift.as_mut() {
            if !shift.done {
                shift.progress += 1;
                if shift.progress >= self.rx_samples {
                    shift.done = true;
                    let ack = if self.position {
                        shift.ack_at_start
                    } else {
                        self.ack
                    };
                    self.rx_acks.push(ack);
                    self.rx_nacked = !ack;
                }
            }
        }
        self.unload_receive_shift();

        // A start requested during reception goes out after the NACKed byte
        let shifting = self.rx_shift.is_some_and(|shift| !shift.done);
        if self.start_queued && !shifting && (self.rx_nacked || self.rx.is_empty()) {
            self.start_queued = false;
            self.generate_start();
        }
    }

    fn sample(&mut self, flag: StatusFlag, value: bool) -> bool {
        self.samples[flag.mask().trailing_zeros() as usize] += 1;
        value && self.stuck != Some(flag)
    }

    /// Clock the simulated bus by one step
    fn advance(&mut self) {
        if self.ack_failure || self.arbitration_lost {
            return;
        }

        if self.receiving || self.rx_shift.is_some() {
            self.clock_receiver();
            return;
        }

        if let Some(byte) = self.shift {
            self.shift_progress += 1;
            if self.shift_progress >= self.shift_samples {
                self.shift = None;
                self.shift_progress = 0;
                self.wire.push(byte);
                if Some(self.wire.len()) == self.nack_data_at {
                    self.ack_failure = true;
                    self.holding = None;
                    return;
                }
                self.shift = self.holding.take();
            }
        }
    }
}

impl RegisterPort for MockPort {
    fn is_bus_busy(&mut self) -> bool {
        let busy = self.busy_samples > 0;
        if busy && self.busy_samples != u32::MAX {
            self.busy_samples -= 1;
        }
        busy || self.stuck == Some(StatusFlag::BusBusy)
    }

    fn set_start(&mut self) {
        self.events.push(Event::Start);
        self.starts += 1;
        if Some(self.starts) == self.nack_on_start {
            self.ack_failure = true;
        }
        if self.lose_arbitration_on_start {
            self.arbitration_lost = true;
            return;
        }
        if self.receiving && self.address_cleared {
            self.start_queued = true;
            return;
        }
        self.rx_holding = None;
        self.rx_shift = None;
        self.generate_start();
    }

    fn set_stop(&mut self) {
        self.events.push(Event::Stop);
    }

    fn set_acknowledge(&mut self, enabled: bool) {
        self.events.push(Event::Ack(enabled));
        self.ack = enabled;
    }

    fn set_acknowledge_position(&mut self, next: bool) {
        self.events.push(Event::Position(next));
        self.position = next;
    }

    fn is_start_generated(&mut self) -> bool {
        self.advance();
        self.sample(StatusFlag::StartGenerated, self.start_generated)
    }

    fn is_address_acknowledged(&mut self) -> bool {
        self.advance();
        self.sample(StatusFlag::AddressAcknowledged, self.address_acked)
    }

    fn is_byte_transfer_complete(&mut self) -> bool {
        self.advance();
        let sent = !self.receiving
            && self.address_cleared
            && self.holding.is_none()
            && self.shift.is_none()
            && !self.wire.is_empty()
            && !self.ack_failure;
        let received =
            self.rx_holding.is_some() && self.rx_shift.is_some_and(|shift| shift.done);
        self.sample(StatusFlag::ByteTransferComplete, sent || received)
    }

    fn is_data_register_empty(&mut self) -> bool {
        self.advance();
        // A NACK stalls the transmitter until the flag is cleared
        let empty = !self.receiving
            && self.address_cleared
            && self.holding.is_none()
            && !self.ack_failure;
        self.sample(StatusFlag::DataRegisterEmpty, empty)
    }

    fn is_data_register_not_empty(&mut self) -> bool {
        self.advance();
        let full = self.rx_holding.is_some();
        self.sample(StatusFlag::DataRegisterNotEmpty, full)
    }

    fn is_acknowledge_failure(&mut self) -> bool {
        self.sample(StatusFlag::AcknowledgeFailure, self.ack_failure)
    }

    fn is_arbitration_lost(&mut self) -> bool {
        self.sample(StatusFlag::ArbitrationLost, self.arbitration_lost)
    }

    fn write_data(&mut self, byte: u8) {
        self.events.push(Event::Write(byte));
        self.writes += 1;

        if Some(self.writes) == self.lose_arbitration_at_write {
            self.arbitration_lost = true;
            return;
        }

        if self.start_generated {
            // Address byte
            self.start_generated = false;
            self.receiving = byte & 1 == 1;
            if self.nack_address {
                self.ack_failure = true;
            } else {
                self.address_acked = true;
            }
            return;
        }

        if !self.address_cleared || self.holding.is_some() {
            self.violations += 1;
        }
        if self.shift.is_none() {
            self.shift = Some(byte);
        } else {
            self.holding = Some(byte);
        }
    }

    fn read_data(&mut self) -> u8 {
        match self.rx_holding.take() {
            Some(byte) => {
                self.events.push(Event::Read(byte));
                // A finished byte waiting in the shift register moves up
                // at once
                self.unload_receive_shift();
                for _ in 0..self.read_delay {
                    self.advance();
                }
                byte
            }
            None => {
                self.violations += 1;
                0
            }
        }
    }

    fn clear_address_flag(&mut self) {
        self.events.push(Event::ClearAddress);
        self.address_acked = false;
        self.address_cleared = true;
        if self.receiving {
            self.begin_receive();
        }
    }

    fn clear_acknowledge_failure(&mut self) {
        self.ack_failure = false;
    }

    fn clear_arbitration_lost(&mut self) {
        self.arbitration_lost = false;
    }
}

/// Time source that advances on every read
pub struct MockClock {
    now: Cell<u32>,
    step: u32,
}

impl MockClock {
    /// Advances 1 ms per read
    pub fn new() -> Self {
        Self {
            now: Cell::new(0),
            step: 1,
        }
    }

    /// Never advances
    pub fn frozen() -> Self {
        Self {
            now: Cell::new(0),
            step: 0,
        }
    }
}

impl TickSource for MockClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}
