//! UART byte buffers
//!
//! Fixed-capacity queues between the UART interrupt handlers and thread
//! code. The RX-complete handler pushes with [`UartBuffers::on_receive`],
//! the data-register-empty handler pulls with [`UartBuffers::next_to_send`]
//! and disables itself once that returns `None`.
//!
//! Register access stays in the chip HAL; this type only holds the bytes.

use bitloom_hal::{UartRx, UartTx};
use heapless::Deque;

/// Buffer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartError {
    /// Not all bytes fit in the transmit queue
    Full,
    /// No received byte available
    Empty,
    /// Transmit queue not drained yet
    Busy,
}

/// RX and TX queues of one UART
pub struct UartBuffers<const RX: usize, const TX: usize> {
    rx: Deque<u8, RX>,
    tx: Deque<u8, TX>,
    dropped: u32,
}

impl<const RX: usize, const TX: usize> UartBuffers<RX, TX> {
    pub const fn new() -> Self {
        Self {
            rx: Deque::new(),
            tx: Deque::new(),
            dropped: 0,
        }
    }

    /// Store a received byte (RX-complete interrupt)
    ///
    /// The byte is discarded and counted when the queue is full.
    pub fn on_receive(&mut self, byte: u8) {
        if self.rx.push_back(byte).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
        }
    }

    /// Next byte for the data register (data-register-empty interrupt)
    ///
    /// `None` means the queue is drained and the interrupt can be disabled.
    pub fn next_to_send(&mut self) -> Option<u8> {
        self.tx.pop_front()
    }

    /// Queue bytes for transmission, returns how many were accepted
    pub fn queue(&mut self, data: &[u8]) -> usize {
        data.iter()
            .take_while(|&&byte| self.tx.push_back(byte).is_ok())
            .count()
    }

    /// Move received bytes into `buf`, returns how many were copied
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.rx.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Received bytes lost to a full queue
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Received bytes waiting to be read
    pub fn available(&self) -> usize {
        self.rx.len()
    }

    /// Whether bytes are still waiting to go out
    pub fn is_sending(&self) -> bool {
        !self.tx.is_empty()
    }
}

impl<const RX: usize, const TX: usize> Default for UartBuffers<RX, TX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const RX: usize, const TX: usize> UartTx for UartBuffers<RX, TX> {
    type Error = UartError;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if self.queue(data) == data.len() {
            Ok(())
        } else {
            Err(UartError::Full)
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.is_sending() {
            Err(UartError::Busy)
        } else {
            Ok(())
        }
    }
}

impl<const RX: usize, const TX: usize> UartRx for UartBuffers<RX, TX> {
    type Error = UartError;

    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.read(buf))
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        self.rx.pop_front().ok_or(UartError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec::Vec;

    #[test]
    fn test_receive_and_read() {
        let mut uart: UartBuffers<4, 4> = UartBuffers::new();
        uart.on_receive(b'o');
        uart.on_receive(b'k');
        assert_eq!(uart.available(), 2);

        let mut buf = [0u8; 8];
        assert_eq!(uart.read(&mut buf), 2);
        assert_eq!(&buf[..2], b"ok");
        assert_eq!(uart.read(&mut buf), 0);
    }

    #[test]
    fn test_full_rx_drops_newest() {
        let mut uart: UartBuffers<2, 1> = UartBuffers::new();
        for byte in [1, 2, 3, 4] {
            uart.on_receive(byte);
        }
        assert_eq!(uart.dropped(), 2);

        let mut buf = [0u8; 4];
        assert_eq!(uart.read(&mut buf), 2);
        assert_eq!(&buf[..2], &[1, 2]);
    }

    #[test]
    fn test_send_drains_in_order() {
        let mut uart: UartBuffers<1, 8> = UartBuffers::new();
        assert_eq!(uart.queue(b"abc"), 3);
        assert!(uart.is_sending());
        assert_eq!(uart.flush(), Err(UartError::Busy));

        assert_eq!(uart.next_to_send(), Some(b'a'));
        assert_eq!(uart.next_to_send(), Some(b'b'));
        assert_eq!(uart.next_to_send(), Some(b'c'));
        // Interrupt can be disabled now
        assert_eq!(uart.next_to_send(), None);
        assert_eq!(uart.flush(), Ok(()));
    }

    #[test]
    fn test_queue_accepts_what_fits() {
        let mut uart: UartBuffers<1, 3> = UartBuffers::new();
        assert_eq!(uart.queue(b"hello"), 3);
        assert_eq!(uart.write_blocking(b"!"), Err(UartError::Full));
        assert_eq!(uart.next_to_send(), Some(b'h'));
        assert_eq!(uart.write_blocking(b"!"), Ok(()));
    }

    #[test]
    fn test_read_byte_on_empty_queue() {
        let mut uart: UartBuffers<2, 2> = UartBuffers::new();
        assert_eq!(uart.read_byte(), Err(UartError::Empty));
        uart.on_receive(0x7E);
        assert_eq!(uart.read_byte(), Ok(0x7E));
    }

    proptest! {
        #[test]
        fn prop_tx_preserves_order(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut uart: UartBuffers<1, 32> = UartBuffers::new();
            let accepted = uart.queue(&data);
            prop_assert_eq!(accepted, data.len().min(32));

            let sent: Vec<u8> = core::iter::from_fn(|| uart.next_to_send()).collect();
            prop_assert_eq!(&sent[..], &data[..accepted]);
        }
    }
}
