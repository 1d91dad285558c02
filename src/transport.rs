//! Transport abstraction — any byte-oriented serial channel.
//!
//! Concrete implementations live with the board support code:
//! - Hardware UART / USB CDC
//! - A host-side pipe when the programmer runs under an emulator
//!
//! The command parser is generic over `Transport`, so porting the firmware
//! to a new serial peripheral requires zero changes to the framing logic.

use heapless::{Deque, Vec};

/// Byte-oriented transport channel.
///
/// Reads are strictly non-blocking: the parser calls [`available`] first and
/// only then [`read_byte`], consuming exactly one byte per poll.
///
/// [`available`]: Transport::available
/// [`read_byte`]: Transport::read_byte
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Check if at least one byte is ready to read.
    fn available(&self) -> bool;

    /// Read a single byte. Only valid after [`Transport::available`]
    /// returned `true`.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Write `data` to the transport in full.
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// A null transport that discards all writes and never has data.
/// Useful as a default when no host is connected.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn available(&self) -> bool {
        false
    }

    fn read_byte(&mut self) -> Result<u8, ()> {
        Err(())
    }

    fn write(&mut self, _data: &[u8]) -> Result<(), ()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

/// Capacity of the loopback FIFOs. Large enough for a maximum-size frame
/// in each direction with room to spare.
const LOOPBACK_CAPACITY: usize = 1024;

/// Error type for [`LoopbackTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackError {
    /// A read was attempted with no byte queued.
    Empty,
    /// A write overflowed the outbound buffer.
    Overflow,
}

impl core::fmt::Display for LoopbackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "read from empty loopback"),
            Self::Overflow => write!(f, "loopback write overflow"),
        }
    }
}

/// In-memory transport for host-side tests and examples.
///
/// Bytes queued with [`push_incoming`] are served to the parser one at a
/// time; everything the parser writes is recorded and can be inspected with
/// [`sent`].
///
/// [`push_incoming`]: LoopbackTransport::push_incoming
/// [`sent`]: LoopbackTransport::sent
pub struct LoopbackTransport {
    rx: Deque<u8, LOOPBACK_CAPACITY>,
    tx: Vec<u8, LOOPBACK_CAPACITY>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            rx: Deque::new(),
            tx: Vec::new(),
        }
    }

    /// Queue bytes for the parser to read. Bytes beyond the FIFO capacity
    /// are dropped, mirroring a saturated hardware receive buffer.
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.rx.push_back(b).is_err() {
                break;
            }
        }
    }

    /// Everything written to the transport since the last [`clear_sent`].
    ///
    /// [`clear_sent`]: LoopbackTransport::clear_sent
    pub fn sent(&self) -> &[u8] {
        &self.tx
    }

    /// Discard the recorded outbound bytes.
    pub fn clear_sent(&mut self) {
        self.tx.clear();
    }

    /// Number of queued inbound bytes not yet consumed.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    type Error = LoopbackError;

    fn available(&self) -> bool {
        !self.rx.is_empty()
    }

    fn read_byte(&mut self) -> Result<u8, LoopbackError> {
        self.rx.pop_front().ok_or(LoopbackError::Empty)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), LoopbackError> {
        self.tx
            .extend_from_slice(data)
            .map_err(|()| LoopbackError::Overflow)
    }

    fn flush(&mut self) -> Result<(), LoopbackError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_transport_never_has_data() {
        let mut t = NullTransport;
        assert!(!t.available());
        assert!(t.read_byte().is_err());
        assert!(t.write(&[1, 2, 3]).is_ok());
    }

    #[test]
    fn loopback_round_trip() {
        let mut t = LoopbackTransport::new();
        assert!(!t.available());

        t.push_incoming(&[0xAA, 0xBB]);
        assert!(t.available());
        assert_eq!(t.pending(), 2);
        assert_eq!(t.read_byte(), Ok(0xAA));
        assert_eq!(t.read_byte(), Ok(0xBB));
        assert!(!t.available());
        assert_eq!(t.read_byte(), Err(LoopbackError::Empty));
    }

    #[test]
    fn loopback_records_writes() {
        let mut t = LoopbackTransport::new();
        t.write(&[1, 2]).unwrap();
        t.write(&[3]).unwrap();
        assert_eq!(t.sent(), &[1, 2, 3]);

        t.clear_sent();
        assert!(t.sent().is_empty());
    }

    #[test]
    fn loopback_write_overflow_is_typed() {
        let mut t = LoopbackTransport::new();
        let big = [0u8; LOOPBACK_CAPACITY + 1];
        assert_eq!(t.write(&big), Err(LoopbackError::Overflow));
    }
}
