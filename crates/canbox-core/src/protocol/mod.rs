//! Head-unit Display Protocol
//!
//! Framed binary protocol spoken over the serial link to the aftermarket
//! display: `[0x2E][command][length][payload][checksum]`, where the checksum
//! is the wrapping byte sum of command, length and payload, inverted.
//!
//! The display also talks back: it sends identification requests framed the
//! same way, answered from a fixed table by [`Handshake`].

pub mod commands;
mod error;
mod handshake;
mod packet;
pub mod serial;

pub use error::LinkError;
pub use handshake::{reply_for, Handshake, HandshakeReply};
pub use packet::{checksum, Packet, PacketBuilder};
pub use serial::{configure_port, list_ports, open_port, PortInfo, SerialLink};

/// Frame header byte
pub const HEADER: u8 = 0x2E;

/// Default display link speed
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Largest payload the one-byte length field can describe
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;

/// Byte-level access to the display link
///
/// Reads never block: callers check [`bytes_available`](Self::bytes_available)
/// first. Implemented by [`SerialLink`] and by in-memory doubles in tests.
pub trait DisplayLink {
    /// Number of bytes waiting to be read
    fn bytes_available(&mut self) -> Result<usize, LinkError>;

    /// Read one byte if any is waiting
    fn read_byte(&mut self) -> Result<Option<u8>, LinkError>;

    /// Write a complete frame
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError>;
}

impl<L: DisplayLink + ?Sized> DisplayLink for Box<L> {
    fn bytes_available(&mut self) -> Result<usize, LinkError> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        (**self).read_byte()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        (**self).write_all(bytes)
    }
}
