//! Packet encoding/decoding
//!
//! Packet format:
//! - 1 byte: Header (0x2E)
//! - 1 byte: Command
//! - 1 byte: Payload length
//! - N bytes: Payload
//! - 1 byte: Checksum, `(command + length + Σpayload) XOR 0xFF`, wrapping

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{LinkError, HEADER, MAX_PAYLOAD_SIZE};

/// A display protocol packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Command byte
    pub command: u8,
    /// Packet payload
    pub payload: Vec<u8>,
}

/// Checksum over command, length and payload
pub fn checksum(command: u8, payload: &[u8]) -> u8 {
    let sum = payload
        .iter()
        .fold(command.wrapping_add(payload.len() as u8), |acc, b| acc.wrapping_add(*b));
    sum ^ 0xFF
}

impl Packet {
    /// Create a new packet
    pub fn new(command: u8, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }

    /// Checksum this packet will carry
    pub fn checksum(&self) -> u8 {
        checksum(self.command, &self.payload)
    }

    /// Decode a packet from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, LinkError> {
        if data.len() < 4 {
            return Err(LinkError::InvalidFrame(format!("{} bytes is too short", data.len())));
        }
        if data[0] != HEADER {
            return Err(LinkError::InvalidFrame(format!("bad header {:#04x}", data[0])));
        }

        let command = data[1];
        let length = data[2] as usize;
        if data.len() < 3 + length + 1 {
            return Err(LinkError::InvalidFrame(format!(
                "length {} but only {} payload bytes",
                length,
                data.len().saturating_sub(4)
            )));
        }

        let payload = data[3..3 + length].to_vec();
        let actual = data[3 + length];
        let expected = checksum(command, &payload);
        if actual != expected {
            return Err(LinkError::ChecksumMismatch { expected, actual });
        }

        Ok(Self { command, payload })
    }

    /// Encode the packet to raw bytes
    ///
    /// Fails only when the payload does not fit the one-byte length field.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LinkError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(LinkError::PayloadTooLarge(self.payload.len()));
        }

        let mut bytes = Vec::with_capacity(self.encoded_size());
        bytes.push(HEADER);
        bytes.push(self.command);
        bytes.push(self.payload.len() as u8);
        bytes.extend_from_slice(&self.payload);
        bytes.push(self.checksum());
        Ok(bytes)
    }

    /// Get the total encoded size
    pub fn encoded_size(&self) -> usize {
        3 + self.payload.len() + 1
    }
}

/// Builder for constructing packets
pub struct PacketBuilder {
    command: u8,
    payload: Vec<u8>,
}

impl PacketBuilder {
    /// Start a packet for `command`
    pub fn new(command: u8) -> Self {
        Self {
            command,
            payload: Vec::new(),
        }
    }

    /// Add a single byte
    pub fn byte(mut self, b: u8) -> Self {
        self.payload.push(b);
        self
    }

    /// Add a 16-bit value (big-endian)
    pub fn u16_be(mut self, value: u16) -> Self {
        let mut bytes = [0u8; 2];
        BigEndian::write_u16(&mut bytes, value);
        self.payload.extend_from_slice(&bytes);
        self
    }

    /// Add a signed 16-bit value (little-endian)
    pub fn i16_le(mut self, value: i16) -> Self {
        let mut bytes = [0u8; 2];
        LittleEndian::write_i16(&mut bytes, value);
        self.payload.extend_from_slice(&bytes);
        self
    }

    /// Add the low 24 bits of a value (big-endian)
    pub fn u24_be(mut self, value: u32) -> Self {
        let mut bytes = [0u8; 3];
        BigEndian::write_u24(&mut bytes, value & 0x00FF_FFFF);
        self.payload.extend_from_slice(&bytes);
        self
    }

    /// Add `count` zero bytes
    pub fn zeros(mut self, count: usize) -> Self {
        self.payload.resize(self.payload.len() + count, 0);
        self
    }

    /// Build the packet
    pub fn build(self) -> Packet {
        Packet::new(self.command, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_wraps() {
        // 0x41 + 0x02 + 0xFF + 0xFF = 0x241 -> 0x41, inverted 0xBE
        assert_eq!(checksum(0x41, &[0xFF, 0xFF]), 0xBE);
        assert_eq!(checksum(0x00, &[]), 0xFF);
    }

    #[test]
    fn test_encode_layout() {
        let packet = Packet::new(0x91, vec![0x41, 0x02]);
        let bytes = packet.to_bytes().unwrap();
        // 0x91 + 0x02 + 0x41 + 0x02 = 0xD6, inverted 0x29
        assert_eq!(bytes, vec![0x2E, 0x91, 0x02, 0x41, 0x02, 0x29]);
        assert_eq!(bytes.len(), packet.encoded_size());
    }

    #[test]
    fn test_decode_roundtrip_and_checksum_mismatch() {
        let packet = PacketBuilder::new(0x41).byte(0x03).u16_be(88).build();
        let mut encoded = packet.to_bytes().unwrap();
        assert_eq!(Packet::from_bytes(&encoded).unwrap(), packet);

        encoded[4] ^= 0x01;
        assert!(matches!(
            Packet::from_bytes(&encoded),
            Err(LinkError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_builder_byte_orders() {
        let packet = PacketBuilder::new(0x26).i16_le(-2).u24_be(0x0001_4C08).build();
        assert_eq!(packet.payload, vec![0xFE, 0xFF, 0x01, 0x4C, 0x08]);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let packet = PacketBuilder::new(0x41).zeros(256).build();
        assert!(matches!(packet.to_bytes(), Err(LinkError::PayloadTooLarge(256))));
    }
}
