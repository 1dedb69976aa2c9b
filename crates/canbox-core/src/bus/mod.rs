//! CAN Bus Transport
//!
//! The gateway reads from exactly one upstream bus. [`CanBus`] is the seam
//! between the run loop and whatever delivers frames: a SocketCAN interface
//! in the binary, a text capture via [`ReplayBus`], or a scripted double in
//! tests.

mod error;
mod replay;

use serde::Serialize;

pub use error::BusError;
pub use replay::{parse_capture_line, ReplayBus};

/// Largest classic CAN payload
pub const MAX_DLC: usize = 8;

/// One inbound frame, payload zero-padded to 8 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    /// 11-bit identifier
    pub id: u16,
    /// Payload, bytes past `len` are zero
    pub data: [u8; MAX_DLC],
    /// Data length code
    pub len: u8,
}

impl CanFrame {
    /// Build a frame from up to 8 payload bytes; longer input is truncated
    pub fn new(id: u16, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_DLC);
        let mut data = [0u8; MAX_DLC];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            id,
            data,
            len: len as u8,
        }
    }

    /// Payload bytes actually received
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len)]
    }
}

/// Controller error state as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    /// Error-active, normal operation
    #[default]
    Running,
    /// An error counter passed the warning limit
    ErrorWarning,
    /// Error-passive
    ErrorPassive,
    /// Bus-off; no traffic until the controller is restarted
    BusOff,
    /// The transport itself went away
    Disconnected,
}

/// Snapshot of transport health counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BusStatus {
    /// Controller state
    pub state: ControllerState,
    /// Receive error counter
    pub rx_errors: u32,
    /// Bus error counter
    pub bus_errors: u32,
}

/// Upstream frame source
pub trait CanBus {
    /// Return the next frame if one is waiting, without blocking
    fn poll_frame(&mut self) -> Result<Option<CanFrame>, BusError>;

    /// Current controller state and error counters
    fn status(&mut self) -> BusStatus;
}

impl<B: CanBus + ?Sized> CanBus for Box<B> {
    fn poll_frame(&mut self) -> Result<Option<CanFrame>, BusError> {
        (**self).poll_frame()
    }

    fn status(&mut self) -> BusStatus {
        (**self).status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_payload_zero_padded() {
        let frame = CanFrame::new(0x6F6, &[0x8D]);
        assert_eq!(frame.len, 1);
        assert_eq!(frame.data, [0x8D, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(frame.payload(), &[0x8D]);
    }

    #[test]
    fn test_long_payload_truncated() {
        let frame = CanFrame::new(0x180, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data, [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
