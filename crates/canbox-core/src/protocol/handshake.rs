//! Display handshake
//!
//! The head unit queries the gateway with framed requests and refuses to show
//! vehicle data until they are answered. Replies come from a fixed table;
//! there is no session state.

use std::time::Duration;

use super::commands::{
    STATUS_REPLY, STATUS_REQUEST, VERSION_REPLY, VERSION_REQUEST, VERSION_REQUEST_ALT,
};
use super::{DisplayLink, LinkError, Packet, HEADER};

/// Version advertised to the display
static VERSION: [u8; 3] = [0x02, 0x08, 0x10];

/// Status acknowledgement
static STATUS_OK: [u8; 2] = [0x41, 0x02];

/// Default wait between seeing a header and reading the rest of the request
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(5);

/// Default cap on bytes consumed per poll
pub const DEFAULT_BYTE_BUDGET: usize = 64;

/// Reply sent for a recognized request
pub type HandshakeReply = (u8, &'static [u8]);

/// Reply for a request command, if it is one the gateway answers
pub fn reply_for(request: u8) -> Option<HandshakeReply> {
    match request {
        VERSION_REQUEST | VERSION_REQUEST_ALT => Some((VERSION_REPLY, &VERSION[..])),
        STATUS_REQUEST => Some((STATUS_REPLY, &STATUS_OK[..])),
        _ => None,
    }
}

/// Inbound request handler
#[derive(Debug, Clone)]
pub struct Handshake {
    settle: Duration,
    byte_budget: usize,
    replies_sent: u64,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE)
    }
}

impl Handshake {
    /// Handler with the given settle delay
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            byte_budget: DEFAULT_BYTE_BUDGET,
            replies_sent: 0,
        }
    }

    /// Cap the bytes consumed by one [`poll`](Self::poll)
    pub fn with_byte_budget(mut self, budget: usize) -> Self {
        self.byte_budget = budget.max(1);
        self
    }

    /// Replies written since creation
    pub fn replies_sent(&self) -> u64 {
        self.replies_sent
    }

    /// Drain pending request bytes and answer recognized requests
    ///
    /// Bytes before a header are discarded. After a header the handler sleeps
    /// for the settle delay once, then reads command and length and skips the
    /// request payload plus checksum. Only bytes that have already arrived are
    /// read, so a poll never waits on the link. Returns the number of replies
    /// written.
    pub fn poll<L: DisplayLink + ?Sized>(&mut self, link: &mut L) -> Result<usize, LinkError> {
        let mut consumed = 0usize;
        let mut replies = 0usize;

        while consumed < self.byte_budget && link.bytes_available()? > 0 {
            let Some(byte) = link.read_byte()? else { break };
            consumed += 1;
            if byte != HEADER {
                continue;
            }

            if !self.settle.is_zero() {
                std::thread::sleep(self.settle);
            }

            if link.bytes_available()? == 0 {
                break;
            }
            let Some(command) = link.read_byte()? else { break };
            consumed += 1;

            let mut length = 0;
            if link.bytes_available()? > 0 {
                length = link.read_byte()?.unwrap_or(0);
                consumed += 1;
            }

            let mut skip = usize::from(length) + 1;
            while skip > 0 && link.bytes_available()? > 0 {
                if link.read_byte()?.is_none() {
                    break;
                }
                skip -= 1;
                consumed += 1;
            }

            match reply_for(command) {
                Some((reply, payload)) => {
                    let bytes = Packet::new(reply, payload.to_vec()).to_bytes()?;
                    link.write_all(&bytes)?;
                    self.replies_sent += 1;
                    replies += 1;
                    tracing::debug!("Handshake: request {:#04x} -> reply {:#04x}", command, reply);
                }
                None => {
                    tracing::trace!("Handshake: ignoring request {:#04x}", command);
                }
            }
        }

        Ok(replies)
    }
}
