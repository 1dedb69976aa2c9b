//! Read-only diagnostic counters

use serde::Serialize;

use crate::bus::BusStatus;
use crate::supervisor::BusHealth;

/// Point-in-time gateway counters, for logging or an external console
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Active profile name, if any
    pub profile: Option<String>,
    /// Whether the synthetic generator feeds the store
    pub simulated: bool,
    /// Frames matched against the profile since activation
    pub frames_processed: u64,
    /// Frames with identifiers the profile does not list
    pub unknown_frames: u64,
    /// Transport read errors
    pub bus_read_errors: u64,
    /// Transport health counters from the last check
    pub bus: BusStatus,
    /// Supervisor verdict from the last check
    pub health: BusHealth,
    /// Display frames written
    pub frames_sent: u64,
    /// Display writes that failed
    pub write_failures: u64,
    /// Handshake replies written
    pub handshake_replies: u64,
    /// Milliseconds since the last handled frame
    pub silent_ms: u64,
}

impl Diagnostics {
    /// Compact single-line summary
    pub fn summary(&self) -> String {
        format!(
            "profile={} processed={} unknown={} sent={} failed={} health={:?} rx_err={} bus_err={}",
            self.profile.as_deref().unwrap_or("-"),
            self.frames_processed,
            self.unknown_frames,
            self.frames_sent,
            self.write_failures,
            self.health,
            self.bus.rx_errors,
            self.bus.bus_errors
        )
    }
}
