//! Shared test doubles

#![allow(dead_code)]

use canbox_core::bus::{BusError, BusStatus, CanBus, CanFrame};
use canbox_core::calibration::Calibration;
use canbox_core::clock::ManualClock;
use canbox_core::gateway::Gateway;
use canbox_core::output::SchedulerConfig;
use canbox_core::protocol::{DisplayLink, LinkError, Packet, HEADER};
use canbox_core::supervisor::{RestartReason, Restarter};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// In-memory display link
#[derive(Debug, Default)]
pub struct MockLink {
    pub sent: Vec<u8>,
    pub inbound: VecDeque<u8>,
    pub fail_writes: bool,
    pub write_attempts: usize,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the gateway to read
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    /// Split everything written so far into frames
    pub fn frames(&self) -> Vec<Packet> {
        split_frames(&self.sent)
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl DisplayLink for MockLink {
    fn bytes_available(&mut self) -> Result<usize, LinkError> {
        Ok(self.inbound.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        Ok(self.inbound.pop_front())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.write_attempts += 1;
        if self.fail_writes {
            return Err(LinkError::NotReady);
        }
        self.sent.extend_from_slice(bytes);
        Ok(())
    }
}

/// Parse a byte stream of back-to-back frames, checking every checksum
pub fn split_frames(mut bytes: &[u8]) -> Vec<Packet> {
    let mut packets = Vec::new();
    while !bytes.is_empty() {
        assert_eq!(bytes[0], HEADER, "stream out of sync: {:02X?}", bytes);
        let len = bytes[2] as usize;
        let frame = &bytes[..4 + len];
        packets.push(Packet::from_bytes(frame).expect("valid frame"));
        bytes = &bytes[4 + len..];
    }
    packets
}

/// Bus fed from a script of frames and status snapshots
#[derive(Debug, Default)]
pub struct ScriptedBus {
    pub frames: VecDeque<CanFrame>,
    pub status: BusStatus,
    pub polls: usize,
    pub fail_reads: bool,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: u16, payload: &[u8]) {
        self.frames.push_back(CanFrame::new(id, payload));
    }
}

impl CanBus for ScriptedBus {
    fn poll_frame(&mut self) -> Result<Option<CanFrame>, BusError> {
        self.polls += 1;
        if self.fail_reads {
            return Err(BusError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "read failed",
            )));
        }
        Ok(self.frames.pop_front())
    }

    fn status(&mut self) -> BusStatus {
        self.status
    }
}

/// Records restart requests instead of restarting
#[derive(Debug, Clone, Default)]
pub struct RecordingRestarter {
    pub reasons: Rc<RefCell<Vec<RestartReason>>>,
}

impl RecordingRestarter {
    pub fn count(&self) -> usize {
        self.reasons.borrow().len()
    }
}

impl Restarter for RecordingRestarter {
    fn restart(&mut self, reason: &RestartReason) {
        self.reasons.borrow_mut().push(reason.clone());
    }
}

pub type TestGateway = Gateway<ScriptedBus, MockLink>;

/// Gateway over in-memory doubles, driven by a manual clock
pub fn gateway(clock: &ManualClock, restarter: &RecordingRestarter) -> TestGateway {
    Gateway::new(ScriptedBus::new(), MockLink::new(), Calibration::default())
        .with_clock(Box::new(clock.clone()))
        .with_scheduler(SchedulerConfig {
            handshake_settle_ms: 0,
            ..SchedulerConfig::default()
        })
        .with_restarter(Box::new(restarter.clone()))
}

/// Profile used across the integration tests
pub const JUKE_PROFILE: &str = r#"{
  "name": "Nissan Juke F15",
  "isMock": false,
  "frames": [
    { "canId": "0x002", "fields": [
      { "target": "STEERING", "startByte": 0, "byteCount": 2, "byteOrder": "BE", "dataType": "INT16" }
    ]},
    { "canId": "0x180", "fields": [
      { "target": "ENGINE_RPM", "startByte": 0, "byteCount": 2, "byteOrder": "BE",
        "dataType": "UINT16", "formula": "SCALE", "params": [1, 7, 0] }
    ]},
    { "canId": "0x551", "fields": [
      { "target": "TEMPERATURE", "startByte": 0, "byteCount": 1, "dataType": "UINT8",
        "formula": "SCALE", "params": [1, 1, -40] }
    ]},
    { "canId": "0x5C5", "fields": [
      { "target": "FUEL_LEVEL", "startByte": 0, "byteCount": 1, "dataType": "UINT8",
        "formula": "MAP_RANGE", "params": [0, 100, 0, 45] },
      { "target": "ODOMETER", "startByte": 1, "byteCount": 3, "byteOrder": "BE", "dataType": "UINT24" }
    ]},
    { "canId": "0x6F6", "fields": [
      { "target": "VOLTAGE", "startByte": 0, "byteCount": 1, "dataType": "UINT8" }
    ]},
    { "canId": "0x60D", "fields": [
      { "target": "DOOR_DRIVER", "startByte": 0, "byteCount": 1, "dataType": "BITMASK",
        "formula": "BITMASK_EXTRACT", "params": [1, 0] },
      { "target": "DOOR_PASSENGER", "startByte": 0, "byteCount": 1, "dataType": "BITMASK",
        "formula": "BITMASK_EXTRACT", "params": [2, 1] },
      { "target": "DOOR_BOOT", "startByte": 0, "byteCount": 1, "dataType": "BITMASK",
        "formula": "BITMASK_EXTRACT", "params": [16, 4] },
      { "target": "INDICATOR_LEFT", "startByte": 1, "byteCount": 1, "dataType": "BITMASK",
        "formula": "BITMASK_EXTRACT", "params": [32, 5] }
    ]}
  ]
}"#;
