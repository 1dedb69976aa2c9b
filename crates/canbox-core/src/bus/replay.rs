//! Capture replay
//!
//! Replays text captures of the form
//!
//! ```text
//! RX ID: 0x182 | DLC: 8 | Data: 00 00 00 00 00 35 00 CE
//! ```
//!
//! one frame per poll, optionally paced and looped. Lines that are not frame
//! records (headers, blank lines, comments) are skipped.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use super::{BusError, BusStatus, CanBus, CanFrame, MAX_DLC};
use crate::profile::MAX_STANDARD_ID;

fn capture_line_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^RX ID:\s*0x([0-9A-Fa-f]+)\s*\|\s*DLC:\s*(\d+)\s*\|\s*Data:\s*(.*)$").ok()
    })
    .as_ref()
}

/// Parse one capture line
///
/// `Ok(None)` for lines that are not frame records. When the data bytes
/// disagree with the DLC, the shorter of the two wins.
pub fn parse_capture_line(line: &str, line_no: usize) -> Result<Option<CanFrame>, BusError> {
    let Some(caps) = capture_line_re().and_then(|re| re.captures(line.trim())) else {
        return Ok(None);
    };
    let malformed = || BusError::MalformedCapture {
        line: line_no,
        content: line.trim().to_string(),
    };

    let id = u16::from_str_radix(&caps[1], 16)
        .ok()
        .filter(|id| *id <= MAX_STANDARD_ID)
        .ok_or_else(malformed)?;
    let dlc: usize = caps[2].parse().map_err(|_| malformed())?;
    if dlc > MAX_DLC {
        return Err(malformed());
    }

    let data = caps[3]
        .split_whitespace()
        .take(dlc)
        .map(|b| u8::from_str_radix(b, 16))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| malformed())?;

    Ok(Some(CanFrame::new(id, &data)))
}

/// Bus that replays a recorded capture
#[derive(Debug)]
pub struct ReplayBus {
    frames: Vec<CanFrame>,
    cursor: usize,
    interval: Duration,
    last_emit: Option<Instant>,
    looping: bool,
}

impl ReplayBus {
    /// Replay an already parsed frame list
    pub fn new(frames: Vec<CanFrame>) -> Self {
        Self {
            frames,
            cursor: 0,
            interval: Duration::ZERO,
            last_emit: None,
            looping: false,
        }
    }

    /// Parse a capture from text
    pub fn parse(text: &str) -> Result<Self, BusError> {
        let mut frames = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if let Some(frame) = parse_capture_line(line, index + 1)? {
                frames.push(frame);
            }
        }
        Ok(Self::new(frames))
    }

    /// Read and parse a capture file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BusError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let bus = Self::parse(&text)?;
        tracing::info!("Loaded {} frames from {}", bus.frames.len(), path.display());
        Ok(bus)
    }

    /// Minimum spacing between two replayed frames
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start over from the first frame once the capture is exhausted
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Keep only frames whose identifier is in `ids`
    pub fn with_filter(mut self, ids: &HashSet<u16>) -> Self {
        self.frames.retain(|f| ids.contains(&f.id));
        self.cursor = self.cursor.min(self.frames.len());
        self
    }

    /// Frames in the capture
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when the capture holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames not yet replayed in the current pass
    pub fn remaining(&self) -> usize {
        self.frames.len() - self.cursor
    }
}

impl CanBus for ReplayBus {
    fn poll_frame(&mut self) -> Result<Option<CanFrame>, BusError> {
        if self.cursor >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Ok(None);
            }
            tracing::debug!("Capture exhausted, looping");
            self.cursor = 0;
        }

        if let Some(last) = self.last_emit {
            if last.elapsed() < self.interval {
                return Ok(None);
            }
        }

        let frame = self.frames[self.cursor];
        self.cursor += 1;
        self.last_emit = Some(Instant::now());
        Ok(Some(frame))
    }

    fn status(&mut self) -> BusStatus {
        BusStatus::default()
    }
}
