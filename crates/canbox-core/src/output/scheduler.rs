//! Output scheduler
//!
//! One last-sent timestamp per channel, compared against the caller's clock.
//! A channel transmits when its interval has elapsed, or for doors and
//! lights as soon as the payload differs from the last one sent.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::messages::{build_message, Channel};
use crate::calibration::Calibration;
use crate::protocol::{DisplayLink, Handshake};
use crate::vehicle::VehicleState;

/// Per-channel transmit intervals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Steering angle interval
    pub steering_ms: u64,
    /// Lights/indicators interval
    pub lights_ms: u64,
    /// Doors interval
    pub doors_ms: u64,
    /// Dashboard (RPM) interval
    pub rpm_ms: u64,
    /// Speed interval
    pub speed_ms: u64,
    /// Instantaneous consumption interval
    pub consumption_inst_ms: u64,
    /// Average consumption interval
    pub consumption_avg_ms: u64,
    /// Temperature interval
    pub temperature_ms: u64,
    /// Range interval
    pub range_ms: u64,
    /// Odometer interval
    pub odometer_ms: u64,
    /// Handshake settle delay after a request header
    pub handshake_settle_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            steering_ms: 100,
            lights_ms: 250,
            doors_ms: 250,
            rpm_ms: 330,
            speed_ms: 500,
            consumption_inst_ms: 1000,
            consumption_avg_ms: 5000,
            temperature_ms: 5000,
            range_ms: 5000,
            odometer_ms: 10000,
            handshake_settle_ms: 5,
        }
    }
}

impl SchedulerConfig {
    /// Interval for a channel
    pub fn interval(&self, channel: Channel) -> u64 {
        match channel {
            Channel::Steering => self.steering_ms,
            Channel::Lights => self.lights_ms,
            Channel::Doors => self.doors_ms,
            Channel::Rpm => self.rpm_ms,
            Channel::Speed => self.speed_ms,
            Channel::ConsumptionInst => self.consumption_inst_ms,
            Channel::ConsumptionAvg => self.consumption_avg_ms,
            Channel::Temperature => self.temperature_ms,
            Channel::Range => self.range_ms,
            Channel::Odometer => self.odometer_ms,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ChannelTimer {
    last_sent_ms: Option<u64>,
    last_payload: Option<Vec<u8>>,
}

/// Time-multiplexes every channel onto one display link
#[derive(Debug)]
pub struct OutputScheduler {
    config: SchedulerConfig,
    timers: [ChannelTimer; Channel::ALL.len()],
    handshake: Handshake,
    frames_sent: u64,
    write_failures: u64,
}

impl Default for OutputScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl OutputScheduler {
    /// Scheduler with the given intervals; every channel is due on the first tick
    pub fn new(config: SchedulerConfig) -> Self {
        let handshake = Handshake::new(Duration::from_millis(config.handshake_settle_ms));
        Self {
            config,
            timers: Default::default(),
            handshake,
            frames_sent: 0,
            write_failures: 0,
        }
    }

    /// Active intervals
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Frames written successfully
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Writes that failed and will be retried
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    /// Handshake replies written
    pub fn handshake_replies(&self) -> u64 {
        self.handshake.replies_sent()
    }

    /// Forget every timer and last payload
    pub fn reset(&mut self) {
        self.timers = Default::default();
    }

    /// Whether `channel` would transmit `payload` at `now_ms`
    fn is_due(&self, channel: Channel, payload: &[u8], now_ms: u64) -> bool {
        let timer = &self.timers[channel.index()];
        let Some(last) = timer.last_sent_ms else {
            return true;
        };
        if now_ms.saturating_sub(last) >= self.config.interval(channel) {
            return true;
        }
        channel.sends_on_change() && timer.last_payload.as_deref() != Some(payload)
    }

    /// Run one output pass: handshake first, then every due channel
    ///
    /// Returns the number of frames written. Link errors are logged and
    /// swallowed; a channel whose write failed keeps its old timer and is
    /// tried again on the next tick.
    pub fn tick<L: DisplayLink + ?Sized>(
        &mut self,
        link: &mut L,
        state: &VehicleState,
        calibration: &Calibration,
        now_ms: u64,
    ) -> usize {
        if let Err(e) = self.handshake.poll(link) {
            tracing::debug!("Handshake poll failed: {}", e);
        }

        let mut sent = 0;
        for channel in Channel::ALL {
            let packet = build_message(channel, state, calibration, now_ms);
            if !self.is_due(channel, &packet.payload, now_ms) {
                continue;
            }

            let result = packet.to_bytes().and_then(|bytes| link.write_all(&bytes));
            match result {
                Ok(()) => {
                    let timer = &mut self.timers[channel.index()];
                    timer.last_sent_ms = Some(now_ms);
                    timer.last_payload = Some(packet.payload);
                    self.frames_sent += 1;
                    sent += 1;
                    tracing::trace!("Sent {:?} ({:#04x})", channel, packet.command);
                }
                Err(e) => {
                    self.write_failures += 1;
                    tracing::debug!("Write of {:?} failed, retrying next tick: {}", channel, e);
                }
            }
        }
        sent
    }
}
