//! Bus Health Supervisor
//!
//! Watches the upstream transport every cycle and decides when the process
//! must restart: error counters past their limit, bus-off, a vanished
//! transport, or a bus that has gone silent while the vehicle still has
//! power. A restart is the only recovery action.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bus::{BusStatus, ControllerState};

/// Supervisor thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Receive error counter limit
    pub max_rx_errors: u32,
    /// Bus error counter limit
    pub max_bus_errors: u32,
    /// Longest tolerated gap between handled frames
    pub silence_timeout_ms: u64,
    /// Supply voltage above which silence means a fault rather than a parked car
    pub power_floor_volts: f32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_rx_errors: 100,
            max_bus_errors: 100,
            silence_timeout_ms: 30_000,
            power_floor_volts: 11.0,
        }
    }
}

/// Transport health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BusHealth {
    /// Counters low, controller error-active
    #[default]
    Healthy,
    /// Counters past half their limit, or controller in warning/passive
    Degraded,
    /// Restart required
    Offline,
}

/// Why a restart was requested
#[derive(Debug, Clone, PartialEq)]
pub enum RestartReason {
    /// An error counter exceeded its limit
    ErrorThreshold {
        /// Receive error counter at the time
        rx_errors: u32,
        /// Bus error counter at the time
        bus_errors: u32,
    },
    /// Controller entered bus-off
    BusOff,
    /// Transport disappeared
    Disconnected,
    /// No handled frame for too long while powered
    Silence {
        /// Time since the last handled frame
        silent_ms: u64,
        /// Supply voltage at the time
        voltage: f32,
    },
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::ErrorThreshold {
                rx_errors,
                bus_errors,
            } => write!(f, "CAN error limit exceeded (rx {rx_errors}, bus {bus_errors})"),
            RestartReason::BusOff => write!(f, "CAN controller is bus-off"),
            RestartReason::Disconnected => write!(f, "CAN transport disconnected"),
            RestartReason::Silence { silent_ms, voltage } => {
                write!(f, "CAN silent for {silent_ms} ms at {voltage:.1} V")
            }
        }
    }
}

/// Performs the restart; in production this never returns
pub trait Restarter {
    /// Restart the whole process
    fn restart(&mut self, reason: &RestartReason);
}

/// Per-cycle transport health check
#[derive(Debug)]
pub struct BusSupervisor {
    config: SupervisorConfig,
    health: BusHealth,
    last_status: BusStatus,
    last_frame_ms: u64,
    silence_watch: bool,
    restarts_requested: u64,
}

impl BusSupervisor {
    /// Supervisor whose silence timer starts at `now_ms`
    pub fn new(config: SupervisorConfig, now_ms: u64) -> Self {
        Self {
            config,
            health: BusHealth::Healthy,
            last_status: BusStatus::default(),
            last_frame_ms: now_ms,
            silence_watch: true,
            restarts_requested: 0,
        }
    }

    /// Thresholds in use
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Health as of the last check
    pub fn health(&self) -> BusHealth {
        self.health
    }

    /// Transport status as of the last check
    pub fn last_status(&self) -> BusStatus {
        self.last_status
    }

    /// Restarts requested so far
    pub fn restarts_requested(&self) -> u64 {
        self.restarts_requested
    }

    /// Tick of the last handled frame
    pub fn last_frame_ms(&self) -> u64 {
        self.last_frame_ms
    }

    /// Enable or disable the silence timeout
    ///
    /// Disabled while the store is fed by the synthetic generator. Enabling
    /// restarts the silence timer from `now_ms`.
    pub fn set_silence_watch(&mut self, enabled: bool, now_ms: u64) {
        if enabled && !self.silence_watch {
            self.last_frame_ms = now_ms;
        }
        self.silence_watch = enabled;
    }

    /// Record that a frame was handled at `now_ms`
    pub fn frame_received(&mut self, now_ms: u64) {
        self.last_frame_ms = now_ms;
    }

    fn classify(&self, status: &BusStatus) -> BusHealth {
        let half = |limit: u32| limit / 2;
        let warning = matches!(
            status.state,
            ControllerState::ErrorWarning | ControllerState::ErrorPassive
        );
        if warning
            || status.rx_errors > half(self.config.max_rx_errors)
            || status.bus_errors > half(self.config.max_bus_errors)
        {
            BusHealth::Degraded
        } else {
            BusHealth::Healthy
        }
    }

    fn set_health(&mut self, health: BusHealth) {
        if health != self.health {
            match health {
                BusHealth::Healthy => tracing::info!("CAN bus healthy again"),
                BusHealth::Degraded => tracing::warn!(
                    "CAN bus degraded: {:?}, rx errors {}, bus errors {}",
                    self.last_status.state,
                    self.last_status.rx_errors,
                    self.last_status.bus_errors
                ),
                BusHealth::Offline => tracing::warn!("CAN bus offline"),
            }
            self.health = health;
        }
    }

    /// Evaluate one cycle
    ///
    /// `voltage` is the current supply voltage from the store. Returns the
    /// reason when the process must restart.
    pub fn check(&mut self, status: BusStatus, voltage: f32, now_ms: u64) -> Option<RestartReason> {
        self.last_status = status;

        let reason = if status.rx_errors > self.config.max_rx_errors
            || status.bus_errors > self.config.max_bus_errors
        {
            Some(RestartReason::ErrorThreshold {
                rx_errors: status.rx_errors,
                bus_errors: status.bus_errors,
            })
        } else if status.state == ControllerState::BusOff {
            Some(RestartReason::BusOff)
        } else if status.state == ControllerState::Disconnected {
            Some(RestartReason::Disconnected)
        } else {
            let silent_ms = now_ms.saturating_sub(self.last_frame_ms);
            let powered = voltage > self.config.power_floor_volts;
            (self.silence_watch && powered && silent_ms > self.config.silence_timeout_ms)
                .then_some(RestartReason::Silence { silent_ms, voltage })
        };

        match reason {
            Some(reason) => {
                self.set_health(BusHealth::Offline);
                self.restarts_requested += 1;
                tracing::error!("Restart required: {}", reason);
                Some(reason)
            }
            None => {
                let health = self.classify(&status);
                self.set_health(health);
                None
            }
        }
    }
}
