//! Gateway run loop
//!
//! Owns every piece of the pipeline and runs one cooperative cycle at a time:
//! supervisor check, one non-blocking bus read, decode, scheduled output,
//! periodic status log. Single-threaded; the store has one writer and one
//! reader per cycle, so nothing is locked.

use crate::bus::CanBus;
use crate::calibration::Calibration;
use crate::clock::{Clock, MonotonicClock};
use crate::decoder::DecodingEngine;
use crate::diagnostics::Diagnostics;
use crate::output::{OutputScheduler, SchedulerConfig};
use crate::profile::{self, Profile, ValidationError};
use crate::protocol::DisplayLink;
use crate::supervisor::{BusSupervisor, RestartReason, Restarter, SupervisorConfig};
use crate::vehicle::VehicleState;

/// Interval of the periodic status log
const STATUS_LOG_INTERVAL_MS: u64 = 1000;

/// Result of one [`Gateway::run_cycle`]
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The supervisor requested a restart; no frame was read this cycle
    Restart(RestartReason),
    /// Normal cycle
    Completed {
        /// `None` when no frame was waiting, otherwise whether the profile
        /// knew its identifier
        handled: Option<bool>,
        /// Display frames written
        sent: usize,
    },
}

/// The CAN-to-display pipeline
pub struct Gateway<B: CanBus, L: DisplayLink> {
    bus: B,
    link: L,
    clock: Box<dyn Clock>,
    restarter: Option<Box<dyn Restarter>>,
    calibration: Calibration,
    state: VehicleState,
    decoder: DecodingEngine,
    scheduler: OutputScheduler,
    supervisor: BusSupervisor,
    bus_read_errors: u64,
    last_status_log_ms: Option<u64>,
}

impl<B: CanBus, L: DisplayLink> Gateway<B, L> {
    /// Gateway with default intervals and thresholds and a monotonic clock
    ///
    /// No profile is active until [`activate`](Self::activate); until then
    /// the gateway counts as simulated.
    pub fn new(bus: B, link: L, calibration: Calibration) -> Self {
        let clock: Box<dyn Clock> = Box::new(MonotonicClock::new());
        let mut supervisor = BusSupervisor::new(SupervisorConfig::default(), clock.now_ms());
        supervisor.set_silence_watch(false, clock.now_ms());
        Self {
            bus,
            link,
            clock,
            restarter: None,
            calibration,
            state: VehicleState::new(),
            decoder: DecodingEngine::new(),
            scheduler: OutputScheduler::default(),
            supervisor,
            bus_read_errors: 0,
            last_status_log_ms: None,
        }
    }

    /// Replace the clock; the silence timer restarts from its current tick
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self.supervisor = self.fresh_supervisor(*self.supervisor.config());
        self
    }

    /// Action taken when the supervisor requests a restart
    pub fn with_restarter(mut self, restarter: Box<dyn Restarter>) -> Self {
        self.restarter = Some(restarter);
        self
    }

    /// Replace the channel intervals
    pub fn with_scheduler(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = OutputScheduler::new(config);
        self
    }

    /// Replace the supervisor thresholds
    pub fn with_supervisor(mut self, config: SupervisorConfig) -> Self {
        self.supervisor = self.fresh_supervisor(config);
        self
    }

    fn fresh_supervisor(&self, config: SupervisorConfig) -> BusSupervisor {
        let now = self.clock.now_ms();
        let mut supervisor = BusSupervisor::new(config, now);
        supervisor.set_silence_watch(!self.is_simulated(), now);
        supervisor
    }

    /// Make `profile` active
    ///
    /// Every store slot is reset before the next decode, channel timers are
    /// cleared so the display gets fresh values, and the silence watch
    /// follows the profile mode.
    pub fn activate(&mut self, profile: Profile) {
        let now = self.clock.now_ms();
        let simulated = profile.is_simulated();
        self.state.reset();
        self.scheduler.reset();
        self.decoder.activate(profile);
        self.supervisor.set_silence_watch(!simulated, now);
    }

    /// Load and activate a profile document
    ///
    /// On a validation error the previous profile stays active.
    pub fn reload(&mut self, document: &str) -> Result<(), ValidationError> {
        match profile::load(document) {
            Ok(profile) => {
                self.activate(profile);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Rejected profile document, keeping current profile: {}", e);
                Err(e)
            }
        }
    }

    /// True when no profile is active or the active profile is simulated
    pub fn is_simulated(&self) -> bool {
        self.decoder.profile().map_or(true, Profile::is_simulated)
    }

    /// Current tick of the gateway clock
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Vehicle state
    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Vehicle state write access, for the synthetic generator
    pub fn state_mut(&mut self) -> &mut VehicleState {
        &mut self.state
    }

    /// Calibration in use
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Swap calibration; takes effect on the next cycle
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    /// Decoding engine
    pub fn decoder(&self) -> &DecodingEngine {
        &self.decoder
    }

    /// Output scheduler
    pub fn scheduler(&self) -> &OutputScheduler {
        &self.scheduler
    }

    /// Bus supervisor
    pub fn supervisor(&self) -> &BusSupervisor {
        &self.supervisor
    }

    /// Upstream bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Display link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Display link, mutable
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Current diagnostic counters
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            profile: self.decoder.profile().map(|p| p.name().to_string()),
            simulated: self.is_simulated(),
            frames_processed: self.decoder.frames_processed(),
            unknown_frames: self.decoder.unknown_frames(),
            bus_read_errors: self.bus_read_errors,
            bus: self.supervisor.last_status(),
            health: self.supervisor.health(),
            frames_sent: self.scheduler.frames_sent(),
            write_failures: self.scheduler.write_failures(),
            handshake_replies: self.scheduler.handshake_replies(),
            silent_ms: self
                .clock
                .now_ms()
                .saturating_sub(self.supervisor.last_frame_ms()),
        }
    }

    /// Run one cycle of the loop
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let now = self.clock.now_ms();

        let status = self.bus.status();
        if let Some(reason) = self.supervisor.check(status, self.state.voltage(), now) {
            if let Some(restarter) = self.restarter.as_mut() {
                restarter.restart(&reason);
            }
            return CycleOutcome::Restart(reason);
        }

        let handled = match self.bus.poll_frame() {
            Ok(Some(frame)) => {
                let handled = self.decoder.decode(
                    frame.id,
                    &frame.data,
                    &mut self.state,
                    &self.calibration,
                    now,
                );
                if handled {
                    self.supervisor.frame_received(now);
                }
                Some(handled)
            }
            Ok(None) => None,
            Err(e) => {
                self.bus_read_errors += 1;
                tracing::warn!("CAN read failed: {}", e);
                None
            }
        };

        let sent = self
            .scheduler
            .tick(&mut self.link, &self.state, &self.calibration, now);

        self.log_status(now);
        CycleOutcome::Completed { handled, sent }
    }

    fn log_status(&mut self, now: u64) {
        let due = self
            .last_status_log_ms
            .map_or(true, |last| now.saturating_sub(last) >= STATUS_LOG_INTERVAL_MS);
        if !due {
            return;
        }
        self.last_status_log_ms = Some(now);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let snapshot = self
                .state
                .snapshot(now, self.calibration.indicator_timeout());
            tracing::debug!("Status: {}", self.diagnostics().summary());
            tracing::debug!(
                "Vehicle: rpm={} speed={} volt={:.1} temp={} fuel={} steer={} doors={:#04x}",
                snapshot.engine_rpm,
                snapshot.vehicle_speed,
                snapshot.voltage,
                snapshot.temperature,
                snapshot.fuel_level,
                snapshot.steering,
                snapshot.doors
            );
        }
    }
}
