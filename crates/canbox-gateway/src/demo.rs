//! Synthetic vehicle data
//!
//! Feeds the vehicle state when no live profile is active, so the display
//! can be tested on the bench. Values bounce between realistic bounds, the
//! left indicator blinks, and now and then a random door opens and closes.

use canbox_core::profile::OutputField;
use canbox_core::vehicle::VehicleState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bounds and per-update step for one field; a zero step keeps it static
#[derive(Debug, Clone, Copy)]
struct FieldBounds {
    field: OutputField,
    min: i32,
    max: i32,
    start: i32,
    step: i32,
}

const fn bounds(field: OutputField, min: i32, max: i32, start: i32, step: i32) -> FieldBounds {
    FieldBounds {
        field,
        min,
        max,
        start,
        step,
    }
}

const BOUNDS: [FieldBounds; 10] = [
    bounds(OutputField::Steering, -5400, 5400, 0, 100),
    bounds(OutputField::EngineRpm, 800, 6000, 2500, 50),
    bounds(OutputField::VehicleSpeed, 0, 120, 60, 2),
    bounds(OutputField::Voltage, 125, 145, 140, 1),
    bounds(OutputField::Temperature, 70, 95, 85, 1),
    bounds(OutputField::FuelConsInst, 30, 120, 65, 3),
    bounds(OutputField::Odometer, 85000, 85100, 85050, 1),
    bounds(OutputField::FuelLevel, 10, 45, 30, 0),
    bounds(OutputField::Dte, 200, 400, 350, 0),
    bounds(OutputField::FuelConsAvg, 55, 75, 65, 0),
];

const DOORS: [OutputField; 5] = [
    OutputField::DoorDriver,
    OutputField::DoorPassenger,
    OutputField::DoorRearLeft,
    OutputField::DoorRearRight,
    OutputField::DoorBoot,
];

/// Default update cadence
pub const UPDATE_INTERVAL_MS: u64 = 50;

/// Blink half-period of the simulated indicator
const INDICATOR_TOGGLE_MS: u64 = 500;

/// How long a randomly opened door stays open
const DOOR_OPEN_MS: u64 = 3000;

/// Chance per update that a closed car opens a door
const DOOR_EVENT_PROBABILITY: f64 = 0.002;

/// Bouncing-value generator writing through the store's write path
pub struct SyntheticGenerator {
    values: [i32; BOUNDS.len()],
    directions: [i32; BOUNDS.len()],
    interval_ms: u64,
    last_update_ms: Option<u64>,
    indicator_on: bool,
    last_toggle_ms: u64,
    open_door: Option<(OutputField, u64)>,
    rng: StdRng,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticGenerator {
    /// Generator starting from typical values
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator for tests
    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            values: BOUNDS.map(|b| b.start),
            directions: [1; BOUNDS.len()],
            interval_ms: UPDATE_INTERVAL_MS,
            last_update_ms: None,
            indicator_on: false,
            last_toggle_ms: 0,
            open_door: None,
            rng,
        }
    }

    /// Change the update cadence
    #[cfg(test)]
    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Step the simulation and write into `state` if an update is due
    ///
    /// Returns `true` when the store was written.
    pub fn update(&mut self, state: &mut VehicleState, now_ms: u64) -> bool {
        match self.last_update_ms {
            Some(last) if now_ms.saturating_sub(last) < self.interval_ms => return false,
            None => {
                self.last_toggle_ms = now_ms;
                state.write(OutputField::Headlights, 1, now_ms);
            }
            Some(_) => self.step(),
        }
        self.last_update_ms = Some(now_ms);

        if now_ms.saturating_sub(self.last_toggle_ms) > INDICATOR_TOGGLE_MS {
            self.last_toggle_ms = now_ms;
            self.indicator_on = !self.indicator_on;
        }

        self.update_doors(state, now_ms);

        for (b, value) in BOUNDS.iter().zip(self.values) {
            state.write(b.field, value, now_ms);
        }
        state.write(OutputField::IndicatorLeft, i32::from(self.indicator_on), now_ms);
        true
    }

    fn step(&mut self) {
        for (i, b) in BOUNDS.iter().enumerate() {
            if b.step == 0 {
                continue;
            }
            let value = self.values[i] + b.step * self.directions[i];
            if value >= b.max {
                self.values[i] = b.max;
                self.directions[i] = -1;
            } else if value <= b.min {
                self.values[i] = b.min;
                self.directions[i] = 1;
            } else {
                self.values[i] = value;
            }
        }
    }

    fn update_doors(&mut self, state: &mut VehicleState, now_ms: u64) {
        match self.open_door {
            Some((door, opened_at)) if now_ms.saturating_sub(opened_at) >= DOOR_OPEN_MS => {
                state.write(door, 0, now_ms);
                self.open_door = None;
            }
            Some(_) => {}
            None => {
                if self.rng.gen_bool(DOOR_EVENT_PROBABILITY) {
                    let door = DOORS[self.rng.gen_range(0..DOORS.len())];
                    tracing::debug!("Synthetic: opening {:?}", door);
                    state.write(door, 1, now_ms);
                    self.open_door = Some((door, now_ms));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canbox_core::vehicle::Side;

    #[test]
    fn test_first_update_writes_typical_values() {
        let mut generator = SyntheticGenerator::seeded(1);
        let mut state = VehicleState::new();
        assert!(generator.update(&mut state, 0));
        assert_eq!(state.engine_rpm(), 2500);
        assert_eq!(state.fuel_level(), 30);
        assert_eq!(state.dte(), 350);
        assert!((state.voltage() - 14.0).abs() < 1e-3);
        assert!(state.headlights());
    }

    #[test]
    fn test_update_respects_cadence() {
        let mut generator = SyntheticGenerator::seeded(1);
        let mut state = VehicleState::new();
        generator.update(&mut state, 1_000);
        assert!(!generator.update(&mut state, 1_049));
        assert!(generator.update(&mut state, 1_050));
        assert_eq!(state.engine_rpm(), 2550);
        assert_eq!(state.fuel_level(), 30);
    }

    #[test]
    fn test_values_stay_in_bounds() {
        let mut generator = SyntheticGenerator::seeded(7).with_interval(0);
        let mut state = VehicleState::new();
        for tick in 0..2_000 {
            generator.update(&mut state, tick * 10);
            assert!((-5400..=5400).contains(&state.steering()));
            assert!((800..=6000).contains(&state.engine_rpm()));
            assert!(state.vehicle_speed() <= 120);
            assert!((85000..=85100).contains(&state.odometer()));
        }
    }

    #[test]
    fn test_indicator_blinks() {
        let mut generator = SyntheticGenerator::seeded(3);
        let mut state = VehicleState::new();
        generator.update(&mut state, 0);
        assert_eq!(state.last_indicator_pulse(Side::Left), None);

        let mut now = 0;
        while now <= 600 {
            now += UPDATE_INTERVAL_MS;
            generator.update(&mut state, now);
        }
        assert!(state.indicator_active(Side::Left, now, 500));
    }
}
