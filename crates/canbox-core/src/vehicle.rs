//! Vehicle State Store
//!
//! The single shared record of current vehicle values. The decoding engine
//! (or the synthetic generator) writes through [`VehicleState::write`]; the
//! output encoder reads through the typed accessors. There is no history:
//! every write overwrites the previous value.
//!
//! Turn indicators are stored as the tick of their last bus pulse rather than
//! a boolean, since the bus reports blinker pulses and not a steady state.
//! Whether an indicator is active is decided at read time against the
//! caller's timeout.

use serde::Serialize;

use crate::profile::OutputField;

/// Door bit assignment inside [`VehicleState::doors`]
pub mod door_bits {
    /// Driver door
    pub const DRIVER: u8 = 0x80;
    /// Passenger door
    pub const PASSENGER: u8 = 0x40;
    /// Rear left door
    pub const REAR_LEFT: u8 = 0x20;
    /// Rear right door
    pub const REAR_RIGHT: u8 = 0x10;
    /// Boot/trunk
    pub const BOOT: u8 = 0x08;
}

/// Door mask bit for a door target, `None` for every other field
pub fn door_bit(field: OutputField) -> Option<u8> {
    match field {
        OutputField::DoorDriver => Some(door_bits::DRIVER),
        OutputField::DoorPassenger => Some(door_bits::PASSENGER),
        OutputField::DoorRearLeft => Some(door_bits::REAR_LEFT),
        OutputField::DoorRearRight => Some(door_bits::REAR_RIGHT),
        OutputField::DoorBoot => Some(door_bits::BOOT),
        _ => None,
    }
}

/// Which indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Left blinker
    Left,
    /// Right blinker
    Right,
}

/// Current vehicle values
///
/// Defaults are neutral: engine off, stationary, 0.0 V, all doors closed,
/// lights off and no indicator pulse ever seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleState {
    steering: i16,
    engine_rpm: u16,
    vehicle_speed: u16,
    fuel_level: u8,
    odometer: u32,
    voltage: f32,
    temperature: i8,
    dte: i16,
    fuel_cons_inst: u16,
    fuel_cons_avg: u16,
    doors: u8,
    left_indicator_at: Option<u64>,
    right_indicator_at: Option<u64>,
    headlights: bool,
    high_beam: bool,
    parking_lights: bool,
}

/// Narrow an `i32` into a smaller integer slot, saturating at its bounds
fn narrow<T>(value: i32) -> T
where
    T: TryFrom<i32> + Bounded,
{
    T::try_from(value).unwrap_or(if value < 0 { T::MIN } else { T::MAX })
}

/// Integer slot bounds used by [`narrow`]
trait Bounded {
    const MIN: Self;
    const MAX: Self;
}

macro_rules! bounded {
    ($($t:ty),*) => {
        $(impl Bounded for $t {
            const MIN: Self = <$t>::MIN;
            const MAX: Self = <$t>::MAX;
        })*
    };
}

bounded!(i8, u8, i16, u16, u32);

impl VehicleState {
    /// Store with every slot at its default
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore every slot to its default
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Write a converted value into the slot named by `field`
    ///
    /// Numeric slots saturate to their width. Voltage arrives in decivolts.
    /// Door targets set or clear their own bit of the door mask; indicator
    /// targets stamp `now_ms` when non-zero and ignore zero; light targets
    /// store `value != 0`.
    pub fn write(&mut self, field: OutputField, value: i32, now_ms: u64) {
        match field {
            OutputField::Steering => self.steering = narrow(value),
            OutputField::EngineRpm => self.engine_rpm = narrow(value),
            OutputField::VehicleSpeed => self.vehicle_speed = narrow(value),
            OutputField::FuelLevel => self.fuel_level = narrow(value),
            OutputField::Odometer => self.odometer = narrow(value),
            OutputField::Voltage => self.voltage = value as f32 * 0.1,
            OutputField::Temperature => self.temperature = narrow(value),
            OutputField::Dte => self.dte = narrow(value),
            OutputField::FuelConsInst => self.fuel_cons_inst = narrow(value),
            OutputField::FuelConsAvg => self.fuel_cons_avg = narrow(value),
            OutputField::DoorDriver
            | OutputField::DoorPassenger
            | OutputField::DoorRearLeft
            | OutputField::DoorRearRight
            | OutputField::DoorBoot => {
                let bit = door_bit(field).unwrap_or(0);
                if value != 0 {
                    self.doors |= bit;
                } else {
                    self.doors &= !bit;
                }
            }
            OutputField::IndicatorLeft => {
                if value != 0 {
                    self.left_indicator_at = Some(now_ms);
                }
            }
            OutputField::IndicatorRight => {
                if value != 0 {
                    self.right_indicator_at = Some(now_ms);
                }
            }
            OutputField::Headlights => self.headlights = value != 0,
            OutputField::HighBeam => self.high_beam = value != 0,
            OutputField::ParkingLights => self.parking_lights = value != 0,
        }
    }

    /// Steering angle (0.1° units)
    pub fn steering(&self) -> i16 {
        self.steering
    }

    /// Engine speed (RPM)
    pub fn engine_rpm(&self) -> u16 {
        self.engine_rpm
    }

    /// Vehicle speed (km/h)
    pub fn vehicle_speed(&self) -> u16 {
        self.vehicle_speed
    }

    /// Fuel level (liters)
    pub fn fuel_level(&self) -> u8 {
        self.fuel_level
    }

    /// Total mileage (km)
    pub fn odometer(&self) -> u32 {
        self.odometer
    }

    /// Battery voltage (volts)
    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    /// Temperature (°C)
    pub fn temperature(&self) -> i8 {
        self.temperature
    }

    /// Distance to empty (km)
    pub fn dte(&self) -> i16 {
        self.dte
    }

    /// Instantaneous consumption (0.1 L/100km)
    pub fn fuel_consumption_inst(&self) -> u16 {
        self.fuel_cons_inst
    }

    /// Average consumption (0.1 L/100km)
    pub fn fuel_consumption_avg(&self) -> u16 {
        self.fuel_cons_avg
    }

    /// Packed door mask, see [`door_bits`]
    pub fn doors(&self) -> u8 {
        self.doors
    }

    /// Whether a single door is open
    pub fn door_open(&self, door: OutputField) -> bool {
        door_bit(door).is_some_and(|bit| self.doors & bit != 0)
    }

    /// Tick of the last pulse seen for an indicator
    pub fn last_indicator_pulse(&self, side: Side) -> Option<u64> {
        match side {
            Side::Left => self.left_indicator_at,
            Side::Right => self.right_indicator_at,
        }
    }

    /// Indicator is active while `now - last_pulse < timeout`
    pub fn indicator_active(&self, side: Side, now_ms: u64, timeout_ms: u64) -> bool {
        self.last_indicator_pulse(side)
            .is_some_and(|at| now_ms.saturating_sub(at) < timeout_ms)
    }

    /// Low beam state
    pub fn headlights(&self) -> bool {
        self.headlights
    }

    /// High beam state
    pub fn high_beam(&self) -> bool {
        self.high_beam
    }

    /// Parking light state
    pub fn parking_lights(&self) -> bool {
        self.parking_lights
    }

    /// Point-in-time copy for logging and diagnostics
    pub fn snapshot(&self, now_ms: u64, indicator_timeout_ms: u64) -> VehicleSnapshot {
        VehicleSnapshot {
            steering: self.steering,
            engine_rpm: self.engine_rpm,
            vehicle_speed: self.vehicle_speed,
            fuel_level: self.fuel_level,
            odometer: self.odometer,
            voltage: self.voltage,
            temperature: self.temperature,
            dte: self.dte,
            fuel_cons_inst: self.fuel_cons_inst,
            fuel_cons_avg: self.fuel_cons_avg,
            doors: self.doors,
            indicator_left: self.indicator_active(Side::Left, now_ms, indicator_timeout_ms),
            indicator_right: self.indicator_active(Side::Right, now_ms, indicator_timeout_ms),
            headlights: self.headlights,
            high_beam: self.high_beam,
            parking_lights: self.parking_lights,
        }
    }
}

/// Serializable view of the store with indicators already resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct VehicleSnapshot {
    pub steering: i16,
    pub engine_rpm: u16,
    pub vehicle_speed: u16,
    pub fuel_level: u8,
    pub odometer: u32,
    pub voltage: f32,
    pub temperature: i8,
    pub dte: i16,
    pub fuel_cons_inst: u16,
    pub fuel_cons_avg: u16,
    pub doors: u8,
    pub indicator_left: bool,
    pub indicator_right: bool,
    pub headlights: bool,
    pub high_beam: bool,
    pub parking_lights: bool,
}
