//! Outbound message encoding
//!
//! Builds one display packet per channel from the vehicle state. Encoding
//! never fails: values the store has never seen encode as zero.

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::protocol::commands::{self, door_bits, info, light_bits, RECORD_LEN};
use crate::protocol::{Packet, PacketBuilder};
use crate::vehicle::{self, Side, VehicleState};

/// Outbound message types, each with its own timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Steering angle for camera guidelines
    Steering,
    /// Indicators and exterior lights
    Lights,
    /// Door mask
    Doors,
    /// Dashboard record (RPM, battery, temperature, fuel)
    Rpm,
    /// Vehicle speed
    Speed,
    /// Instantaneous fuel consumption
    ConsumptionInst,
    /// Average fuel consumption
    ConsumptionAvg,
    /// Outside temperature
    Temperature,
    /// Distance to empty
    Range,
    /// Total mileage
    Odometer,
}

impl Channel {
    /// Every channel, in transmit order within a tick
    pub const ALL: [Channel; 10] = [
        Channel::Steering,
        Channel::Lights,
        Channel::Doors,
        Channel::Rpm,
        Channel::Speed,
        Channel::ConsumptionInst,
        Channel::ConsumptionAvg,
        Channel::Temperature,
        Channel::Range,
        Channel::Odometer,
    ];

    /// Position in [`Channel::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Channels that also transmit as soon as their payload changes
    pub fn sends_on_change(self) -> bool {
        matches!(self, Channel::Doors | Channel::Lights)
    }
}

/// Apply steering calibration to a raw angle
///
/// `(raw + offset) * scale / 100`, truncating, then negated when inverted.
/// Clamped to the 16-bit wire range.
pub fn calibrated_steering(raw: i16, calibration: &Calibration) -> i16 {
    let centered = i32::from(raw) + i32::from(calibration.steer_offset);
    let scaled = centered * i32::from(calibration.steer_scale_percent) / 100;
    let angle = if calibration.steer_invert { -scaled } else { scaled };
    angle.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Translate the store's door mask into the display's door bits
pub fn display_door_bits(doors: u8) -> u8 {
    const MAP: [(u8, u8); 5] = [
        (vehicle::door_bits::DRIVER, door_bits::FRONT_LEFT),
        (vehicle::door_bits::PASSENGER, door_bits::FRONT_RIGHT),
        (vehicle::door_bits::REAR_LEFT, door_bits::REAR_LEFT),
        (vehicle::door_bits::REAR_RIGHT, door_bits::REAR_RIGHT),
        (vehicle::door_bits::BOOT, door_bits::BOOT),
    ];
    MAP.iter()
        .filter(|(store, _)| doors & store != 0)
        .fold(0, |acc, (_, display)| acc | display)
}

/// Lights record bitmask at `now_ms`
pub fn lights_mask(state: &VehicleState, now_ms: u64, indicator_timeout_ms: u64) -> u8 {
    let mut bits = 0;
    if state.indicator_active(Side::Left, now_ms, indicator_timeout_ms) {
        bits |= light_bits::LEFT_INDICATOR;
    }
    if state.indicator_active(Side::Right, now_ms, indicator_timeout_ms) {
        bits |= light_bits::RIGHT_INDICATOR;
    }
    if state.headlights() {
        bits |= light_bits::HEADLIGHTS;
    }
    if state.high_beam() {
        bits |= light_bits::HIGH_BEAM;
    }
    if state.parking_lights() {
        bits |= light_bits::PARKING;
    }
    bits
}

fn scaled_u16(value: f32, factor: f32) -> u16 {
    (value * factor).round().clamp(0.0, f32::from(u16::MAX)) as u16
}

/// Build the packet a channel would transmit right now
pub fn build_message(
    channel: Channel,
    state: &VehicleState,
    calibration: &Calibration,
    now_ms: u64,
) -> Packet {
    let vehicle_info = || PacketBuilder::new(commands::VEHICLE_INFO);

    match channel {
        Channel::Steering => PacketBuilder::new(commands::STEERING)
            .i16_le(calibrated_steering(state.steering(), calibration))
            .build(),

        Channel::Lights => vehicle_info()
            .byte(info::LIGHTS)
            .byte(lights_mask(state, now_ms, calibration.indicator_timeout()))
            .build(),

        Channel::Doors => vehicle_info()
            .byte(info::DOORS)
            .byte(display_door_bits(state.doors()))
            .zeros(RECORD_LEN - 2)
            .build(),

        Channel::Rpm => {
            let status = if state.engine_rpm() > 0 {
                commands::STATUS_ENGINE_RUNNING
            } else {
                0
            };
            let temperature = i16::from(state.temperature()) * 10;
            vehicle_info()
                .byte(info::DASHBOARD)
                .u16_be(state.engine_rpm())
                .zeros(2)
                .u16_be(scaled_u16(state.voltage(), 100.0))
                .u16_be(temperature as u16)
                .zeros(2)
                .byte(status)
                .byte(state.fuel_level())
                .build()
        }

        Channel::Speed => vehicle_info()
            .byte(info::SPEED)
            .u16_be(state.vehicle_speed())
            .build(),

        Channel::ConsumptionInst => vehicle_info()
            .byte(info::CONSUMPTION_INST)
            .u16_be(state.fuel_consumption_inst())
            .build(),

        Channel::ConsumptionAvg => vehicle_info()
            .byte(info::CONSUMPTION_AVG)
            .u16_be(state.fuel_consumption_avg())
            .build(),

        Channel::Temperature => vehicle_info()
            .byte(info::TEMPERATURE)
            .u16_be((i16::from(state.temperature()) * 10) as u16)
            .build(),

        Channel::Range => vehicle_info()
            .byte(info::RANGE)
            .u16_be(state.dte().max(0) as u16)
            .byte(state.fuel_level())
            .build(),

        Channel::Odometer => vehicle_info()
            .byte(info::ODOMETER)
            .u24_be(state.odometer())
            .build(),
    }
}
