//! Display protocol commands
//!
//! Command and sub-command bytes understood by the head unit. Everything
//! except steering travels as command 0x41 with the sub-command in the first
//! payload byte.

/// Steering wheel angle, signed 16-bit little-endian payload
pub const STEERING: u8 = 0x26;

/// Vehicle information; first payload byte selects the record
pub const VEHICLE_INFO: u8 = 0x41;

/// Reply to a version request
pub const VERSION_REPLY: u8 = 0xF1;

/// Reply to a status request
pub const STATUS_REPLY: u8 = 0x91;

/// Version request (primary form)
pub const VERSION_REQUEST: u8 = 0xC0;

/// Version request (alternate form used by some head units)
pub const VERSION_REQUEST_ALT: u8 = 0x08;

/// Status request
pub const STATUS_REQUEST: u8 = 0x90;

/// Sub-commands of [`VEHICLE_INFO`]
pub mod info {
    /// Door mask record (13 bytes)
    pub const DOORS: u8 = 0x01;
    /// Dashboard record: RPM, battery, temperature, status, fuel (13 bytes)
    pub const DASHBOARD: u8 = 0x02;
    /// Vehicle speed, km/h
    pub const SPEED: u8 = 0x03;
    /// Lights and indicators bitmask
    pub const LIGHTS: u8 = 0x04;
    /// Outside temperature, 0.1 °C
    pub const TEMPERATURE: u8 = 0x05;
    /// Distance to empty and fuel level
    pub const RANGE: u8 = 0x06;
    /// Instantaneous consumption, 0.1 L/100km
    pub const CONSUMPTION_INST: u8 = 0x07;
    /// Average consumption, 0.1 L/100km
    pub const CONSUMPTION_AVG: u8 = 0x08;
    /// Odometer, 24-bit km
    pub const ODOMETER: u8 = 0x09;
}

/// Length of the fixed-size door and dashboard records
pub const RECORD_LEN: usize = 13;

/// Door bits as the display expects them
pub mod door_bits {
    /// Front left (driver)
    pub const FRONT_LEFT: u8 = 0x01;
    /// Front right (passenger)
    pub const FRONT_RIGHT: u8 = 0x02;
    /// Rear left
    pub const REAR_LEFT: u8 = 0x04;
    /// Rear right
    pub const REAR_RIGHT: u8 = 0x08;
    /// Boot
    pub const BOOT: u8 = 0x10;
}

/// Light bits of the [`info::LIGHTS`] record
pub mod light_bits {
    /// Left indicator
    pub const LEFT_INDICATOR: u8 = 0x01;
    /// Right indicator
    pub const RIGHT_INDICATOR: u8 = 0x02;
    /// Low beam
    pub const HEADLIGHTS: u8 = 0x04;
    /// High beam
    pub const HIGH_BEAM: u8 = 0x08;
    /// Parking lights
    pub const PARKING: u8 = 0x10;
}

/// Engine running flag in the dashboard status byte
pub const STATUS_ENGINE_RUNNING: u8 = 0x04;
