//! Vehicle calibration values
//!
//! Steering center/scale/direction, indicator timeout and the divisors the
//! decoder applies to raw RPM and range frames. Calibration is read-only input
//! for both the decoding engine and the output encoder; persisting changes is
//! the job of whatever console edits the file.
//!
//! The JSON file uses the short key names of the firmware configuration console:
//!
//! ```json
//! { "steerOffset": 100, "steerInvert": true, "steerScale": 4,
//!   "indTimeout": 500, "rpmDiv": 7, "tankCap": 45, "dteDiv": 283 }
//! ```

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading calibration
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed calibration file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("{name} = {value} is outside {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Calibration for one vehicle/display pairing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Added to the raw steering angle before scaling
    #[serde(rename = "steerOffset")]
    pub steer_offset: i16,
    /// Negate the steering angle after scaling
    #[serde(rename = "steerInvert")]
    pub steer_invert: bool,
    /// Steering multiplier in percent (100 = 1.0x)
    #[serde(rename = "steerScale")]
    pub steer_scale_percent: u8,
    /// How long an indicator stays "on" after its last bus pulse
    #[serde(rename = "indTimeout")]
    pub indicator_timeout_ms: u16,
    /// Raw RPM divisor for profiles that pass RPM through unconverted
    #[serde(rename = "rpmDiv")]
    pub rpm_divisor: u8,
    /// Fuel tank size; fuel level never exceeds it
    #[serde(rename = "tankCap")]
    pub tank_capacity_l: u8,
    /// Range divisor times 100 (283 = 2.83)
    #[serde(rename = "dteDiv")]
    pub dte_divisor_x100: u16,
}

/// Accepted ranges, matching what the configuration console allows
const STEER_OFFSET_RANGE: RangeInclusive<i64> = -500..=500;
const STEER_SCALE_RANGE: RangeInclusive<i64> = 1..=200;
const INDICATOR_TIMEOUT_RANGE: RangeInclusive<i64> = 100..=2000;
const RPM_DIVISOR_RANGE: RangeInclusive<i64> = 1..=20;
const TANK_CAPACITY_RANGE: RangeInclusive<i64> = 20..=100;
const DTE_DIVISOR_RANGE: RangeInclusive<i64> = 100..=500;

impl Default for Calibration {
    fn default() -> Self {
        Self {
            steer_offset: 100,
            steer_invert: true,
            steer_scale_percent: 4,
            indicator_timeout_ms: 500,
            rpm_divisor: 7,
            tank_capacity_l: 45,
            dte_divisor_x100: 283,
        }
    }
}

impl Calibration {
    /// Parse calibration JSON; missing keys keep their defaults
    pub fn from_json(text: &str) -> Result<Self, CalibrationError> {
        let calibration: Calibration = serde_json::from_str(text)?;
        calibration.validate()?;
        Ok(calibration)
    }

    /// Read calibration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check every value against its accepted range
    pub fn validate(&self) -> Result<(), CalibrationError> {
        check("steerOffset", self.steer_offset.into(), STEER_OFFSET_RANGE)?;
        check("steerScale", self.steer_scale_percent.into(), STEER_SCALE_RANGE)?;
        check("indTimeout", self.indicator_timeout_ms.into(), INDICATOR_TIMEOUT_RANGE)?;
        check("rpmDiv", self.rpm_divisor.into(), RPM_DIVISOR_RANGE)?;
        check("tankCap", self.tank_capacity_l.into(), TANK_CAPACITY_RANGE)?;
        check("dteDiv", self.dte_divisor_x100.into(), DTE_DIVISOR_RANGE)?;
        Ok(())
    }

    /// Indicator timeout as a tick delta
    pub fn indicator_timeout(&self) -> u64 {
        u64::from(self.indicator_timeout_ms)
    }
}

fn check(name: &'static str, value: i64, range: RangeInclusive<i64>) -> Result<(), CalibrationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(CalibrationError::OutOfRange {
            name,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
