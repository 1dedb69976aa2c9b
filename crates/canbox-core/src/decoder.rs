//! Decoding Engine
//!
//! Turns inbound CAN frames into vehicle state writes, driven entirely by the
//! active [`Profile`]. Identifiers the profile does not list are counted and
//! dropped.

use crate::calibration::Calibration;
use crate::codec::{apply_formula, extract_field};
use crate::profile::{FieldSpec, Formula, OutputField, Profile, PAYLOAD_LEN};
use crate::vehicle::VehicleState;

/// Profile-driven frame decoder
#[derive(Debug, Default)]
pub struct DecodingEngine {
    profile: Option<Profile>,
    frames_processed: u64,
    unknown_frames: u64,
}

impl DecodingEngine {
    /// Engine with no active profile; every frame counts as unknown
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `profile` the active profile
    ///
    /// Counters restart from zero. The caller is responsible for resetting
    /// the store before the next decode.
    pub fn activate(&mut self, profile: Profile) {
        tracing::info!(
            "Activating profile '{}' ({} frames{})",
            profile.name(),
            profile.frames().len(),
            if profile.is_simulated() { ", simulated" } else { "" }
        );
        self.profile = Some(profile);
        self.frames_processed = 0;
        self.unknown_frames = 0;
    }

    /// Currently active profile
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Frames that matched a profile entry
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Frames whose identifier the profile does not list
    pub fn unknown_frames(&self) -> u64 {
        self.unknown_frames
    }

    /// Decode one frame into `state`
    ///
    /// Returns `true` when the identifier is listed in the active profile.
    pub fn decode(
        &mut self,
        id: u16,
        payload: &[u8; PAYLOAD_LEN],
        state: &mut VehicleState,
        calibration: &Calibration,
        now_ms: u64,
    ) -> bool {
        let Some(frame) = self.profile.as_ref().and_then(|p| p.find_frame(id)) else {
            self.unknown_frames += 1;
            return false;
        };

        for field in &frame.fields {
            match decode_field(payload, field, calibration) {
                Some(value) => {
                    tracing::trace!("0x{:03X} {:?} = {}", id, field.target, value);
                    state.write(field.target, value, now_ms);
                }
                None => {
                    tracing::warn!(
                        "0x{:03X} {:?}: window {:?} outside payload, skipped",
                        id,
                        field.target,
                        field.window()
                    );
                }
            }
        }

        self.frames_processed += 1;
        true
    }
}

/// Extract, convert and calibrate one field; `None` if the window is invalid
fn decode_field(payload: &[u8], field: &FieldSpec, calibration: &Calibration) -> Option<i32> {
    let raw = extract_field(payload, field)?;
    let value = apply_formula(raw, &field.formula);
    Some(calibrate(field.target, &field.formula, value, calibration))
}

/// Calibration-dependent conversions for targets that need them
///
/// RPM and range frames carried through unconverted are divided by the
/// calibrated divisors. Fuel level never exceeds the tank.
fn calibrate(target: OutputField, formula: &Formula, value: i32, calibration: &Calibration) -> i32 {
    match (target, formula) {
        (OutputField::EngineRpm, Formula::None) => {
            value / i32::from(calibration.rpm_divisor.max(1))
        }
        (OutputField::Dte, Formula::None) => {
            let scaled = i64::from(value) * 100 / i64::from(calibration.dte_divisor_x100.max(1));
            scaled as i32
        }
        (OutputField::FuelLevel, _) => value.clamp(0, i32::from(calibration.tank_capacity_l)),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ElementType, Endianness, FrameSpec};

    fn field(target: OutputField, start: u8, width: u8, ty: ElementType, formula: Formula) -> FieldSpec {
        FieldSpec {
            target,
            start_byte: start,
            width_bytes: width,
            endianness: Endianness::Big,
            element_type: ty,
            formula,
        }
    }

    fn engine_with(frames: Vec<FrameSpec>) -> DecodingEngine {
        let mut engine = DecodingEngine::new();
        engine.activate(Profile::new("test", false, frames).unwrap());
        engine
    }

    #[test]
    fn test_unknown_frame_counted() {
        let mut engine = DecodingEngine::new();
        let mut state = VehicleState::new();
        assert!(!engine.decode(0x180, &[0; 8], &mut state, &Calibration::default(), 0));
        assert_eq!(engine.unknown_frames(), 1);
        assert_eq!(engine.frames_processed(), 0);
    }

    #[test]
    fn test_rpm_scaled() {
        let mut engine = engine_with(vec![FrameSpec {
            id: 0x180,
            fields: vec![field(
                OutputField::EngineRpm,
                0,
                2,
                ElementType::U16,
                Formula::Scale { mult: 1, div: 7, offset: 0 },
            )],
        }]);
        let mut state = VehicleState::new();
        // 17500 = 0x445C
        let payload = [0x44, 0x5C, 0, 0, 0, 0, 0, 0];
        assert!(engine.decode(0x180, &payload, &mut state, &Calibration::default(), 0));
        assert_eq!(state.engine_rpm(), 2500);
        assert_eq!(engine.frames_processed(), 1);
    }

    #[test]
    fn test_unconverted_rpm_uses_calibrated_divisor() {
        let mut engine = engine_with(vec![FrameSpec {
            id: 0x180,
            fields: vec![field(OutputField::EngineRpm, 0, 2, ElementType::U16, Formula::None)],
        }]);
        let mut state = VehicleState::new();
        let payload = [0x44, 0x5C, 0, 0, 0, 0, 0, 0];
        engine.decode(0x180, &payload, &mut state, &Calibration::default(), 0);
        assert_eq!(state.engine_rpm(), 2500);
    }

    #[test]
    fn test_unconverted_dte_uses_calibrated_divisor() {
        let mut engine = engine_with(vec![FrameSpec {
            id: 0x5C5,
            fields: vec![field(OutputField::Dte, 0, 2, ElementType::U16, Formula::None)],
        }]);
        let mut state = VehicleState::new();
        // 990 * 100 / 283 = 349
        let payload = [0x03, 0xDE, 0, 0, 0, 0, 0, 0];
        engine.decode(0x5C5, &payload, &mut state, &Calibration::default(), 0);
        assert_eq!(state.dte(), 349);
    }

    #[test]
    fn test_fuel_clamped_to_tank() {
        let mut engine = engine_with(vec![FrameSpec {
            id: 0x5C5,
            fields: vec![field(OutputField::FuelLevel, 0, 1, ElementType::U8, Formula::None)],
        }]);
        let mut state = VehicleState::new();
        engine.decode(0x5C5, &[200, 0, 0, 0, 0, 0, 0, 0], &mut state, &Calibration::default(), 0);
        assert_eq!(state.fuel_level(), 45);
    }

    #[test]
    fn test_indicator_stamped_with_tick() {
        let mut engine = engine_with(vec![FrameSpec {
            id: 0x60D,
            fields: vec![field(
                OutputField::IndicatorLeft,
                1,
                1,
                ElementType::Bitmask,
                Formula::BitmaskExtract { mask: 0x20, shift: 5 },
            )],
        }]);
        let mut state = VehicleState::new();
        engine.decode(0x60D, &[0, 0x20, 0, 0, 0, 0, 0, 0], &mut state, &Calibration::default(), 1234);
        assert_eq!(state.last_indicator_pulse(crate::vehicle::Side::Left), Some(1234));
    }

    #[test]
    fn test_reactivation_resets_counters() {
        let mut engine = engine_with(vec![FrameSpec { id: 0x180, fields: vec![] }]);
        let mut state = VehicleState::new();
        engine.decode(0x180, &[0; 8], &mut state, &Calibration::default(), 0);
        engine.decode(0x181, &[0; 8], &mut state, &Calibration::default(), 0);

        engine.activate(Profile::simulated());
        assert_eq!(engine.frames_processed(), 0);
        assert_eq!(engine.unknown_frames(), 0);
    }
}
