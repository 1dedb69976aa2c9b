mod common;

use canbox_core::profile::{self, ElementType, Endianness, Formula, OutputField, ValidationError};
use pretty_assertions::assert_eq;
use std::io::Write;

#[test]
fn test_load_reference_profile() {
    let profile = profile::load(common::JUKE_PROFILE).unwrap();

    assert_eq!(profile.name(), "Nissan Juke F15");
    assert!(!profile.is_simulated());
    assert_eq!(profile.frames().len(), 6);

    let rpm = profile.find_frame(0x180).unwrap();
    assert_eq!(rpm.fields.len(), 1);
    let field = &rpm.fields[0];
    assert_eq!(field.target, OutputField::EngineRpm);
    assert_eq!(field.window(), 0..2);
    assert_eq!(field.endianness, Endianness::Big);
    assert_eq!(field.element_type, ElementType::U16);
    assert_eq!(
        field.formula,
        Formula::Scale {
            mult: 1,
            div: 7,
            offset: 0
        }
    );

    let body = profile.find_frame(0x60D).unwrap();
    let targets: Vec<_> = body.fields.iter().map(|f| f.target).collect();
    assert_eq!(
        targets,
        vec![
            OutputField::DoorDriver,
            OutputField::DoorPassenger,
            OutputField::DoorBoot,
            OutputField::IndicatorLeft
        ]
    );

    assert!(profile.find_frame(0x123).is_none());
}

#[test]
fn test_load_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(common::JUKE_PROFILE.as_bytes()).unwrap();

    let profile = profile::load_file(file.path()).unwrap();
    assert_eq!(profile.name(), "Nissan Juke F15");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = profile::load_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ValidationError::IoError(_)));
}

#[test]
fn test_simulated_profile_without_frames() {
    let profile = profile::load(r#"{"name": "Bench", "isMock": true}"#).unwrap();
    assert!(profile.is_simulated());
    assert!(profile.frames().is_empty());
}

#[test]
fn test_live_profile_without_frames_rejected() {
    let err = profile::load(r#"{"name": "Empty", "isMock": false, "frames": []}"#).unwrap_err();
    assert_eq!(err, ValidationError::EmptyProfile("Empty".into()));
}

#[test]
fn test_malformed_json_rejected() {
    let err = profile::load(r#"{"name": "Broken", "frames": ["#).unwrap_err();
    assert!(matches!(err, ValidationError::ParseError(_)));
}

#[test]
fn test_identifier_above_standard_range_rejected() {
    let err = profile::load(
        r#"{"frames": [{"canId": "0x800", "fields": [
            {"target": "VOLTAGE", "startByte": 0, "byteCount": 1, "dataType": "UINT8"}
        ]}]}"#,
    )
    .unwrap_err();
    assert_eq!(err, ValidationError::InvalidIdentifier("0x800".into()));
}

#[test]
fn test_duplicate_identifier_rejected() {
    let err = profile::load(
        r#"{"frames": [
            {"canId": "0x6F6", "fields": [
                {"target": "VOLTAGE", "startByte": 0, "byteCount": 1, "dataType": "UINT8"}]},
            {"canId": 1782, "fields": [
                {"target": "TEMPERATURE", "startByte": 1, "byteCount": 1, "dataType": "UINT8"}]}
        ]}"#,
    )
    .unwrap_err();
    assert_eq!(err, ValidationError::DuplicateFrame(0x6F6));
}

#[test]
fn test_window_past_payload_rejected() {
    let err = profile::load(
        r#"{"frames": [{"canId": "0x180", "fields": [
            {"target": "ENGINE_RPM", "startByte": 7, "byteCount": 2, "byteOrder": "BE", "dataType": "UINT16"}
        ]}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidField { .. }), "{err:?}");
}

#[test]
fn test_width_type_mismatch_rejected() {
    let err = profile::load(
        r#"{"frames": [{"canId": "0x180", "fields": [
            {"target": "ENGINE_RPM", "startByte": 0, "byteCount": 1, "dataType": "UINT16"}
        ]}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidField { .. }), "{err:?}");
}

#[test]
fn test_unknown_names_rejected() {
    let err = profile::load(
        r#"{"frames": [{"canId": "0x180", "fields": [
            {"target": "BOOST", "startByte": 0, "byteCount": 1, "dataType": "UINT8"}
        ]}]}"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        ValidationError::UnknownName {
            location: "frame 0x180 field #0".into(),
            kind: "target",
            value: "BOOST".into(),
        }
    );

    let err = profile::load(
        r#"{"frames": [{"canId": "0x180", "fields": [
            {"target": "ENGINE_RPM", "startByte": 0, "byteCount": 2, "byteOrder": "MIDDLE", "dataType": "UINT16"}
        ]}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::UnknownName { kind: "byteOrder", .. }));
}

#[test]
fn test_multi_byte_field_needs_byte_order() {
    let err = profile::load(
        r#"{"frames": [{"canId": "0x180", "fields": [
            {"target": "ENGINE_RPM", "startByte": 0, "byteCount": 2, "dataType": "UINT16"}
        ]}]}"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingField {
            location: "frame 0x180 field #0".into(),
            field: "byteOrder",
        }
    );
}

#[test]
fn test_degenerate_map_range_rejected() {
    let err = profile::load(
        r#"{"frames": [{"canId": "0x5C5", "fields": [
            {"target": "FUEL_LEVEL", "startByte": 0, "byteCount": 1, "dataType": "UINT8",
             "formula": "MAP_RANGE", "params": [10, 10, 0, 45]}
        ]}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidField { .. }), "{err:?}");
}

#[test]
fn test_error_messages_name_the_location() {
    let err = profile::load(
        r#"{"frames": [{"canId": "0x2", "fields": [
            {"startByte": 0, "byteCount": 2, "byteOrder": "LE", "dataType": "INT16"}
        ]}]}"#,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required field 'target' in frame 0x002 field #0"
    );
}
