//! Error types for profile loading

use thiserror::Error;

/// Errors that can occur while loading a vehicle profile
///
/// Every variant is raised before activation; a rejected document never
/// replaces the active profile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Malformed profile document: {0}")]
    ParseError(String),

    #[error("Missing required field '{field}' in {location}")]
    MissingField {
        location: String,
        field: &'static str,
    },

    #[error("Unknown {kind} '{value}' in {location}")]
    UnknownName {
        location: String,
        kind: &'static str,
        value: String,
    },

    #[error("Invalid CAN identifier '{0}': expected an 11-bit standard ID (0x000-0x7FF)")]
    InvalidIdentifier(String),

    #[error("Duplicate frame definition for CAN ID 0x{0:03X}")]
    DuplicateFrame(u16),

    #[error("Invalid value in {location}: {message}")]
    InvalidField { location: String, message: String },

    #[error("Profile '{0}' is not simulated but defines no frames")]
    EmptyProfile(String),
}

/// Describes a field position for error messages, e.g. `frame 0x180 field #2`
pub(crate) fn field_location(frame_id: u16, index: usize) -> String {
    format!("frame 0x{frame_id:03X} field #{index}")
}
