//! Profile data structures
//!
//! A [`Profile`] lists the CAN identifiers a vehicle broadcasts that the
//! gateway cares about, and for each one the fields to pull out of the 8-byte
//! payload. Profiles can only be built through validation, so every
//! [`FieldSpec`] reachable from a profile is guaranteed to stay inside the
//! payload.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::error::{field_location, ValidationError};

/// Highest 11-bit standard CAN identifier
pub const MAX_STANDARD_ID: u16 = 0x7FF;

/// Classic CAN payload length
pub const PAYLOAD_LEN: usize = 8;

/// Every quantity the vehicle state store exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputField {
    /// Steering wheel angle (0.1° units, signed)
    Steering,
    /// Engine speed (RPM)
    EngineRpm,
    /// Vehicle speed (km/h)
    VehicleSpeed,
    /// Fuel level (liters)
    FuelLevel,
    /// Total mileage (km)
    Odometer,
    /// Battery voltage (decivolts on input)
    Voltage,
    /// External/coolant temperature (°C)
    Temperature,
    /// Distance to empty (km)
    Dte,
    /// Instantaneous fuel consumption (0.1 L/100km)
    FuelConsInst,
    /// Average fuel consumption (0.1 L/100km)
    FuelConsAvg,
    /// Driver door open
    DoorDriver,
    /// Passenger door open
    DoorPassenger,
    /// Rear left door open
    DoorRearLeft,
    /// Rear right door open
    DoorRearRight,
    /// Boot/trunk open
    DoorBoot,
    /// Left turn indicator pulse
    IndicatorLeft,
    /// Right turn indicator pulse
    IndicatorRight,
    /// Low beam headlights on
    Headlights,
    /// High beam on
    HighBeam,
    /// Parking/position lights on
    ParkingLights,
}

impl OutputField {
    /// All fields, in declaration order
    pub const ALL: [OutputField; 20] = [
        OutputField::Steering,
        OutputField::EngineRpm,
        OutputField::VehicleSpeed,
        OutputField::FuelLevel,
        OutputField::Odometer,
        OutputField::Voltage,
        OutputField::Temperature,
        OutputField::Dte,
        OutputField::FuelConsInst,
        OutputField::FuelConsAvg,
        OutputField::DoorDriver,
        OutputField::DoorPassenger,
        OutputField::DoorRearLeft,
        OutputField::DoorRearRight,
        OutputField::DoorBoot,
        OutputField::IndicatorLeft,
        OutputField::IndicatorRight,
        OutputField::Headlights,
        OutputField::HighBeam,
        OutputField::ParkingLights,
    ];

    /// Parse a target name as written in profile documents (e.g. `ENGINE_RPM`)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "STEERING" => Some(OutputField::Steering),
            "ENGINE_RPM" | "RPM" => Some(OutputField::EngineRpm),
            "VEHICLE_SPEED" | "SPEED" => Some(OutputField::VehicleSpeed),
            "FUEL_LEVEL" => Some(OutputField::FuelLevel),
            "ODOMETER" => Some(OutputField::Odometer),
            "VOLTAGE" => Some(OutputField::Voltage),
            "TEMPERATURE" => Some(OutputField::Temperature),
            "DTE" => Some(OutputField::Dte),
            "FUEL_CONS_INST" => Some(OutputField::FuelConsInst),
            "FUEL_CONS_AVG" => Some(OutputField::FuelConsAvg),
            "DOOR_DRIVER" => Some(OutputField::DoorDriver),
            "DOOR_PASSENGER" => Some(OutputField::DoorPassenger),
            "DOOR_REAR_LEFT" => Some(OutputField::DoorRearLeft),
            "DOOR_REAR_RIGHT" => Some(OutputField::DoorRearRight),
            "DOOR_BOOT" => Some(OutputField::DoorBoot),
            "INDICATOR_LEFT" => Some(OutputField::IndicatorLeft),
            "INDICATOR_RIGHT" => Some(OutputField::IndicatorRight),
            "HEADLIGHTS" => Some(OutputField::Headlights),
            "HIGH_BEAM" => Some(OutputField::HighBeam),
            "PARKING_LIGHTS" => Some(OutputField::ParkingLights),
            _ => None,
        }
    }
}

/// How raw bytes are interpreted once extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    /// Single byte unsigned
    U8,
    /// Single byte signed
    I8,
    /// 2 bytes unsigned
    U16,
    /// 2 bytes signed
    I16,
    /// 3 bytes unsigned (odometer and friends)
    U24,
    /// 4 bytes unsigned
    U32,
    /// Raw 1-4 byte word, usually followed by a bitmask formula
    Bitmask,
}

impl ElementType {
    /// Parse a data type name (e.g. `UINT16`, `INT8`, `BITMASK`)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "UINT8" | "U8" | "U08" => Some(ElementType::U8),
            "INT8" | "I8" | "S8" | "S08" => Some(ElementType::I8),
            "UINT16" | "U16" => Some(ElementType::U16),
            "INT16" | "I16" | "S16" => Some(ElementType::I16),
            "UINT24" | "U24" => Some(ElementType::U24),
            "UINT32" | "U32" => Some(ElementType::U32),
            "BITMASK" | "BITS" => Some(ElementType::Bitmask),
            _ => None,
        }
    }

    /// Byte width the type requires, `None` for the width-agnostic bitmask
    pub fn fixed_width(self) -> Option<u8> {
        match self {
            ElementType::U8 | ElementType::I8 => Some(1),
            ElementType::U16 | ElementType::I16 => Some(2),
            ElementType::U24 => Some(3),
            ElementType::U32 => Some(4),
            ElementType::Bitmask => None,
        }
    }

    /// Whether extraction sign-extends
    pub fn is_signed(self) -> bool {
        matches!(self, ElementType::I8 | ElementType::I16)
    }
}

/// Byte ordering of multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Endianness {
    /// Most significant byte first (common on automotive buses)
    #[default]
    Big,
    /// Least significant byte first
    Little,
}

impl Endianness {
    /// Parse a byte order name (`BE`, `LE`, `MSB_FIRST`, ...)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BE" | "BIG_ENDIAN" | "MSB_FIRST" | "BIG" => Some(Endianness::Big),
            "LE" | "LITTLE_ENDIAN" | "LSB_FIRST" | "LITTLE" => Some(Endianness::Little),
            _ => None,
        }
    }
}

/// Conversion applied to the raw extracted value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formula {
    /// Raw value unchanged
    None,
    /// `(raw * mult / div) + offset`
    Scale { mult: i32, div: i32, offset: i32 },
    /// Linear interpolation from the input range onto the output range
    MapRange {
        in_min: i32,
        in_max: i32,
        out_min: i32,
        out_max: i32,
    },
    /// `(raw & mask) >> shift`
    BitmaskExtract { mask: i32, shift: u32 },
}

/// Formula names as they appear in documents, before params are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaKind {
    /// See [`Formula::None`]
    None,
    /// See [`Formula::Scale`]
    Scale,
    /// See [`Formula::MapRange`]
    MapRange,
    /// See [`Formula::BitmaskExtract`]
    BitmaskExtract,
}

impl FormulaKind {
    /// Parse a formula name (`NONE`, `SCALE`, `MAP_RANGE`, `BITMASK_EXTRACT`)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NONE" => Some(FormulaKind::None),
            "SCALE" => Some(FormulaKind::Scale),
            "MAP_RANGE" | "MAP" => Some(FormulaKind::MapRange),
            "BITMASK_EXTRACT" | "BITMASK" => Some(FormulaKind::BitmaskExtract),
            _ => None,
        }
    }
}

impl Formula {
    /// Attach the four positional parameters to a formula kind
    ///
    /// - `SCALE`: `[mult, div, offset, _]`
    /// - `MAP_RANGE`: `[in_min, in_max, out_min, out_max]`
    /// - `BITMASK_EXTRACT`: `[mask, shift, _, _]`
    ///
    /// A negative shift is mapped to `u32::MAX` so validation rejects it.
    pub fn from_params(kind: FormulaKind, params: [i32; 4]) -> Self {
        match kind {
            FormulaKind::None => Formula::None,
            FormulaKind::Scale => Formula::Scale {
                mult: params[0],
                div: params[1],
                offset: params[2],
            },
            FormulaKind::MapRange => Formula::MapRange {
                in_min: params[0],
                in_max: params[1],
                out_min: params[2],
                out_max: params[3],
            },
            FormulaKind::BitmaskExtract => Formula::BitmaskExtract {
                mask: params[0],
                shift: u32::try_from(params[1]).unwrap_or(u32::MAX),
            },
        }
    }
}

/// One field inside a CAN frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Store slot receiving the converted value
    pub target: OutputField,
    /// First payload byte (0-7)
    pub start_byte: u8,
    /// Number of bytes (1-4)
    pub width_bytes: u8,
    /// Byte order of the window
    pub endianness: Endianness,
    /// Interpretation of the extracted bytes
    pub element_type: ElementType,
    /// Conversion to engineering units
    pub formula: Formula,
}

impl FieldSpec {
    /// Byte range read from the payload
    pub fn window(&self) -> Range<usize> {
        let start = self.start_byte as usize;
        start..start + self.width_bytes as usize
    }

    fn validate(&self, frame_id: u16, index: usize) -> Result<(), ValidationError> {
        let invalid = |message: String| ValidationError::InvalidField {
            location: field_location(frame_id, index),
            message,
        };

        if !(1..=4).contains(&self.width_bytes) {
            return Err(invalid(format!(
                "byteCount {} is outside 1-4",
                self.width_bytes
            )));
        }
        if self.start_byte as usize + self.width_bytes as usize > PAYLOAD_LEN {
            return Err(invalid(format!(
                "bytes {}..{} run past the {PAYLOAD_LEN}-byte payload",
                self.start_byte,
                self.start_byte as usize + self.width_bytes as usize
            )));
        }
        if let Some(width) = self.element_type.fixed_width() {
            if width != self.width_bytes {
                return Err(invalid(format!(
                    "{:?} needs {width} byte(s) but byteCount is {}",
                    self.element_type, self.width_bytes
                )));
            }
        }
        match self.formula {
            Formula::MapRange { in_min, in_max, .. } if in_min == in_max => {
                Err(invalid(format!("MAP_RANGE input range {in_min}..{in_max} is empty")))
            }
            Formula::BitmaskExtract { shift, .. } if shift > 31 => {
                Err(invalid("BITMASK_EXTRACT shift must be 0-31".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// A CAN identifier and the fields it carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSpec {
    /// 11-bit identifier
    pub id: u16,
    /// Fields decoded from this frame, applied in order
    pub fields: Vec<FieldSpec>,
}

/// Validated vehicle profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    name: String,
    is_simulated: bool,
    frames: Vec<FrameSpec>,
}

impl Profile {
    /// Validate and build a profile
    ///
    /// Rejects identifiers above 0x7FF, duplicate identifiers, fields whose
    /// byte window leaves the payload, width/type mismatches, degenerate
    /// formulas, and live profiles without frames.
    pub fn new(
        name: impl Into<String>,
        is_simulated: bool,
        frames: Vec<FrameSpec>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();

        for (i, frame) in frames.iter().enumerate() {
            if frame.id > MAX_STANDARD_ID {
                return Err(ValidationError::InvalidIdentifier(format!("0x{:X}", frame.id)));
            }
            if frames[..i].iter().any(|f| f.id == frame.id) {
                return Err(ValidationError::DuplicateFrame(frame.id));
            }
            for (index, field) in frame.fields.iter().enumerate() {
                field.validate(frame.id, index)?;
            }
        }

        if !is_simulated && frames.is_empty() {
            return Err(ValidationError::EmptyProfile(name));
        }

        Ok(Self {
            name,
            is_simulated,
            frames,
        })
    }

    /// Built-in profile used when no document is available
    pub fn simulated() -> Self {
        Self {
            name: "Simulated".to_string(),
            is_simulated: true,
            frames: Vec::new(),
        }
    }

    /// Vehicle name for logging
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the synthetic generator should feed the store
    pub fn is_simulated(&self) -> bool {
        self.is_simulated
    }

    /// All frame definitions
    pub fn frames(&self) -> &[FrameSpec] {
        &self.frames
    }

    /// Find the frame definition for an identifier
    ///
    /// Linear search; profiles hold tens of frames at most.
    pub fn find_frame(&self, id: u16) -> Option<&FrameSpec> {
        self.frames.iter().find(|f| f.id == id)
    }
}
