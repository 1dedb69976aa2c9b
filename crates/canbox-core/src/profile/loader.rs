//! Profile document loading
//!
//! Document format:
//!
//! ```json
//! {
//!   "name": "Nissan Juke F15",
//!   "isMock": false,
//!   "frames": [
//!     { "canId": "0x180", "fields": [
//!       { "target": "ENGINE_RPM", "startByte": 0, "byteCount": 2,
//!         "byteOrder": "BE", "dataType": "UINT16",
//!         "formula": "SCALE", "params": [1, 7, 0] }
//!     ]}
//!   ]
//! }
//! ```
//!
//! `canId` may be a string (`"0x180"`, `"384"`) or an integer. A field must
//! name its `target`, `startByte`, `byteCount` and `dataType`; `byteOrder` is
//! required once the field spans more than one byte. Anything missing,
//! misspelled or out of range fails the whole load.

use serde::Deserialize;
use std::path::Path;

use super::error::{field_location, ValidationError};
use super::types::{
    ElementType, Endianness, FieldSpec, Formula, FormulaKind, FrameSpec, OutputField, Profile,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDocument {
    name: Option<String>,
    #[serde(alias = "is_simulated", alias = "isSimulated")]
    is_mock: Option<bool>,
    #[serde(default)]
    frames: Vec<FrameDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameDocument {
    #[serde(alias = "id")]
    can_id: Option<CanIdRepr>,
    #[serde(default)]
    fields: Vec<FieldDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CanIdRepr {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldDocument {
    target: Option<String>,
    start_byte: Option<i64>,
    #[serde(alias = "widthBytes")]
    byte_count: Option<i64>,
    #[serde(alias = "endianness")]
    byte_order: Option<String>,
    #[serde(alias = "elementType")]
    data_type: Option<String>,
    formula: Option<String>,
    params: Option<Vec<i64>>,
}

/// Parse and validate a profile document
pub fn load(document: &str) -> Result<Profile, ValidationError> {
    let doc: ProfileDocument =
        serde_json::from_str(document).map_err(|e| ValidationError::ParseError(e.to_string()))?;

    let name = doc.name.unwrap_or_else(|| "Unknown".to_string());
    let is_simulated = doc.is_mock.unwrap_or(false);

    let mut frames = Vec::with_capacity(doc.frames.len());
    for (frame_index, frame_doc) in doc.frames.into_iter().enumerate() {
        frames.push(build_frame(frame_index, frame_doc)?);
    }

    let profile = Profile::new(name, is_simulated, frames)?;
    tracing::debug!(
        "Loaded profile '{}' ({} frames, simulated={})",
        profile.name(),
        profile.frames().len(),
        profile.is_simulated()
    );
    Ok(profile)
}

/// Read and validate a profile document from disk
pub fn load_file(path: impl AsRef<Path>) -> Result<Profile, ValidationError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
    load(&text)
}

/// Parse a CAN identifier string, auto-detecting `0x` hex like `strtol(.., 0)`
fn parse_can_id(repr: &CanIdRepr) -> Result<u16, ValidationError> {
    let (value, shown) = match repr {
        CanIdRepr::Number(n) => (Some(*n), n.to_string()),
        CanIdRepr::Text(s) => {
            let t = s.trim();
            let parsed = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
                i64::from_str_radix(hex, 16).ok()
            } else {
                t.parse::<i64>().ok()
            };
            (parsed, s.clone())
        }
    };

    value
        .and_then(|v| u16::try_from(v).ok())
        .filter(|v| *v <= super::types::MAX_STANDARD_ID)
        .ok_or(ValidationError::InvalidIdentifier(shown))
}

fn build_frame(frame_index: usize, doc: FrameDocument) -> Result<FrameSpec, ValidationError> {
    let id_repr = doc.can_id.ok_or_else(|| ValidationError::MissingField {
        location: format!("frame #{frame_index}"),
        field: "canId",
    })?;
    let id = parse_can_id(&id_repr)?;

    let fields = doc
        .fields
        .into_iter()
        .enumerate()
        .map(|(index, field)| build_field(id, index, field))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FrameSpec { id, fields })
}

fn build_field(frame_id: u16, index: usize, doc: FieldDocument) -> Result<FieldSpec, ValidationError> {
    let location = || field_location(frame_id, index);
    let missing = |field: &'static str| ValidationError::MissingField {
        location: location(),
        field,
    };
    let unknown = |kind: &'static str, value: &str| ValidationError::UnknownName {
        location: location(),
        kind,
        value: value.to_string(),
    };
    let out_of_range = |what: &str, value: i64| ValidationError::InvalidField {
        location: location(),
        message: format!("{what} {value} is out of range"),
    };

    let target_name = doc.target.ok_or_else(|| missing("target"))?;
    let target = OutputField::from_name(&target_name).ok_or_else(|| unknown("target", &target_name))?;

    let start_byte = doc.start_byte.ok_or_else(|| missing("startByte"))?;
    let start_byte = u8::try_from(start_byte).map_err(|_| out_of_range("startByte", start_byte))?;

    let width_bytes = doc.byte_count.ok_or_else(|| missing("byteCount"))?;
    let width_bytes = u8::try_from(width_bytes).map_err(|_| out_of_range("byteCount", width_bytes))?;

    let type_name = doc.data_type.ok_or_else(|| missing("dataType"))?;
    let element_type = ElementType::from_name(&type_name).ok_or_else(|| unknown("dataType", &type_name))?;

    // Byte order is meaningless for a single byte
    let endianness = match doc.byte_order {
        Some(name) => Endianness::from_name(&name).ok_or_else(|| unknown("byteOrder", &name))?,
        None if width_bytes <= 1 => Endianness::Big,
        None => return Err(missing("byteOrder")),
    };

    let kind = match doc.formula {
        Some(name) => FormulaKind::from_name(&name).ok_or_else(|| unknown("formula", &name))?,
        None => FormulaKind::None,
    };

    let mut params = [0i32; 4];
    match doc.params {
        Some(values) => {
            if values.len() > params.len() {
                return Err(ValidationError::InvalidField {
                    location: location(),
                    message: format!("at most 4 params allowed, got {}", values.len()),
                });
            }
            for (slot, value) in params.iter_mut().zip(values) {
                *slot = i32::try_from(value).map_err(|_| out_of_range("param", value))?;
            }
        }
        None if kind != FormulaKind::None => return Err(missing("params")),
        None => {}
    }

    Ok(FieldSpec {
        target,
        start_byte,
        width_bytes,
        endianness,
        element_type,
        formula: Formula::from_params(kind, params),
    })
}
