//! Field codec
//!
//! Pure functions that pull an integer out of a CAN payload window and turn
//! it into engineering units. No state, no allocation.

use crate::profile::{ElementType, Endianness, FieldSpec, Formula};

/// Extract a raw integer from `payload[start..start + width]`
///
/// Big-endian accumulates bytes from `start` to the end of the window,
/// little-endian from the end back to `start`. Only `I8` and `I16` are
/// sign-extended. Returns `None` when the window does not fit the payload
/// or is wider than 4 bytes.
pub fn extract_raw(
    payload: &[u8],
    start: usize,
    width: usize,
    endianness: Endianness,
    element_type: ElementType,
) -> Option<i32> {
    if width == 0 || width > 4 {
        return None;
    }
    let window = payload.get(start..start.checked_add(width)?)?;

    let accumulate = |acc: u32, byte: &u8| (acc << 8) | u32::from(*byte);
    let raw = match endianness {
        Endianness::Big => window.iter().fold(0u32, accumulate),
        Endianness::Little => window.iter().rev().fold(0u32, accumulate),
    };

    Some(match element_type {
        ElementType::I8 => raw as u8 as i8 as i32,
        ElementType::I16 => raw as u16 as i16 as i32,
        _ => raw as i32,
    })
}

/// Extract the raw value described by a field spec
pub fn extract_field(payload: &[u8], field: &FieldSpec) -> Option<i32> {
    let window = field.window();
    extract_raw(
        payload,
        window.start,
        window.len(),
        field.endianness,
        field.element_type,
    )
}

/// Map a value from one range onto another
///
/// Same arithmetic as the Arduino `map()` helper: integer, truncating, and
/// extrapolating outside the input bounds. An empty input range yields
/// `out_min`.
pub fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    // Products of full-width spans overflow i64
    let run = i128::from(in_max) - i128::from(in_min);
    if run == 0 {
        return out_min;
    }
    let rise = i128::from(out_max) - i128::from(out_min);
    let delta = i128::from(x) - i128::from(in_min);
    (delta * rise / run + i128::from(out_min)) as i32
}

/// Apply a conversion formula to a raw value
pub fn apply_formula(raw: i32, formula: &Formula) -> i32 {
    match *formula {
        Formula::None => raw,
        Formula::Scale { mult, div, offset } => {
            let mult = if mult != 0 { mult } else { 1 };
            let div = if div != 0 { div } else { 1 };
            (i64::from(raw) * i64::from(mult) / i64::from(div) + i64::from(offset)) as i32
        }
        Formula::MapRange {
            in_min,
            in_max,
            out_min,
            out_max,
        } => map_range(raw, in_min, in_max, out_min, out_max),
        Formula::BitmaskExtract { mask, shift } => (raw & mask).checked_shr(shift).unwrap_or(0),
    }
}
