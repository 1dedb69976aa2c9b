//! Vehicle Profiles
//!
//! Declarative description of which CAN identifiers matter for a vehicle and
//! which fields each one carries. Loaded from a JSON document, validated once,
//! immutable afterwards.

mod error;
mod loader;
mod types;

pub use error::ValidationError;
pub use loader::{load, load_file};
pub use types::{
    ElementType, Endianness, FieldSpec, Formula, FormulaKind, FrameSpec, OutputField, Profile,
    MAX_STANDARD_ID, PAYLOAD_LEN,
};
