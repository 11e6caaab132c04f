//! Unit conversion at the UI boundary.
//!
//! The UI speaks millimeters; the engine and the wire speak micrometers.

use crate::error::ValidationError;

/// Micrometers per millimeter.
pub const UM_PER_MM: i64 = 1000;

/// Convert whole millimeters into micrometers.
///
/// # Errors
///
/// Returns [`ValidationError::UnitOverflow`] when the result does not fit in `i64`.
pub fn mm_to_um(mm: i64) -> Result<i64, ValidationError> {
    mm.checked_mul(UM_PER_MM)
        .ok_or(ValidationError::UnitOverflow(mm))
}
