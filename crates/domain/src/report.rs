//! Position reports sent by the device in reply to `!ON0;`.
//!
//! Format: `P<x>,<y>,<z>C…`: signed micrometer fields after the leading `P`,
//! comma separated, ending at the first `C`. Anything after that is ignored.
//! The device is noisy, so a failed decode is an expected outcome.

use crate::error::DecodeError;
use crate::position::Position;

/// Decode a position report line.
///
/// # Errors
///
/// Returns [`DecodeError`] when the line is not a well-formed report.
pub fn decode_position(line: &str) -> Result<Position, DecodeError> {
    let body = line.trim().strip_prefix('P').ok_or(DecodeError::MissingPrefix)?;
    let fields = body.split('C').next().unwrap_or_default();

    let mut coords = [0_i64; 3];
    let mut parts = fields.split(',');
    for (index, slot) in coords.iter_mut().enumerate() {
        let raw = parts.next().ok_or(DecodeError::MissingField(index))?.trim();
        *slot = raw
            .parse()
            .map_err(|_| DecodeError::InvalidNumber(raw.to_string()))?;
    }

    Ok(Position::new(coords[0], coords[1], coords[2]))
}

/// Encode a position the way the device reports it.
#[must_use]
pub fn encode_position(position: Position) -> String {
    format!("P{},{},{}C", position.x, position.y, position.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_report_with_suffix() {
        assert_eq!(
            decode_position("P1000,2000,0C..."),
            Ok(Position::new(1000, 2000, 0))
        );
    }

    #[test]
    fn should_decode_negative_coordinates_and_trailing_newline() {
        assert_eq!(
            decode_position("P-50,75,-3C\r\n"),
            Ok(Position::new(-50, 75, -3))
        );
    }

    #[test]
    fn should_ignore_fields_past_z() {
        assert_eq!(decode_position("P1,2,3,4C"), Ok(Position::new(1, 2, 3)));
    }

    #[test]
    fn should_reject_garbage() {
        assert_eq!(decode_position("garbage"), Err(DecodeError::MissingPrefix));
    }

    #[test]
    fn should_reject_report_with_too_few_fields() {
        assert_eq!(decode_position("P1000,2000C"), Err(DecodeError::MissingField(2)));
    }

    #[test]
    fn should_reject_non_numeric_field() {
        assert_eq!(
            decode_position("P10,abc,0C"),
            Err(DecodeError::InvalidNumber("abc".to_string()))
        );
    }

    #[test]
    fn should_decode_what_it_encodes() {
        let p = Position::new(123_456, 7, -8);
        assert_eq!(decode_position(&encode_position(p)), Ok(p));
    }
}
