//! Seat code parsing ("A12" -> row `A`, seat 12).
//!
//! Pure and deterministic; nothing here touches storage, so a malformed code
//! is always rejected before any seat or ticket lookup happens.

use std::fmt;

use serde::Serialize;

use crate::types::DbId;

/// Why a seat code was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatCodeError {
    #[error("Seat code is empty")]
    Empty,

    #[error("Seat code '{0}' must start with a row letter")]
    InvalidRow(String),

    #[error("Seat code '{0}' must end with a positive seat number")]
    InvalidNumber(String),
}

/// A parsed seat code, not yet bound to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SeatCode {
    /// Upper-case ASCII row letter.
    pub row_label: char,
    /// 1-based seat number within the row.
    pub seat_number: i32,
}

impl SeatCode {
    /// Zero-based row index (`A` = 0).
    pub fn row_index(&self) -> i32 {
        i32::from(self.row_label as u8 - b'A')
    }

    /// Bind this code to a room, producing the ledger key.
    pub fn in_room(self, room_id: DbId) -> SeatKey {
        SeatKey {
            room_id,
            row_label: self.row_label,
            seat_number: self.seat_number,
        }
    }
}

impl fmt::Display for SeatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_label, self.seat_number)
    }
}

/// A seat position inside a specific room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatKey {
    pub room_id: DbId,
    pub row_label: char,
    pub seat_number: i32,
}

impl SeatKey {
    /// The room-independent code for this key.
    pub fn code(&self) -> SeatCode {
        SeatCode {
            row_label: self.row_label,
            seat_number: self.seat_number,
        }
    }
}

/// Parse a human seat code such as `"A12"` or `"c7"`.
///
/// Surrounding whitespace is ignored and the row letter is upper-cased.
/// The remainder must be ASCII digits forming a number >= 1.
pub fn parse_seat_code(code: &str) -> Result<SeatCode, SeatCodeError> {
    let trimmed = code.trim();
    let mut chars = trimmed.chars();

    let first = chars.next().ok_or(SeatCodeError::Empty)?;
    if !first.is_ascii_alphabetic() {
        return Err(SeatCodeError::InvalidRow(code.to_string()));
    }

    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SeatCodeError::InvalidNumber(code.to_string()));
    }

    let seat_number: i32 = digits
        .parse()
        .map_err(|_| SeatCodeError::InvalidNumber(code.to_string()))?;
    if seat_number <= 0 {
        return Err(SeatCodeError::InvalidNumber(code.to_string()));
    }

    Ok(SeatCode {
        row_label: first.to_ascii_uppercase(),
        seat_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_code() {
        let code = parse_seat_code("A12").unwrap();
        assert_eq!(code.row_label, 'A');
        assert_eq!(code.seat_number, 12);
    }

    #[test]
    fn upper_cases_row_letter() {
        let code = parse_seat_code("c7").unwrap();
        assert_eq!(code.row_label, 'C');
        assert_eq!(code.to_string(), "C7");
    }

    #[test]
    fn leading_zeros_normalize_to_same_code() {
        assert_eq!(parse_seat_code("a01").unwrap(), parse_seat_code("A1").unwrap());
        assert_eq!(parse_seat_code("a01").unwrap().to_string(), "A1");
    }

    #[test]
    fn ignores_surrounding_whitespace() {
        assert_eq!(parse_seat_code("  B5 ").unwrap().to_string(), "B5");
    }

    #[test]
    fn rejects_empty_code() {
        assert_eq!(parse_seat_code(""), Err(SeatCodeError::Empty));
        assert_eq!(parse_seat_code("   "), Err(SeatCodeError::Empty));
    }

    #[test]
    fn rejects_digit_first_code() {
        assert_eq!(
            parse_seat_code("1A"),
            Err(SeatCodeError::InvalidRow("1A".to_string()))
        );
    }

    #[test]
    fn rejects_non_ascii_row() {
        assert!(matches!(
            parse_seat_code("Ä1"),
            Err(SeatCodeError::InvalidRow(_))
        ));
    }

    #[test]
    fn rejects_missing_or_bad_number() {
        for bad in ["A", "AB", "A1B", "A-1", "A+5", "A 5"] {
            assert!(
                matches!(parse_seat_code(bad), Err(SeatCodeError::InvalidNumber(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_zero_and_overflow() {
        assert!(parse_seat_code("A0").is_err());
        assert!(parse_seat_code("A000").is_err());
        assert!(parse_seat_code("A99999999999").is_err());
    }

    #[test]
    fn row_index_is_zero_based() {
        assert_eq!(parse_seat_code("A1").unwrap().row_index(), 0);
        assert_eq!(parse_seat_code("Z1").unwrap().row_index(), 25);
    }

    #[test]
    fn keys_equal_only_when_all_fields_match() {
        let a1 = parse_seat_code("A1").unwrap();
        assert_eq!(a1.in_room(1), a1.in_room(1));
        assert_ne!(a1.in_room(1), a1.in_room(2));
        assert_ne!(a1.in_room(1), parse_seat_code("A2").unwrap().in_room(1));
        assert_eq!(a1.in_room(3).code(), a1);
    }
}
