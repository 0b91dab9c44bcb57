//! Wire protocol.
//!
//! One command per line, client to server only:
//!
//! ```text
//! ^[0-9]{9}$   a number in [0, 999999999]
//! terminate    shut the whole server down
//! ```
//!
//! Anything else is a [`ProtocolError`]. The server never answers; it only
//! closes the connection.

use crate::error::ProtocolError;
use crate::types::Number;

/// The literal line that shuts the server down.
pub const TERMINATE: &str = "terminate";

/// A successfully decoded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// Nine digits, parsed
    Number(Number),
    /// The terminate command
    Terminate,
}

/// Decodes one line (without its line terminator).
///
/// Only ASCII digits are accepted, so signs, whitespace and non-ASCII
/// digits are all rejected.
pub fn parse_line(line: &str) -> Result<Line, ProtocolError> {
    if line == TERMINATE {
        return Ok(Line::Terminate);
    }

    let bytes = line.as_bytes();
    if bytes.len() != Number::DIGITS || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(ProtocolError::malformed(line));
    }

    let value = bytes
        .iter()
        .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));

    // Nine digits always fit below Number::MAX.
    Number::new(value)
        .map(Line::Number)
        .ok_or_else(|| ProtocolError::malformed(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: u32) -> Line {
        Line::Number(Number::new(n).unwrap())
    }

    #[test]
    fn test_parse_valid_numbers() {
        assert_eq!(parse_line("000000001"), Ok(number(1)));
        assert_eq!(parse_line("102032052"), Ok(number(102_032_052)));
        assert_eq!(parse_line("000000000"), Ok(number(0)));
        assert_eq!(parse_line("999999999"), Ok(number(999_999_999)));
    }

    #[test]
    fn test_parse_terminate() {
        assert_eq!(parse_line("terminate"), Ok(Line::Terminate));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let invalid = [
            "12345",
            "12345678a",
            "-123123123",
            "0120asda1",
            "1231",
            "012312313121",
            "",
            " 12345678",
            "12345678 ",
            "+12345678",
            "Terminate",
            "terminate ",
            "１２３４５６７８９",
        ];

        for line in invalid {
            assert!(
                matches!(parse_line(line), Err(ProtocolError::Malformed { .. })),
                "expected {line:?} to be rejected"
            );
        }
    }
}
