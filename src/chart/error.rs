//! Parse failures.

use thiserror::Error;

/// Reasons a chart text cannot be turned into a [`super::Chart`].
///
/// Individual malformed note tokens are not errors; they are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid character '{ch}' at line {line}, column {column}")]
    InvalidCharacter { ch: char, line: usize, column: usize },

    #[error("difficulty {0} has no note body in this chart")]
    MissingDifficulty(u8),

    #[error("difficulty {0} is out of range (expected 1-6)")]
    InvalidDifficulty(u8),

    #[error("chart text is empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_readable() {
        let err = ParseError::InvalidCharacter {
            ch: '%',
            line: 3,
            column: 7,
        };
        assert_eq!(err.to_string(), "invalid character '%' at line 3, column 7");
        assert_eq!(
            ParseError::MissingDifficulty(5).to_string(),
            "difficulty 5 has no note body in this chart"
        );
    }
}
