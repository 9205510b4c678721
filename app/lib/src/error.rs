//! Error types for the ALS codec.
//!
//! This module defines every failure that can surface from parsing,
//! compression, decoding, and rendering operations.

use std::fmt;

use thiserror::Error;

use crate::convert::SourceKind;

/// Main error type for the ALS codec.
///
/// All fallible operations return `Result<T, AlsError>`. Parsing and decoding
/// errors are never partially recovered: a malformed input fails the whole call.
#[derive(Debug, Error)]
pub enum AlsError {
    /// Input bytes are not valid UTF-8.
    #[error("input is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 {
        /// Number of leading bytes that form valid UTF-8
        valid_up_to: usize,
    },

    /// CSV input is empty, has a duplicate header, or has a ragged row.
    #[error("malformed CSV at line {line}: {message}")]
    MalformedCsv {
        /// Line number where the problem was detected (1-indexed)
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// JSON input failed to parse.
    ///
    /// Carries the byte offset of the first error encountered.
    #[error("malformed JSON at byte {offset}: {message}")]
    MalformedJson {
        /// Byte offset in the input where parsing failed
        offset: usize,
        /// Description of the syntax error
        message: String,
    },

    /// ALS text could not be decoded.
    ///
    /// Raised for an unrecognized header, a reference to a non-existent
    /// dictionary id, a fallback payload that fails to decompress, and any
    /// other token-level syntax problem.
    #[error("malformed ALS stream at byte {position}: {message}")]
    MalformedAlsStream {
        /// Byte position in the ALS text where the problem was detected
        position: usize,
        /// Description of the problem
        message: String,
    },

    /// A document was requested back as a different source kind than it
    /// was encoded from.
    #[error("kind mismatch: requested {requested} but document was encoded from {found}")]
    KindMismatch {
        /// Kind the caller asked for
        requested: SourceKind,
        /// Kind declared by the document header
        found: SourceKind,
    },

    /// Encoding could not produce a document.
    ///
    /// The structural path recovers from this by switching to the fallback
    /// compressor; it only surfaces when the fallback fails as well.
    #[error("encoding failure: {0}")]
    EncodingFailure(String),

    /// Compressor configuration is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AlsError {
    /// Shorthand for a [`AlsError::MalformedAlsStream`] at `position`.
    pub(crate) fn malformed(position: usize, message: impl fmt::Display) -> Self {
        AlsError::MalformedAlsStream {
            position,
            message: message.to_string(),
        }
    }
}

impl From<std::str::Utf8Error> for AlsError {
    fn from(err: std::str::Utf8Error) -> Self {
        AlsError::InvalidUtf8 {
            valid_up_to: err.valid_up_to(),
        }
    }
}

/// Result type alias for ALS codec operations.
pub type Result<T> = std::result::Result<T, AlsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_csv_display() {
        let error = AlsError::MalformedCsv {
            line: 3,
            message: "expected 2 fields, found 3".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("line 3"));
        assert!(display.contains("expected 2 fields"));
    }

    #[test]
    fn test_malformed_json_display() {
        let error = AlsError::MalformedJson {
            offset: 17,
            message: "trailing comma".to_string(),
        };
        assert_eq!(format!("{}", error), "malformed JSON at byte 17: trailing comma");
    }

    #[test]
    fn test_kind_mismatch_display() {
        let error = AlsError::KindMismatch {
            requested: SourceKind::Json,
            found: SourceKind::Csv,
        };
        let display = format!("{}", error);
        assert!(display.contains("requested json"));
        assert!(display.contains("encoded from csv"));
    }

    #[test]
    fn test_malformed_helper() {
        let error = AlsError::malformed(4, "unknown escape");
        assert!(matches!(
            error,
            AlsError::MalformedAlsStream { position: 4, .. }
        ));
    }

    #[test]
    fn test_utf8_error_from() {
        let bytes = [b'a', b'b', 0xff, b'c'];
        let utf8_error = std::str::from_utf8(&bytes).unwrap_err();
        let als_error: AlsError = utf8_error.into();
        assert!(matches!(als_error, AlsError::InvalidUtf8 { valid_up_to: 2 }));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AlsError>();
    }
}
