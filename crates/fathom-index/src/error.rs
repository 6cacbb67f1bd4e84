use std::fmt;
use thiserror::Error as ThisError;

///
/// IndexError
///
/// Structured runtime error with a stable internal classification.
/// Validation failures keep their own typed enums (`DefinitionError`,
/// `RangeError`, ...); this type is the umbrella the codec, extraction,
/// and scan paths propagate once a failure crosses a module boundary.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct IndexError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl IndexError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a codec-origin corruption error (malformed persisted bytes).
    pub(crate) fn codec_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Codec, message)
    }

    /// Construct a codec-origin invariant violation (schema/data mismatch).
    pub(crate) fn codec_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Codec, message)
    }

    /// Construct a codec-origin unsupported error.
    pub(crate) fn codec_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Codec, message)
    }

    /// Construct a scan-origin internal error.
    pub(crate) fn scan_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Scan, message)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }

    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self.class, ErrorClass::Corruption)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Schema,
    Definition,
    Codec,
    Range,
    Scan,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Definition => "definition",
            Self::Codec => "codec",
            Self::Range => "range",
            Self::Scan => "scan",
        };
        write!(f, "{label}")
    }
}
