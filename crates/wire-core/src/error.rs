//! Error types for frame decoding and payload codecs

use thiserror::Error;

/// Result type alias for wire operations
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors produced while decoding an engine frame or one of its payloads
///
/// Every variant describes a buffer that was too short or a length prefix that
/// could not be honoured. None of them are fatal: the poll tick that produced
/// the frame simply yields no event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A fixed-size header field is cut off by the end of the buffer
    #[error("Truncated header: field `{field}` needs {needed} bytes, {available} available")]
    TruncatedHeader {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// A declared length runs past the end of the buffer or payload
    #[error("Short payload: `{field}` needs {needed} bytes, {available} available")]
    ShortPayload {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// The declared payload does not fit the pre-allocated payload buffer
    #[error("Payload overflow: {size} bytes declared, capacity is {capacity}")]
    PayloadOverflow { size: usize, capacity: usize },

    /// A length prefix is negative
    #[error("Negative length {value} in field `{field}`")]
    NegativeLength { field: &'static str, value: i32 },
}

impl WireError {
    /// Create a truncated header error
    pub fn truncated(field: &'static str, needed: usize, available: usize) -> Self {
        Self::TruncatedHeader {
            field,
            needed,
            available,
        }
    }

    /// Create a short payload error
    pub fn short(field: &'static str, needed: usize, available: usize) -> Self {
        Self::ShortPayload {
            field,
            needed,
            available,
        }
    }

    /// Name of the wire field the error refers to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::TruncatedHeader { field, .. }
            | Self::ShortPayload { field, .. }
            | Self::NegativeLength { field, .. } => Some(field),
            Self::PayloadOverflow { .. } => None,
        }
    }

    /// True when the frame ended before a declared length was satisfied
    pub fn is_bounds_violation(&self) -> bool {
        matches!(
            self,
            Self::TruncatedHeader { .. } | Self::ShortPayload { .. } | Self::PayloadOverflow { .. }
        )
    }
}
