//! Error handling for the client library
//!
//! Decode failures never surface here during polling; they are counted and
//! logged by the poll driver. `ClientError` covers the calls a host makes
//! directly: building an engine, loading configuration and forwarding
//! commands.

use std::fmt;
use thiserror::Error;

use rtcbridge_wire_core::WireError;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors returned by the client library
#[derive(Error, Debug)]
pub enum ClientError {
    /// A frame or payload could not be decoded
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// Invalid engine configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The engine has no outbound command sink attached
    #[error("No command sink attached to the engine")]
    NoCommandSink,

    /// The native engine rejected a command
    #[error("Engine rejected command `{command}` with code {code}")]
    Command { command: String, code: i32 },
}

impl ClientError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Check if the operation can be retried on a later tick
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Wire(_) | Self::Command { .. } => true,
            Self::Configuration { .. } | Self::NoCommandSink => false,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Wire(_) => ErrorCategory::Wire,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::NoCommandSink | Self::Command { .. } => ErrorCategory::Engine,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(format!("invalid JSON: {}", err))
    }
}

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Frame and payload decoding
    Wire,
    /// Configuration and parameter errors
    Configuration,
    /// Native engine interaction
    Engine,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire => write!(f, "wire"),
            Self::Configuration => write!(f, "configuration"),
            Self::Engine => write!(f, "engine"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_error_conversion() {
        let err: ClientError = WireError::truncated("tag", 4, 1).into();
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Wire);
        assert!(err.to_string().starts_with("Wire error: Truncated header"));
    }

    #[test]
    fn test_command_error_display() {
        let err = ClientError::Command {
            command: "{\"rtc.log_filter\": 15}".to_string(),
            code: -2,
        };
        assert_eq!(
            err.to_string(),
            "Engine rejected command `{\"rtc.log_filter\": 15}` with code -2"
        );
        assert_eq!(err.category().to_string(), "engine");
    }

    #[test]
    fn test_configuration_not_recoverable() {
        let err = ClientError::config("buffer_size must be at least 24 bytes");
        assert!(!err.is_recoverable());
        assert!(!ClientError::NoCommandSink.is_recoverable());
    }
}
