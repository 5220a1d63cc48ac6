//! Engine configuration
//!
//! ```rust
//! use rtcbridge_client_core::config::EngineConfig;
//! use rtcbridge_client_core::TextEncoding;
//!
//! let config = EngineConfig::new()
//!     .with_payload_capacity(4096)
//!     .with_text_encoding(TextEncoding::Utf8Lossy)
//!     .with_frame_logging(true);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.payload_capacity, 4096);
//! ```
//!
//! Configuration can also be loaded from JSON; missing fields take their
//! defaults:
//!
//! ```rust
//! use rtcbridge_client_core::config::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "text_encoding": "utf8_lossy" }"#).unwrap();
//! assert_eq!(config.buffer_size, 2048);
//! ```

use serde::{Deserialize, Serialize};

use rtcbridge_wire_core::{TextEncoding, DEFAULT_PAYLOAD_CAPACITY, MIN_FRAME_SIZE};

use crate::error::{ClientError, Result};

/// Size of the poll buffer the engine writes frames into
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Settings for the poll driver and decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bytes offered to the engine on each poll
    pub buffer_size: usize,
    /// Largest payload the reusable record accepts
    pub payload_capacity: usize,
    /// Decoding of the frame text field
    pub text_encoding: TextEncoding,
    /// Log every decoded frame at debug level
    pub log_frames: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            payload_capacity: DEFAULT_PAYLOAD_CAPACITY,
            text_encoding: TextEncoding::Latin1,
            log_frames: false,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll buffer size
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the payload capacity
    pub fn with_payload_capacity(mut self, capacity: usize) -> Self {
        self.payload_capacity = capacity;
        self
    }

    /// Set the text encoding
    pub fn with_text_encoding(mut self, encoding: TextEncoding) -> Self {
        self.text_encoding = encoding;
        self
    }

    /// Enable or disable per-frame debug logging
    pub fn with_frame_logging(mut self, enabled: bool) -> Self {
        self.log_frames = enabled;
        self
    }

    /// Check that the configuration can hold at least one frame
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_FRAME_SIZE {
            return Err(ClientError::config(format!(
                "buffer_size must be at least {} bytes, got {}",
                MIN_FRAME_SIZE, self.buffer_size
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
