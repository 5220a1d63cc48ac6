//! # Wire-Core: native engine frame decoding
//!
//! The native RTC engine reports events by writing one compact binary frame
//! into a host-owned buffer per poll. This crate turns those bytes into data:
//!
//! - [`frame`]: the frame layout, the reusable [`MessageRecord`] and the
//!   [`FrameDecoder`] / [`FrameBuilder`] pair
//! - [`payload`]: codecs for the structures nested in a frame's payload
//!   (connection statistics and the per-speaker volume list)
//!
//! Nothing here knows what a tag means; classification and dispatch live in
//! `rtcbridge-client-core`.
//!
//! ## Usage
//!
//! ```rust
//! use rtcbridge_wire_core::{FrameBuilder, FrameDecoder, MessageRecord, TextEncoding};
//!
//! let frame = FrameBuilder::new(13013).args(4242, 120, 0).build();
//!
//! let decoder = FrameDecoder::new(TextEncoding::Latin1);
//! let mut record = MessageRecord::with_capacity(2048);
//! let record = decoder.decode(&frame, frame.len(), &mut record)?;
//!
//! assert_eq!(record.tag, 13013);
//! assert_eq!(record.arg0, 4242);
//! # Ok::<(), rtcbridge_wire_core::WireError>(())
//! ```

pub mod error;
pub mod frame;
pub mod payload;

pub use error::{Result, WireError};
pub use frame::{
    decode, FrameBuilder, FrameDecoder, MessageRecord, TextEncoding, DEFAULT_PAYLOAD_CAPACITY,
    FIELD_SIZE, MIN_FRAME_SIZE, TAG_NONE,
};
pub use payload::{
    decode_volume_list, decode_volume_list_into, encode_volume_list, AudioVolumeInfo, RtcStats,
    StatsVariant, VOLUME_ENTRY_SIZE,
};

/// Version information for the wire library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
