//! Typed payload codecs
//!
//! Two frame kinds carry a binary structure in their payload: the connection
//! statistics (session-end and periodic variants) and the per-speaker volume
//! list. The codecs here are pure and bound-checked; the caller decides which
//! one applies from the frame tag.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};

/// Size of one encoded volume entry (uid + volume)
pub const VOLUME_ENTRY_SIZE: usize = 8;

/// Which stats layout a payload uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsVariant {
    /// Sent when leaving a channel; no audio bitrates or participant count
    SessionEnd,
    /// Sent periodically while in a channel
    Periodic,
}

impl StatsVariant {
    /// Number of payload bytes the layout occupies
    pub const fn wire_len(self) -> usize {
        match self {
            Self::SessionEnd => 3 * 4 + 2 * 2,
            Self::Periodic => 3 * 4 + 4 * 2 + 4,
        }
    }
}

/// Connection statistics reported by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RtcStats {
    /// Time in the channel, milliseconds
    pub duration: u32,
    /// Bytes sent
    pub tx_bytes: u32,
    /// Bytes received
    pub rx_bytes: u32,
    /// Send bitrate, kbit/s
    pub tx_kbit_rate: u16,
    /// Receive bitrate, kbit/s
    pub rx_kbit_rate: u16,
    /// Audio send bitrate, kbit/s (periodic variant only)
    pub tx_audio_kbit_rate: u16,
    /// Audio receive bitrate, kbit/s (periodic variant only)
    pub rx_audio_kbit_rate: u16,
    /// Last-mile network quality; not populated by this transport
    pub lastmile_quality: u32,
    /// Participants in the channel (periodic variant only)
    pub users: u32,
    /// Application CPU usage; not populated by this transport
    pub cpu_app_usage: f64,
    /// System CPU usage; not populated by this transport
    pub cpu_total_usage: f64,
}

impl RtcStats {
    /// Decode a stats payload of the given variant
    ///
    /// Fields the variant does not carry are zero. Bytes past the layout are
    /// ignored.
    pub fn decode(variant: StatsVariant, payload: &[u8]) -> Result<Self> {
        let needed = variant.wire_len();
        if payload.len() < needed {
            return Err(WireError::short("stats", needed, payload.len()));
        }

        let mut buf = payload;
        let mut stats = RtcStats {
            duration: buf.get_u32_le(),
            tx_bytes: buf.get_u32_le(),
            rx_bytes: buf.get_u32_le(),
            tx_kbit_rate: buf.get_u16_le(),
            rx_kbit_rate: buf.get_u16_le(),
            ..Default::default()
        };

        if variant == StatsVariant::Periodic {
            stats.tx_audio_kbit_rate = buf.get_u16_le();
            stats.rx_audio_kbit_rate = buf.get_u16_le();
            stats.users = buf.get_u32_le();
        }

        Ok(stats)
    }

    /// Append the payload layout of `variant` to `buf`
    pub fn encode_into(&self, variant: StatsVariant, buf: &mut BytesMut) {
        buf.reserve(variant.wire_len());
        buf.put_u32_le(self.duration);
        buf.put_u32_le(self.tx_bytes);
        buf.put_u32_le(self.rx_bytes);
        buf.put_u16_le(self.tx_kbit_rate);
        buf.put_u16_le(self.rx_kbit_rate);
        if variant == StatsVariant::Periodic {
            buf.put_u16_le(self.tx_audio_kbit_rate);
            buf.put_u16_le(self.rx_audio_kbit_rate);
            buf.put_u32_le(self.users);
        }
    }
}

/// Volume of one active speaker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioVolumeInfo {
    /// Speaker uid
    pub uid: u32,
    /// Volume, nominally 0-255
    pub volume: u32,
}

/// Number of complete volume entries in a payload of `len` bytes
pub fn volume_entry_count(len: usize) -> usize {
    len / VOLUME_ENTRY_SIZE
}

/// Decode a volume-indication payload into `out`, replacing its contents
///
/// A trailing partial entry is ignored. `out` keeps its allocation, so a
/// vector reused across ticks stops allocating once it has grown to the
/// largest speaker list seen.
pub fn decode_volume_list_into(payload: &[u8], out: &mut Vec<AudioVolumeInfo>) {
    out.clear();

    let count = volume_entry_count(payload.len());
    let mut buf = &payload[..count * VOLUME_ENTRY_SIZE];
    out.reserve(count);
    for _ in 0..count {
        out.push(AudioVolumeInfo {
            uid: buf.get_u32_le(),
            volume: buf.get_u32_le(),
        });
    }
}

/// Decode a volume-indication payload into a new vector
pub fn decode_volume_list(payload: &[u8]) -> Vec<AudioVolumeInfo> {
    let mut speakers = Vec::new();
    decode_volume_list_into(payload, &mut speakers);
    speakers
}

/// Encode speakers in the volume-indication payload layout
pub fn encode_volume_list(speakers: &[AudioVolumeInfo], buf: &mut BytesMut) {
    buf.reserve(speakers.len() * VOLUME_ENTRY_SIZE);
    for speaker in speakers {
        buf.put_u32_le(speaker.uid);
        buf.put_u32_le(speaker.volume);
    }
}
