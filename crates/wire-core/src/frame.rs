//! Engine message frames
//!
//! The native engine hands the host one frame per poll. A frame is a flat,
//! unpadded little-endian record:
//!
//! ```text
//! +--------+--------+--------+--------+------------+-----------+---------------+--------------+
//! | tag    | arg0   | arg1   | arg2   | textLength | text ...  | payloadLength | payload ...  |
//! | i32 LE | i32 LE | i32 LE | i32 LE | i32 LE     | N bytes   | i32 LE        | M bytes      |
//! +--------+--------+--------+--------+------------+-----------+---------------+--------------+
//! ```
//!
//! [`FrameDecoder`] parses a frame into a reusable [`MessageRecord`] without
//! interpreting the tag. [`FrameBuilder`] produces the same layout and is what
//! mock engines and tests use to feed the decoder.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use crate::error::{Result, WireError};

/// Tag value of a record that holds no message
pub const TAG_NONE: i32 = -1;

/// Size of every fixed header field and length prefix
pub const FIELD_SIZE: usize = 4;

/// Smallest well-formed frame: five header fields plus the payload length
pub const MIN_FRAME_SIZE: usize = 6 * FIELD_SIZE;

/// Payload capacity agreed with the native engine
pub const DEFAULT_PAYLOAD_CAPACITY: usize = 2048;

/// How the `text` field bytes are turned into a string
///
/// The engine writes text in the platform's default 8-bit code page, which is
/// not guaranteed to be UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// Every byte maps to the code point of the same value (lossless)
    #[default]
    Latin1,
    /// Bytes are read as UTF-8, invalid sequences become U+FFFD
    Utf8Lossy,
}

impl TextEncoding {
    /// Append `bytes` decoded with this encoding to `out`
    pub fn decode_into(self, bytes: &[u8], out: &mut String) {
        match self {
            Self::Latin1 => out.extend(bytes.iter().map(|&b| char::from(b))),
            Self::Utf8Lossy => out.push_str(&String::from_utf8_lossy(bytes)),
        }
    }

    /// Append `text` encoded with this encoding to `out`
    ///
    /// Characters that Latin-1 cannot represent are written as `?`.
    pub fn encode_into(self, text: &str, out: &mut BytesMut) {
        match self {
            Self::Latin1 => {
                for c in text.chars() {
                    let byte = u8::try_from(u32::from(c)).unwrap_or(b'?');
                    out.put_u8(byte);
                }
            }
            Self::Utf8Lossy => out.put_slice(text.as_bytes()),
        }
    }
}

/// One decoded engine message
///
/// A single record is allocated up front and refilled on every poll; its
/// payload buffer never grows past the capacity it was created with.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Event code, [`TAG_NONE`] when the record is empty
    pub tag: i32,
    /// First general-purpose argument
    pub arg0: i32,
    /// Second general-purpose argument
    pub arg1: i32,
    /// Third general-purpose argument
    pub arg2: i32,
    text: String,
    payload: BytesMut,
    capacity: usize,
}

impl MessageRecord {
    /// Create an empty record whose payload buffer holds up to `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tag: TAG_NONE,
            arg0: 0,
            arg1: 0,
            arg2: 0,
            text: String::new(),
            payload: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Reset every field without releasing the buffers
    pub fn clear(&mut self) {
        self.tag = TAG_NONE;
        self.arg0 = 0;
        self.arg1 = 0;
        self.arg2 = 0;
        self.text.clear();
        self.payload.clear();
    }

    /// True when the record holds no message
    pub fn is_empty(&self) -> bool {
        self.tag == TAG_NONE
    }

    /// The decoded text argument
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The tag-specific binary payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Maximum payload size this record accepts
    pub fn payload_capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MessageRecord {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PAYLOAD_CAPACITY)
    }
}

impl fmt::Debug for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRecord")
            .field("tag", &self.tag)
            .field("arg0", &self.arg0)
            .field("arg1", &self.arg1)
            .field("arg2", &self.arg2)
            .field("text", &self.text)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Parses engine frames into a [`MessageRecord`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder {
    encoding: TextEncoding,
}

impl FrameDecoder {
    /// Create a decoder using the given text encoding
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    /// Text encoding used for the `text` field
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Decode the first `length` bytes of `buffer` into `record`
    ///
    /// `length` is clamped to the buffer size. On failure the record is left
    /// cleared, so a stale message is never observed.
    pub fn decode<'r>(
        &self,
        buffer: &[u8],
        length: usize,
        record: &'r mut MessageRecord,
    ) -> Result<&'r MessageRecord> {
        let valid = &buffer[..length.min(buffer.len())];

        record.clear();
        if let Err(err) = self.fill(valid, record) {
            trace!(length = valid.len(), "Frame decode failed: {}", err);
            record.clear();
            return Err(err);
        }
        Ok(&*record)
    }

    fn fill(&self, mut buf: &[u8], record: &mut MessageRecord) -> Result<()> {
        record.tag = read_i32(&mut buf, "tag")?;
        record.arg0 = read_i32(&mut buf, "arg0")?;
        record.arg1 = read_i32(&mut buf, "arg1")?;
        record.arg2 = read_i32(&mut buf, "arg2")?;

        let text_len = read_len(&mut buf, "text_length")?;
        if text_len > 0 {
            if buf.remaining() < text_len {
                return Err(WireError::short("text", text_len, buf.remaining()));
            }
            self.encoding.decode_into(&buf[..text_len], &mut record.text);
            buf.advance(text_len);
        }

        let payload_len = read_len(&mut buf, "payload_length")?;
        if payload_len > record.capacity {
            return Err(WireError::PayloadOverflow {
                size: payload_len,
                capacity: record.capacity,
            });
        }
        if buf.remaining() < payload_len {
            return Err(WireError::short("payload", payload_len, buf.remaining()));
        }
        record.payload.extend_from_slice(&buf[..payload_len]);

        Ok(())
    }
}

/// Decode a frame with the default (Latin-1) text encoding
pub fn decode<'r>(
    buffer: &[u8],
    length: usize,
    record: &'r mut MessageRecord,
) -> Result<&'r MessageRecord> {
    FrameDecoder::default().decode(buffer, length, record)
}

fn read_i32(buf: &mut &[u8], field: &'static str) -> Result<i32> {
    if buf.remaining() < FIELD_SIZE {
        return Err(WireError::truncated(field, FIELD_SIZE, buf.remaining()));
    }
    Ok(buf.get_i32_le())
}

fn read_len(buf: &mut &[u8], field: &'static str) -> Result<usize> {
    let value = read_i32(buf, field)?;
    usize::try_from(value).map_err(|_| WireError::NegativeLength { field, value })
}

/// Builds encoded frames in the engine's wire layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBuilder {
    tag: i32,
    args: [i32; 3],
    text: Bytes,
    payload: Bytes,
}

impl FrameBuilder {
    /// Start a frame with the given tag
    pub fn new(tag: i32) -> Self {
        Self {
            tag,
            ..Default::default()
        }
    }

    /// Start a frame that mirrors an already decoded record
    pub fn from_record(record: &MessageRecord, encoding: TextEncoding) -> Self {
        let mut text = BytesMut::with_capacity(record.text().len());
        encoding.encode_into(record.text(), &mut text);

        Self {
            tag: record.tag,
            args: [record.arg0, record.arg1, record.arg2],
            text: text.freeze(),
            payload: Bytes::copy_from_slice(record.payload()),
        }
    }

    /// Set all three integer arguments
    pub fn args(mut self, arg0: i32, arg1: i32, arg2: i32) -> Self {
        self.args = [arg0, arg1, arg2];
        self
    }

    /// Set `arg0`
    pub fn arg0(mut self, value: i32) -> Self {
        self.args[0] = value;
        self
    }

    /// Set `arg1`
    pub fn arg1(mut self, value: i32) -> Self {
        self.args[1] = value;
        self
    }

    /// Set `arg2`
    pub fn arg2(mut self, value: i32) -> Self {
        self.args[2] = value;
        self
    }

    /// Set the raw text bytes
    pub fn text(mut self, text: impl AsRef<[u8]>) -> Self {
        self.text = Bytes::copy_from_slice(text.as_ref());
        self
    }

    /// Set the payload bytes
    pub fn payload(mut self, payload: impl AsRef<[u8]>) -> Self {
        self.payload = Bytes::copy_from_slice(payload.as_ref());
        self
    }

    /// Size of the encoded frame in bytes
    pub fn encoded_len(&self) -> usize {
        MIN_FRAME_SIZE + self.text.len() + self.payload.len()
    }

    /// Append the encoded frame to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_i32_le(self.tag);
        for arg in self.args {
            buf.put_i32_le(arg);
        }
        buf.put_i32_le(self.text.len() as i32);
        buf.put_slice(&self.text);
        buf.put_i32_le(self.payload.len() as i32);
        buf.put_slice(&self.payload);
    }

    /// Encode the frame into a new buffer
    pub fn build(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }
}
