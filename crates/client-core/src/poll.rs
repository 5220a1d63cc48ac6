//! Poll-driven event pump
//!
//! The native engine never calls back into the host. Instead the host offers
//! it a buffer once per tick and the engine writes at most one frame into it.
//! [`PollDriver`] owns that buffer, the reusable [`MessageRecord`] and the
//! [`Dispatcher`], so a steady-state tick does not allocate.

use serde::Serialize;
use tracing::{debug, trace, warn};

use rtcbridge_wire_core::{FrameDecoder, MessageRecord, WireError};

use crate::config::EngineConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher, HandlerTable};

/// What the engine reported for one fill request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Frames still queued after this one, or a negative value when the
    /// queue was empty
    pub remaining: i32,
    /// Bytes written into the buffer
    pub written: usize,
}

impl Fill {
    /// Nothing was queued
    pub fn empty() -> Self {
        Self {
            remaining: -1,
            written: 0,
        }
    }

    /// A frame of `written` bytes was delivered with `remaining` still queued
    pub fn message(remaining: i32, written: usize) -> Self {
        Self { remaining, written }
    }

    /// Whether the engine reported a frame this tick
    ///
    /// Only a negative `remaining` means nothing was delivered. A reported
    /// frame with zero bytes written still goes through the decoder and fails
    /// there.
    pub fn has_message(&self) -> bool {
        self.remaining >= 0
    }
}

/// Source of engine frames
///
/// Implemented by the native binding in production and by
/// [`ScriptedEngine`](crate::mock::ScriptedEngine) in tests.
pub trait EventSource: Send {
    /// Write at most one frame into `buf`
    fn fill(&mut self, buf: &mut [u8]) -> Fill;

    /// Switch the engine into host-polled delivery, returning its status code
    fn enable_polling(&mut self) -> i32 {
        0
    }
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn fill(&mut self, buf: &mut [u8]) -> Fill {
        (**self).fill(buf)
    }

    fn enable_polling(&mut self) -> i32 {
        (**self).enable_polling()
    }
}

/// Counters kept across ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub frames_decoded: u64,
    pub decode_failures: u64,
    pub events_delivered: u64,
    pub events_without_handler: u64,
    pub events_suppressed: u64,
    pub unknown_tags: u64,
    pub payload_rejections: u64,
    /// `remaining` reported by the most recent fill
    pub last_queue_depth: i32,
}

impl PollStats {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Delivered(_) => self.events_delivered += 1,
            DispatchOutcome::NoHandler(_) => self.events_without_handler += 1,
            DispatchOutcome::Suppressed(_) => self.events_suppressed += 1,
            DispatchOutcome::Unknown(_) => self.unknown_tags += 1,
            DispatchOutcome::PayloadRejected { .. } => self.payload_rejections += 1,
        }
    }
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The engine had nothing queued
    Idle,
    /// A frame was decoded and dispatched
    Dispatched(DispatchOutcome),
    /// The buffer did not hold a valid frame
    DecodeFailed(WireError),
}

/// Drives one [`EventSource`]
pub struct PollDriver<S> {
    source: S,
    decoder: FrameDecoder,
    buffer: Box<[u8]>,
    record: MessageRecord,
    dispatcher: Dispatcher,
    stats: PollStats,
    log_frames: bool,
}

impl<S: EventSource> PollDriver<S> {
    /// Create a driver sized by `config`
    pub fn new(source: S, config: &EngineConfig) -> Self {
        Self {
            source,
            decoder: FrameDecoder::new(config.text_encoding),
            buffer: vec![0u8; config.buffer_size].into_boxed_slice(),
            record: MessageRecord::with_capacity(config.payload_capacity),
            dispatcher: Dispatcher::new(),
            stats: PollStats::default(),
            log_frames: config.log_frames,
        }
    }

    /// Pull at most one frame from the source and dispatch it
    ///
    /// Decode failures are logged and counted, never returned as errors: a
    /// malformed frame costs one tick and nothing else.
    pub fn poll_once(&mut self) -> PollOutcome {
        self.stats.ticks += 1;

        let fill = self.source.fill(&mut self.buffer);
        self.stats.last_queue_depth = fill.remaining;
        if !fill.has_message() {
            self.stats.idle_ticks += 1;
            self.record.clear();
            return PollOutcome::Idle;
        }

        let record = match self
            .decoder
            .decode(&self.buffer, fill.written, &mut self.record)
        {
            Ok(record) => record,
            Err(err) => {
                self.stats.decode_failures += 1;
                warn!(written = fill.written, "Failed to decode engine frame: {}", err);
                return PollOutcome::DecodeFailed(err);
            }
        };

        self.stats.frames_decoded += 1;
        if self.log_frames {
            debug!(
                tag = record.tag,
                arg0 = record.arg0,
                arg1 = record.arg1,
                arg2 = record.arg2,
                text = record.text(),
                payload_len = record.payload().len(),
                remaining = fill.remaining,
                "Engine frame"
            );
        }

        let outcome = self.dispatcher.dispatch(record);
        self.stats.record(&outcome);
        trace!(?outcome, "Dispatched engine frame");
        PollOutcome::Dispatched(outcome)
    }

    /// Poll until the source reports an empty queue, at most `max_ticks` times
    ///
    /// Returns the number of frames pulled, including ones that failed to
    /// decode.
    pub fn drain(&mut self, max_ticks: usize) -> usize {
        let mut frames = 0;
        for _ in 0..max_ticks {
            match self.poll_once() {
                PollOutcome::Idle => break,
                _ => frames += 1,
            }
            if self.stats.last_queue_depth <= 0 {
                break;
            }
        }
        frames
    }

    pub fn handlers(&self) -> &HandlerTable {
        self.dispatcher.handlers()
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerTable {
        self.dispatcher.handlers_mut()
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = PollStats::default();
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// The record decoded by the most recent tick, empty after an idle or
    /// failed tick
    pub fn last_record(&self) -> &MessageRecord {
        &self.record
    }
}

impl<S> std::fmt::Debug for PollDriver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollDriver")
            .field("buffer_size", &self.buffer.len())
            .field("record", &self.record)
            .field("handlers", self.dispatcher.handlers())
            .field("stats", &self.stats)
            .finish()
    }
}
