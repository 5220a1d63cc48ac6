//! Scripted event source
//!
//! Replays queued frames in order, one per fill, the way the native engine
//! drains its internal queue. Used by the tests and the replay tool.

use std::collections::VecDeque;

use bytes::Bytes;

use rtcbridge_wire_core::FrameBuilder;

use crate::poll::{EventSource, Fill};

/// An [`EventSource`] backed by an in-memory queue
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    queue: VecDeque<Bytes>,
    fill_calls: usize,
    polling_enabled: bool,
    enable_polling_calls: usize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue encoded frame bytes
    pub fn push(&mut self, frame: Bytes) -> &mut Self {
        self.queue.push_back(frame);
        self
    }

    /// Queue a frame built with [`FrameBuilder`]
    pub fn push_frame(&mut self, frame: FrameBuilder) -> &mut Self {
        self.push(frame.build())
    }

    /// Queue arbitrary bytes, valid frame or not
    pub fn push_raw(&mut self, bytes: impl Into<Bytes>) -> &mut Self {
        self.push(bytes.into())
    }

    /// Frames not yet delivered
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn fill_calls(&self) -> usize {
        self.fill_calls
    }

    pub fn polling_enabled(&self) -> bool {
        self.polling_enabled
    }

    pub fn enable_polling_calls(&self) -> usize {
        self.enable_polling_calls
    }
}

impl EventSource for ScriptedEngine {
    fn fill(&mut self, buf: &mut [u8]) -> Fill {
        self.fill_calls += 1;
        let Some(frame) = self.queue.pop_front() else {
            return Fill::empty();
        };

        // Frames longer than the buffer are cut, as the engine would
        let written = frame.len().min(buf.len());
        buf[..written].copy_from_slice(&frame[..written]);
        Fill::message(i32::try_from(self.queue.len()).unwrap_or(i32::MAX), written)
    }

    fn enable_polling(&mut self) -> i32 {
        self.polling_enabled = true;
        self.enable_polling_calls += 1;
        0
    }
}
