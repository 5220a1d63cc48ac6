//! Handler registration and event dispatch
//!
//! A [`HandlerTable`] holds at most one handler per [`EventKind`]. The
//! [`Dispatcher`] classifies each decoded record and invokes the matching
//! handler synchronously, on the thread that polls.

use std::fmt;

use tracing::{trace, warn};

use rtcbridge_wire_core::{AudioVolumeInfo, MessageRecord, RtcStats, WireError};

use crate::events::{
    classify, AudioRoute, Classified, EngineEvent, EventKind, EventTag, UserOfflineReason,
};

/// Callback invoked for a delivered event
pub type EventHandler = Box<dyn FnMut(&EngineEvent<'_>) + Send>;

/// One optional handler per event kind
pub struct HandlerTable {
    slots: [Option<EventHandler>; EventKind::COUNT],
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<EventKind> = EventKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.is_registered(*kind))
            .collect();
        f.debug_struct("HandlerTable")
            .field("registered", &registered)
            .finish()
    }
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning the one it replaces
    pub fn register<F>(&mut self, kind: EventKind, handler: F) -> Option<EventHandler>
    where
        F: FnMut(&EngineEvent<'_>) + Send + 'static,
    {
        self.slots[kind.index()].replace(Box::new(handler))
    }

    /// Remove the handler for `kind`
    pub fn unregister(&mut self, kind: EventKind) -> Option<EventHandler> {
        self.slots[kind.index()].take()
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every handler
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// Invoke the handler for the event's kind, returning whether one ran
    pub fn invoke(&mut self, event: &EngineEvent<'_>) -> bool {
        match &mut self.slots[event.kind().index()] {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    pub fn on_error<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(i32, &str) + Send + 'static,
    {
        self.register(EventKind::Error, move |event| {
            if let EngineEvent::Error { code, message } = event {
                handler(*code, message);
            }
        })
    }

    pub fn on_warning<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(i32, &str) + Send + 'static,
    {
        self.register(EventKind::Warning, move |event| {
            if let EngineEvent::Warning { code, message } = event {
                handler(*code, message);
            }
        })
    }

    pub fn on_audio_mixing_finished<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut() + Send + 'static,
    {
        self.register(EventKind::AudioMixingFinished, move |_| handler())
    }

    pub fn on_audio_route_changed<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(AudioRoute) + Send + 'static,
    {
        self.register(EventKind::AudioRouteChanged, move |event| {
            if let EngineEvent::AudioRouteChanged { route } = event {
                handler(*route);
            }
        })
    }

    pub fn on_request_channel_key<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut() + Send + 'static,
    {
        self.register(EventKind::RequestChannelKey, move |_| handler())
    }

    /// Handler receives channel, uid and elapsed milliseconds
    pub fn on_join_channel_success<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(&str, u32, i32) + Send + 'static,
    {
        self.register(EventKind::JoinChannelSuccess, move |event| {
            if let EngineEvent::JoinChannelSuccess {
                channel,
                uid,
                elapsed,
            } = event
            {
                handler(channel, *uid, *elapsed);
            }
        })
    }

    /// Handler receives channel, uid and elapsed milliseconds
    pub fn on_rejoin_channel_success<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(&str, u32, i32) + Send + 'static,
    {
        self.register(EventKind::RejoinChannelSuccess, move |event| {
            if let EngineEvent::RejoinChannelSuccess {
                channel,
                uid,
                elapsed,
            } = event
            {
                handler(channel, *uid, *elapsed);
            }
        })
    }

    pub fn on_leave_channel<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(&RtcStats) + Send + 'static,
    {
        self.register(EventKind::LeaveChannel, move |event| {
            if let EngineEvent::LeaveChannel { stats } = event {
                handler(stats);
            }
        })
    }

    pub fn on_user_offline<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(u32, UserOfflineReason) + Send + 'static,
    {
        self.register(EventKind::UserOffline, move |event| {
            if let EngineEvent::UserOffline { uid, reason } = event {
                handler(*uid, *reason);
            }
        })
    }

    pub fn on_rtc_stats<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(&RtcStats) + Send + 'static,
    {
        self.register(EventKind::RtcStats, move |event| {
            if let EngineEvent::RtcStats { stats } = event {
                handler(stats);
            }
        })
    }

    /// Handler receives uid and elapsed milliseconds
    pub fn on_user_joined<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(u32, i32) + Send + 'static,
    {
        self.register(EventKind::UserJoined, move |event| {
            if let EngineEvent::UserJoined { uid, elapsed } = event {
                handler(*uid, *elapsed);
            }
        })
    }

    pub fn on_user_muted<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(u32, bool) + Send + 'static,
    {
        self.register(EventKind::UserMuted, move |event| {
            if let EngineEvent::UserMuted { uid, muted } = event {
                handler(*uid, *muted);
            }
        })
    }

    /// Handler receives the speaker list and the total volume
    pub fn on_volume_indication<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut(&[AudioVolumeInfo], i32) + Send + 'static,
    {
        self.register(EventKind::VolumeIndication, move |event| {
            if let EngineEvent::VolumeIndication {
                speakers,
                total_volume,
            } = event
            {
                handler(speakers, *total_volume);
            }
        })
    }

    pub fn on_connection_lost<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut() + Send + 'static,
    {
        self.register(EventKind::ConnectionLost, move |_| handler())
    }

    pub fn on_connection_interrupted<F>(&mut self, mut handler: F) -> Option<EventHandler>
    where
        F: FnMut() + Send + 'static,
    {
        self.register(EventKind::ConnectionInterrupted, move |_| handler())
    }
}

/// What happened to one decoded record
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A handler ran
    Delivered(EventKind),
    /// The event was recognised but no handler is registered
    NoHandler(EventKind),
    /// A known tag whose fields carried nothing to deliver
    Suppressed(EventTag),
    /// A tag this build does not know
    Unknown(i32),
    /// The frame decoded but its payload did not fit the tag's layout
    PayloadRejected { tag: i32, error: WireError },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Classifies records and routes them to handlers
#[derive(Debug, Default)]
pub struct Dispatcher {
    handlers: HandlerTable,
    speakers: Vec<AudioVolumeInfo>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerTable {
        &mut self.handlers
    }

    /// Dispatch one record
    pub fn dispatch(&mut self, record: &MessageRecord) -> DispatchOutcome {
        match classify(record, &mut self.speakers) {
            Ok(Classified::Event(event)) => {
                let kind = event.kind();
                if self.handlers.invoke(&event) {
                    DispatchOutcome::Delivered(kind)
                } else {
                    trace!("No handler registered for {}", kind);
                    DispatchOutcome::NoHandler(kind)
                }
            }
            Ok(Classified::Suppressed(tag)) => {
                trace!(tag = tag.code(), arg0 = record.arg0, "Event suppressed");
                DispatchOutcome::Suppressed(tag)
            }
            Ok(Classified::Unknown(tag)) => {
                trace!(tag, "Ignoring unknown event tag");
                DispatchOutcome::Unknown(tag)
            }
            Err(error) => {
                warn!(tag = record.tag, "Rejected event payload: {}", error);
                DispatchOutcome::PayloadRejected {
                    tag: record.tag,
                    error,
                }
            }
        }
    }
}
