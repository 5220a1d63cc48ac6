//! Engine event classification
//!
//! This module owns the contract between decoded frames and handlers: the
//! closed set of wire tags the native engine emits, the handler-facing event
//! kinds they map to, and [`classify`], which turns a [`MessageRecord`] into a
//! typed [`EngineEvent`].
//!
//! # Tag table
//!
//! | tag   | event                 | fields                                        |
//! |-------|-----------------------|-----------------------------------------------|
//! | 101   | error                 | arg0 = code, text = message                   |
//! | 102   | warning               | arg0 = code, text = message                   |
//! | 1104  | media engine          | arg0 = sub-code (mixing finished / route)     |
//! | 1108  | request channel key   | -                                             |
//! | 13001 | join / rejoin success | arg0 > 0 selects join; text, arg1, arg2       |
//! | 13006 | leave channel         | payload = session-end stats                   |
//! | 13008 | user offline          | arg0 = uid, arg1 = reason                     |
//! | 13010 | rtc stats             | payload = periodic stats                      |
//! | 13013 | user joined           | arg0 = uid, arg1 = elapsed                    |
//! | 13014 | user muted            | arg0 = uid, arg1 > 0 = muted                  |
//! | 14001 | volume indication     | arg0 = total volume, payload = speaker list   |
//! | 14008 | connection lost       | -                                             |
//! | 14010 | connection interrupted| -                                             |

use serde::{Deserialize, Serialize};
use std::fmt;

use rtcbridge_wire_core::{
    decode_volume_list_into, AudioVolumeInfo, MessageRecord, RtcStats, StatsVariant, WireError,
};

/// Media engine sub-code reporting that audio mixing finished
pub const AUDIO_MIXING_FINISHED_CODE: i32 = 10;

/// Offset added to an audio route before it is sent as a media engine sub-code
pub const AUDIO_ROUTE_CODE_OFFSET: i32 = 100;

/// Numeric event codes written by the native engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum EventTag {
    Error = 101,
    Warning = 102,
    MediaEngine = 1104,
    RequestChannelKey = 1108,
    ChannelJoinResult = 13001,
    LeaveChannel = 13006,
    UserOffline = 13008,
    RtcStats = 13010,
    UserJoined = 13013,
    UserMuteAudio = 13014,
    AudioVolumeIndication = 14001,
    ConnectionLost = 14008,
    ConnectionInterrupted = 14010,
}

impl EventTag {
    /// Every tag the engine is known to emit
    pub const ALL: [EventTag; 13] = [
        EventTag::Error,
        EventTag::Warning,
        EventTag::MediaEngine,
        EventTag::RequestChannelKey,
        EventTag::ChannelJoinResult,
        EventTag::LeaveChannel,
        EventTag::UserOffline,
        EventTag::RtcStats,
        EventTag::UserJoined,
        EventTag::UserMuteAudio,
        EventTag::AudioVolumeIndication,
        EventTag::ConnectionLost,
        EventTag::ConnectionInterrupted,
    ];

    /// Look up a wire code, `None` for codes this build does not know
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| tag.code() == code)
    }

    /// The wire code
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for EventTag {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, i32> {
        Self::from_code(code).ok_or(code)
    }
}

/// Handler slots, one per logical event
///
/// Two wire tags fan out to more than one kind: 13001 (join or rejoin) and
/// 1104 (mixing finished or route changed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Error,
    Warning,
    AudioMixingFinished,
    AudioRouteChanged,
    RequestChannelKey,
    JoinChannelSuccess,
    RejoinChannelSuccess,
    LeaveChannel,
    UserOffline,
    RtcStats,
    UserJoined,
    UserMuted,
    VolumeIndication,
    ConnectionLost,
    ConnectionInterrupted,
}

impl EventKind {
    /// Number of handler slots
    pub const COUNT: usize = 15;

    /// Every kind, in slot order
    pub const ALL: [EventKind; Self::COUNT] = [
        EventKind::Error,
        EventKind::Warning,
        EventKind::AudioMixingFinished,
        EventKind::AudioRouteChanged,
        EventKind::RequestChannelKey,
        EventKind::JoinChannelSuccess,
        EventKind::RejoinChannelSuccess,
        EventKind::LeaveChannel,
        EventKind::UserOffline,
        EventKind::RtcStats,
        EventKind::UserJoined,
        EventKind::UserMuted,
        EventKind::VolumeIndication,
        EventKind::ConnectionLost,
        EventKind::ConnectionInterrupted,
    ];

    /// Slot index in the handler table
    pub fn index(self) -> usize {
        self as usize
    }

    /// The wire tag that carries this kind
    pub fn tag(self) -> EventTag {
        match self {
            Self::Error => EventTag::Error,
            Self::Warning => EventTag::Warning,
            Self::AudioMixingFinished | Self::AudioRouteChanged => EventTag::MediaEngine,
            Self::RequestChannelKey => EventTag::RequestChannelKey,
            Self::JoinChannelSuccess | Self::RejoinChannelSuccess => EventTag::ChannelJoinResult,
            Self::LeaveChannel => EventTag::LeaveChannel,
            Self::UserOffline => EventTag::UserOffline,
            Self::RtcStats => EventTag::RtcStats,
            Self::UserJoined => EventTag::UserJoined,
            Self::UserMuted => EventTag::UserMuteAudio,
            Self::VolumeIndication => EventTag::AudioVolumeIndication,
            Self::ConnectionLost => EventTag::ConnectionLost,
            Self::ConnectionInterrupted => EventTag::ConnectionInterrupted,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Audio output route reported by the media engine
///
/// Covers the native SDK's full route range. `HeadsetNoMic` and
/// `Loudspeaker` are reported by the engine even though older host bindings
/// never named them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum AudioRoute {
    Default = -1,
    Headset = 0,
    Earpiece = 1,
    HeadsetNoMic = 2,
    Speakerphone = 3,
    Loudspeaker = 4,
    Bluetooth = 5,
}

impl AudioRoute {
    /// Map a route code in `[-1, 5]`
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Default),
            0 => Some(Self::Headset),
            1 => Some(Self::Earpiece),
            2 => Some(Self::HeadsetNoMic),
            3 => Some(Self::Speakerphone),
            4 => Some(Self::Loudspeaker),
            5 => Some(Self::Bluetooth),
            _ => None,
        }
    }

    /// The numeric route code
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Why a remote user left the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserOfflineReason {
    Quit,
    Dropped,
    BecomeAudience,
    /// A reason code this build does not know
    Other(i32),
}

impl UserOfflineReason {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Quit,
            1 => Self::Dropped,
            2 => Self::BecomeAudience,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Quit => 0,
            Self::Dropped => 1,
            Self::BecomeAudience => 2,
            Self::Other(code) => code,
        }
    }
}

/// A typed engine event, borrowing text and speaker data from the poll driver
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent<'a> {
    Error {
        code: i32,
        message: &'a str,
    },
    Warning {
        code: i32,
        message: &'a str,
    },
    AudioMixingFinished,
    AudioRouteChanged {
        route: AudioRoute,
    },
    RequestChannelKey,
    JoinChannelSuccess {
        channel: &'a str,
        uid: u32,
        elapsed: i32,
    },
    RejoinChannelSuccess {
        channel: &'a str,
        uid: u32,
        elapsed: i32,
    },
    LeaveChannel {
        stats: RtcStats,
    },
    UserOffline {
        uid: u32,
        reason: UserOfflineReason,
    },
    RtcStats {
        stats: RtcStats,
    },
    UserJoined {
        uid: u32,
        elapsed: i32,
    },
    UserMuted {
        uid: u32,
        muted: bool,
    },
    VolumeIndication {
        speakers: &'a [AudioVolumeInfo],
        total_volume: i32,
    },
    ConnectionLost,
    ConnectionInterrupted,
}

impl EngineEvent<'_> {
    /// The handler slot this event is delivered to
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Error { .. } => EventKind::Error,
            Self::Warning { .. } => EventKind::Warning,
            Self::AudioMixingFinished => EventKind::AudioMixingFinished,
            Self::AudioRouteChanged { .. } => EventKind::AudioRouteChanged,
            Self::RequestChannelKey => EventKind::RequestChannelKey,
            Self::JoinChannelSuccess { .. } => EventKind::JoinChannelSuccess,
            Self::RejoinChannelSuccess { .. } => EventKind::RejoinChannelSuccess,
            Self::LeaveChannel { .. } => EventKind::LeaveChannel,
            Self::UserOffline { .. } => EventKind::UserOffline,
            Self::RtcStats { .. } => EventKind::RtcStats,
            Self::UserJoined { .. } => EventKind::UserJoined,
            Self::UserMuted { .. } => EventKind::UserMuted,
            Self::VolumeIndication { .. } => EventKind::VolumeIndication,
            Self::ConnectionLost => EventKind::ConnectionLost,
            Self::ConnectionInterrupted => EventKind::ConnectionInterrupted,
        }
    }
}

/// Result of classifying one record
#[derive(Debug, Clone, PartialEq)]
pub enum Classified<'a> {
    /// The record maps to an event
    Event(EngineEvent<'a>),
    /// A known tag whose fields carry nothing to deliver
    Suppressed(EventTag),
    /// A tag this build does not know
    Unknown(i32),
}

/// Classify a decoded record
///
/// `speakers` is scratch space for the volume list; a volume indication
/// borrows its speakers from it. The only error is a stats payload shorter
/// than its layout.
pub fn classify<'a>(
    record: &'a MessageRecord,
    speakers: &'a mut Vec<AudioVolumeInfo>,
) -> Result<Classified<'a>, WireError> {
    let Some(tag) = EventTag::from_code(record.tag) else {
        return Ok(Classified::Unknown(record.tag));
    };

    let event = match tag {
        EventTag::Error => EngineEvent::Error {
            code: record.arg0,
            message: record.text(),
        },
        EventTag::Warning => EngineEvent::Warning {
            code: record.arg0,
            message: record.text(),
        },
        EventTag::MediaEngine => match media_engine_event(record.arg0) {
            Some(event) => event,
            None => return Ok(Classified::Suppressed(tag)),
        },
        EventTag::RequestChannelKey => EngineEvent::RequestChannelKey,
        EventTag::ChannelJoinResult => {
            let channel = record.text();
            let uid = record.arg1 as u32;
            let elapsed = record.arg2;
            if record.arg0 > 0 {
                EngineEvent::JoinChannelSuccess {
                    channel,
                    uid,
                    elapsed,
                }
            } else {
                EngineEvent::RejoinChannelSuccess {
                    channel,
                    uid,
                    elapsed,
                }
            }
        }
        EventTag::LeaveChannel => {
            if record.payload().is_empty() {
                return Ok(Classified::Suppressed(tag));
            }
            EngineEvent::LeaveChannel {
                stats: RtcStats::decode(StatsVariant::SessionEnd, record.payload())?,
            }
        }
        EventTag::UserOffline => EngineEvent::UserOffline {
            uid: record.arg0 as u32,
            reason: UserOfflineReason::from_code(record.arg1),
        },
        EventTag::RtcStats => {
            if record.payload().is_empty() {
                return Ok(Classified::Suppressed(tag));
            }
            EngineEvent::RtcStats {
                stats: RtcStats::decode(StatsVariant::Periodic, record.payload())?,
            }
        }
        EventTag::UserJoined => EngineEvent::UserJoined {
            uid: record.arg0 as u32,
            elapsed: record.arg1,
        },
        EventTag::UserMuteAudio => EngineEvent::UserMuted {
            uid: record.arg0 as u32,
            muted: record.arg1 > 0,
        },
        EventTag::AudioVolumeIndication => EngineEvent::VolumeIndication {
            speakers: fill_speakers(record.payload(), speakers),
            total_volume: record.arg0,
        },
        EventTag::ConnectionLost => EngineEvent::ConnectionLost,
        EventTag::ConnectionInterrupted => EngineEvent::ConnectionInterrupted,
    };

    Ok(Classified::Event(event))
}

/// Interpret a media engine sub-code
fn media_engine_event(sub_code: i32) -> Option<EngineEvent<'static>> {
    if sub_code == AUDIO_MIXING_FINISHED_CODE {
        return Some(EngineEvent::AudioMixingFinished);
    }
    let route = AudioRoute::from_code(sub_code.wrapping_sub(AUDIO_ROUTE_CODE_OFFSET))?;
    Some(EngineEvent::AudioRouteChanged { route })
}

fn fill_speakers<'a>(
    payload: &[u8],
    speakers: &'a mut Vec<AudioVolumeInfo>,
) -> &'a [AudioVolumeInfo] {
    decode_volume_list_into(payload, speakers);
    speakers
}
