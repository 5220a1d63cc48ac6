//! End-to-end tests: scripted engine -> poll driver -> decoder -> dispatcher

use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use rtcbridge_client_core::{
    AudioRoute, AudioVolumeInfo, DispatchOutcome, EngineConfig, EventKind, FrameBuilder,
    PollDriver, PollOutcome, RtcStats, ScriptedEngine, TextEncoding,
};
use rtcbridge_wire_core::{encode_volume_list, StatsVariant};
use tracing::debug;

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn driver_with(frames: Vec<FrameBuilder>) -> PollDriver<ScriptedEngine> {
    let mut engine = ScriptedEngine::new();
    for frame in frames {
        engine.push_frame(frame);
    }
    PollDriver::new(engine, &EngineConfig::default().with_frame_logging(true))
}

fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Arc<Mutex<Vec<T>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    (Arc::clone(&calls), calls)
}

#[test]
fn test_join_and_rejoin_share_field_mapping() {
    init_test_logging();

    let (joins, sink) = recorder();
    let (rejoins, rejoin_sink) = recorder();
    let mut driver = driver_with(vec![
        FrameBuilder::new(13001).args(1, 1001, 350).text("lobby"),
        FrameBuilder::new(13001).args(0, 1001, 350).text("lobby"),
    ]);
    driver
        .handlers_mut()
        .on_join_channel_success(move |channel, uid, elapsed| {
            sink.lock().unwrap().push((channel.to_string(), uid, elapsed));
        });
    driver
        .handlers_mut()
        .on_rejoin_channel_success(move |channel, uid, elapsed| {
            rejoin_sink
                .lock()
                .unwrap()
                .push((channel.to_string(), uid, elapsed));
        });

    driver.poll_once();
    driver.poll_once();

    let expected = vec![("lobby".to_string(), 1001, 350)];
    assert_eq!(*joins.lock().unwrap(), expected);
    assert_eq!(*rejoins.lock().unwrap(), expected);
}

#[test]
fn test_media_engine_sub_codes() {
    init_test_logging();

    let (mixing, mixing_sink) = recorder();
    let (routes, route_sink) = recorder();
    let mut driver = driver_with(vec![
        FrameBuilder::new(1104).arg0(10),
        FrameBuilder::new(1104).arg0(102),
        FrameBuilder::new(1104).arg0(50),
    ]);
    driver
        .handlers_mut()
        .on_audio_mixing_finished(move || mixing_sink.lock().unwrap().push(()));
    driver
        .handlers_mut()
        .on_audio_route_changed(move |route| route_sink.lock().unwrap().push(route));

    assert_eq!(
        driver.poll_once(),
        PollOutcome::Dispatched(DispatchOutcome::Delivered(EventKind::AudioMixingFinished))
    );
    assert_eq!(
        driver.poll_once(),
        PollOutcome::Dispatched(DispatchOutcome::Delivered(EventKind::AudioRouteChanged))
    );
    assert!(matches!(
        driver.poll_once(),
        PollOutcome::Dispatched(DispatchOutcome::Suppressed(_))
    ));

    assert_eq!(mixing.lock().unwrap().len(), 1);
    let routes = routes.lock().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].code(), 2);
    assert_eq!(routes[0], AudioRoute::HeadsetNoMic);
}

#[test]
fn test_stats_variants() {
    init_test_logging();

    let full = RtcStats {
        duration: 60_000,
        tx_bytes: 1_200_000,
        rx_bytes: 1_100_000,
        tx_kbit_rate: 48,
        rx_kbit_rate: 46,
        tx_audio_kbit_rate: 32,
        rx_audio_kbit_rate: 30,
        users: 4,
        ..Default::default()
    };

    // Session-end layout plus four trailing bytes the decoder must ignore
    let mut session_end = BytesMut::new();
    full.encode_into(StatsVariant::SessionEnd, &mut session_end);
    session_end.extend_from_slice(&[0xEE; 4]);
    assert_eq!(session_end.len(), 20);

    let mut periodic = BytesMut::new();
    full.encode_into(StatsVariant::Periodic, &mut periodic);
    assert_eq!(periodic.len(), 24);

    let (left, left_sink) = recorder();
    let (ticks, tick_sink) = recorder();
    let mut driver = driver_with(vec![
        FrameBuilder::new(13010).payload(&periodic),
        FrameBuilder::new(13006).payload(&session_end),
    ]);
    driver
        .handlers_mut()
        .on_leave_channel(move |stats| left_sink.lock().unwrap().push(*stats));
    driver
        .handlers_mut()
        .on_rtc_stats(move |stats| tick_sink.lock().unwrap().push(*stats));

    assert_eq!(driver.drain(8), 2);

    assert_eq!(*ticks.lock().unwrap(), vec![full]);

    let left = left.lock().unwrap();
    assert_eq!(left.len(), 1);
    let stats = left[0];
    assert_eq!(stats.duration, 60_000);
    assert_eq!(stats.tx_bytes, 1_200_000);
    assert_eq!(stats.rx_bytes, 1_100_000);
    assert_eq!(stats.tx_kbit_rate, 48);
    assert_eq!(stats.rx_kbit_rate, 46);
    assert_eq!(stats.tx_audio_kbit_rate, 0);
    assert_eq!(stats.rx_audio_kbit_rate, 0);
    assert_eq!(stats.users, 0);
}

#[test]
fn test_empty_stats_payload_is_suppressed() {
    let mut driver = driver_with(vec![FrameBuilder::new(13006), FrameBuilder::new(13010)]);
    driver.handlers_mut().on_leave_channel(|_| panic!("no payload, no event"));
    driver.handlers_mut().on_rtc_stats(|_| panic!("no payload, no event"));

    driver.drain(4);
    assert_eq!(driver.stats().events_suppressed, 2);
    assert_eq!(driver.stats().events_delivered, 0);
}

#[test]
fn test_volume_list_sizing() {
    init_test_logging();

    let entries = [
        AudioVolumeInfo {
            uid: 11,
            volume: 200,
        },
        AudioVolumeInfo { uid: 22, volume: 5 },
    ];
    let mut payload = BytesMut::new();
    encode_volume_list(&entries, &mut payload);
    assert_eq!(payload.len(), 16);

    let (calls, sink) = recorder();
    let mut driver = driver_with(vec![
        FrameBuilder::new(14001).arg0(75),
        FrameBuilder::new(14001).arg0(205).payload(&payload),
    ]);
    driver
        .handlers_mut()
        .on_volume_indication(move |speakers, total| {
            sink.lock().unwrap().push((speakers.to_vec(), total));
        });

    driver.drain(4);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], (Vec::new(), 75));
    assert_eq!(calls[1], (entries.to_vec(), 205));
}

#[test]
fn test_unknown_tag_is_ignored() {
    let hits = Arc::new(Mutex::new(0));
    let mut driver = driver_with(vec![FrameBuilder::new(31337).args(1, 2, 3).text("??")]);
    for kind in EventKind::ALL {
        let hits = Arc::clone(&hits);
        driver
            .handlers_mut()
            .register(kind, move |_| *hits.lock().unwrap() += 1);
    }

    assert_eq!(
        driver.poll_once(),
        PollOutcome::Dispatched(DispatchOutcome::Unknown(31337))
    );
    assert_eq!(*hits.lock().unwrap(), 0);
    assert_eq!(driver.stats().unknown_tags, 1);
}

#[test]
fn test_no_message_tick_decodes_nothing() {
    let mut driver = driver_with(Vec::new());
    driver.handlers_mut().on_error(|_, _| panic!("nothing queued"));

    for _ in 0..3 {
        assert_eq!(driver.poll_once(), PollOutcome::Idle);
    }

    let stats = driver.stats();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.idle_ticks, 3);
    assert_eq!(stats.frames_decoded, 0);
    assert_eq!(stats.decode_failures, 0);
    assert_eq!(stats.last_queue_depth, -1);
    assert_eq!(driver.source().fill_calls(), 3);
}

#[test]
fn test_malformed_frame_costs_one_tick() {
    init_test_logging();

    let mut engine = ScriptedEngine::new();
    // Declares a 500-byte text field but stops after the header
    let mut truncated = FrameBuilder::new(101).text(vec![b'x'; 500]).build().to_vec();
    truncated.truncate(40);
    engine.push_raw(truncated);
    engine.push_frame(FrameBuilder::new(102).arg0(3).text("low bandwidth"));

    let (warnings, sink) = recorder();
    let mut driver = PollDriver::new(engine, &EngineConfig::default());
    driver
        .handlers_mut()
        .on_warning(move |code, message| sink.lock().unwrap().push((code, message.to_string())));

    let outcome = driver.poll_once();
    debug!(?outcome, "First tick");
    assert!(matches!(outcome, PollOutcome::DecodeFailed(_)));
    driver.poll_once();

    assert_eq!(
        *warnings.lock().unwrap(),
        vec![(3, "low bandwidth".to_string())]
    );
    assert_eq!(driver.stats().decode_failures, 1);
    assert_eq!(driver.stats().events_delivered, 1);
}

#[test]
fn test_text_encodings() {
    // "Zürich" in Latin-1
    let latin1 = vec![0x5A, 0xFC, 0x72, 0x69, 0x63, 0x68];
    let frame = || FrameBuilder::new(13001).args(1, 5, 0).text(latin1.clone());

    let (channels, sink) = recorder();
    let mut driver = driver_with(vec![frame()]);
    driver
        .handlers_mut()
        .on_join_channel_success(move |channel, _, _| sink.lock().unwrap().push(channel.to_string()));
    driver.poll_once();
    assert_eq!(*channels.lock().unwrap(), vec!["Zürich".to_string()]);

    let mut engine = ScriptedEngine::new();
    engine.push_frame(frame());
    let config = EngineConfig::default().with_text_encoding(TextEncoding::Utf8Lossy);
    let (channels, sink) = recorder();
    let mut driver = PollDriver::new(engine, &config);
    driver
        .handlers_mut()
        .on_join_channel_success(move |channel, _, _| sink.lock().unwrap().push(channel.to_string()));
    driver.poll_once();
    assert_eq!(*channels.lock().unwrap(), vec!["Z\u{FFFD}rich".to_string()]);
}

#[test]
fn test_uid_reinterpreted_as_unsigned() {
    let (calls, sink) = recorder();
    let mut driver = driver_with(vec![FrameBuilder::new(13014).args(-2, 1, 0)]);
    driver
        .handlers_mut()
        .on_user_muted(move |uid, muted| sink.lock().unwrap().push((uid, muted)));
    driver.poll_once();
    assert_eq!(*calls.lock().unwrap(), vec![(u32::MAX - 1, true)]);
}

proptest::proptest! {
    #[test]
    fn prop_arbitrary_frames_never_panic(
        frames in proptest::collection::vec(proptest::collection::vec(proptest::prelude::any::<u8>(), 0..96), 0..8),
    ) {
        let mut engine = ScriptedEngine::new();
        for frame in &frames {
            engine.push_raw(frame.clone());
        }
        let mut driver = PollDriver::new(engine, &EngineConfig::default().with_payload_capacity(32));
        for kind in EventKind::ALL {
            driver.handlers_mut().register(kind, |_| {});
        }

        for _ in 0..frames.len() + 1 {
            driver.poll_once();
        }

        let stats = *driver.stats();
        proptest::prop_assert_eq!(stats.ticks, frames.len() as u64 + 1);
        proptest::prop_assert_eq!(
            stats.frames_decoded + stats.decode_failures + stats.idle_ticks,
            stats.ticks
        );
    }
}

/// Reports a queued frame but writes nothing into the buffer
struct EmptyWriteEngine;

impl rtcbridge_client_core::EventSource for EmptyWriteEngine {
    fn fill(&mut self, _buf: &mut [u8]) -> rtcbridge_client_core::Fill {
        rtcbridge_client_core::Fill::message(0, 0)
    }
}

#[test]
fn test_reported_frame_with_no_bytes_reaches_decoder() {
    let mut driver = PollDriver::new(EmptyWriteEngine, &EngineConfig::default());

    match driver.poll_once() {
        PollOutcome::DecodeFailed(rtcbridge_client_core::WireError::TruncatedHeader {
            field,
            available,
            ..
        }) => {
            assert_eq!(field, "tag");
            assert_eq!(available, 0);
        }
        other => panic!("expected a header truncation, got {:?}", other),
    }
    assert_eq!(driver.stats().idle_ticks, 0);
    assert_eq!(driver.stats().decode_failures, 1);
}
