//! Game Loop Example
//!
//! This example shows how a host drives the engine from its own frame loop:
//! one poll per tick, handlers registered up front, stats read at the end.
//! A scripted source stands in for the native engine.
//!
//! Run with: cargo run --example game_loop

use rtcbridge_client_core::{
    init_logging, AudioVolumeInfo, EngineConfig, EngineFactory, FrameBuilder, ScriptedEngine,
};
use rtcbridge_wire_core::encode_volume_list;

fn scripted_session() -> ScriptedEngine {
    let mut speakers = bytes::BytesMut::new();
    encode_volume_list(
        &[
            AudioVolumeInfo { uid: 7, volume: 180 },
            AudioVolumeInfo { uid: 9, volume: 40 },
        ],
        &mut speakers,
    );

    let mut source = ScriptedEngine::new();
    source
        .push_frame(FrameBuilder::new(13001).args(1, 7, 420).text("arena-3"))
        .push_frame(FrameBuilder::new(13013).args(9, 610, 0))
        .push_frame(FrameBuilder::new(14001).arg0(220).payload(&speakers))
        .push_frame(FrameBuilder::new(13014).args(9, 1, 0))
        .push_frame(FrameBuilder::new(13008).args(9, 0, 0))
        .push_frame(FrameBuilder::new(14008));
    source
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info");

    println!("RTC Bridge Game Loop Example");
    println!("============================\n");

    let mut factory = EngineFactory::new(EngineConfig::default());
    let engine = factory.get_or_create("example-app", scripted_session)?;

    let handlers = engine.handlers_mut();
    handlers.on_join_channel_success(|channel, uid, elapsed| {
        println!("joined {} as {} after {} ms", channel, uid, elapsed);
    });
    handlers.on_user_joined(|uid, _| println!("user {} joined", uid));
    handlers.on_user_muted(|uid, muted| {
        println!("user {} {}", uid, if muted { "muted" } else { "unmuted" });
    });
    handlers.on_user_offline(|uid, reason| println!("user {} left ({:?})", uid, reason));
    handlers.on_volume_indication(|speakers, total| {
        println!("{} speakers, total volume {}", speakers.len(), total);
    });
    handlers.on_connection_lost(|| println!("connection lost"));

    // A real host would poll once per rendered frame
    for _ in 0..10 {
        engine.poll();
    }

    println!("\n{:#?}", engine.stats());
    Ok(())
}
