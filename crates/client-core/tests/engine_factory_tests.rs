//! Engine lifecycle tests

use std::sync::{Arc, Mutex};

use rtcbridge_client_core::{
    ClientError, EngineConfig, EngineFactory, EventSource, Fill, FrameBuilder, ScriptedEngine,
};

#[test]
fn test_factory_builds_exactly_one_engine() {
    let mut factory = EngineFactory::new(EngineConfig::default());
    assert!(!factory.is_created());

    let mut constructed = 0;
    factory
        .get_or_create("app-one", || {
            constructed += 1;
            ScriptedEngine::new()
        })
        .unwrap();
    let engine = factory
        .get_or_create("app-one", || {
            constructed += 1;
            ScriptedEngine::new()
        })
        .unwrap();

    assert_eq!(engine.driver().source().enable_polling_calls(), 1);
    assert_eq!(constructed, 1);
    assert!(factory.is_created());
}

#[test]
fn test_differing_app_id_returns_existing_engine() {
    let mut factory = EngineFactory::new(EngineConfig::default());
    factory
        .get_or_create("first", ScriptedEngine::new)
        .unwrap();

    let engine = factory
        .get_or_create("second", || panic!("must not build a second source"))
        .unwrap();
    assert_eq!(engine.app_id(), "first");
}

#[test]
fn test_destroy_releases_engine() {
    let mut factory = EngineFactory::new(EngineConfig::default());
    factory.get_or_create("app", ScriptedEngine::new).unwrap();

    let engine = factory.destroy().expect("engine was created");
    assert_eq!(engine.app_id(), "app");
    assert!(factory.get().is_none());
    assert!(factory.destroy().is_none());

    let engine = factory.get_or_create("next", ScriptedEngine::new).unwrap();
    assert_eq!(engine.app_id(), "next");
}

#[test]
fn test_invalid_config_leaves_factory_empty() {
    let mut factory = EngineFactory::new(EngineConfig::new().with_buffer_size(8));
    let err = factory
        .get_or_create("app", ScriptedEngine::new)
        .unwrap_err();
    assert!(matches!(err, ClientError::Configuration { .. }));
    assert!(!factory.is_created());
}

#[test]
fn test_engine_polls_through_factory_handle() {
    let mut factory = EngineFactory::new(EngineConfig::default());
    let engine = factory
        .get_or_create("app", || {
            let mut source = ScriptedEngine::new();
            source.push_frame(FrameBuilder::new(1108));
            source
        })
        .unwrap();

    let requested = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&requested);
    engine
        .handlers_mut()
        .on_request_channel_key(move || *flag.lock().unwrap() = true);

    let engine = factory.get_mut().unwrap();
    engine.poll();
    assert!(*requested.lock().unwrap());
    assert_eq!(engine.stats().events_delivered, 1);
}

/// A source that is not `ScriptedEngine`, standing in for a native binding
struct SilentEngine {
    polling: i32,
}

impl EventSource for SilentEngine {
    fn fill(&mut self, _buf: &mut [u8]) -> Fill {
        Fill::empty()
    }

    fn enable_polling(&mut self) -> i32 {
        self.polling += 1;
        self.polling
    }
}

#[test]
fn test_boxed_sources_are_supported() {
    let mut factory: EngineFactory<Box<dyn EventSource>> = EngineFactory::new(EngineConfig::default());
    let engine = factory
        .get_or_create("boxed", || Box::new(SilentEngine { polling: 0 }) as Box<dyn EventSource>)
        .unwrap();
    engine.poll();
    assert_eq!(engine.stats().idle_ticks, 1);
}
