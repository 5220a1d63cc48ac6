//! # Client-Core: native RTC engine event bridge
//!
//! The native engine queues events internally and hands them out one frame
//! per poll. This crate turns that queue into typed callbacks:
//!
//! - [`events`]: the tag table and [`classify`](events::classify)
//! - [`dispatch`]: the handler table and [`Dispatcher`]
//! - [`poll`]: the [`EventSource`] boundary and the [`PollDriver`]
//! - [`engine`]: the [`RtcEngine`] context and [`EngineFactory`]
//! - [`config`] and [`error`]: configuration and error types
//! - [`mock`]: a scripted event source for tests and offline replay
//!
//! ## Usage
//!
//! ```rust
//! use rtcbridge_client_core::{EngineConfig, EngineFactory, FrameBuilder, ScriptedEngine};
//!
//! let mut factory = EngineFactory::new(EngineConfig::default());
//! let engine = factory.get_or_create("demo-app", || {
//!     let mut source = ScriptedEngine::new();
//!     source.push_frame(FrameBuilder::new(13013).args(42, 300, 0));
//!     source
//! })?;
//!
//! engine.handlers_mut().on_user_joined(|uid, elapsed| {
//!     println!("user {} joined after {} ms", uid, elapsed);
//! });
//!
//! engine.poll();
//! assert_eq!(engine.stats().events_delivered, 1);
//! # Ok::<(), rtcbridge_client_core::ClientError>(())
//! ```

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod mock;
pub mod poll;

pub use config::EngineConfig;
pub use dispatch::{DispatchOutcome, Dispatcher, EventHandler, HandlerTable};
pub use engine::{CommandSink, EngineFactory, RtcEngine};
pub use error::{ClientError, ErrorCategory, Result};
pub use events::{
    classify, AudioRoute, Classified, EngineEvent, EventKind, EventTag, UserOfflineReason,
};
pub use mock::ScriptedEngine;
pub use poll::{EventSource, Fill, PollDriver, PollOutcome, PollStats};

pub use rtcbridge_wire_core::{
    AudioVolumeInfo, FrameBuilder, MessageRecord, RtcStats, TextEncoding, WireError,
};

/// Version information for the client library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a `tracing` subscriber filtered by `RUST_LOG`
///
/// Falls back to `default_directive` when `RUST_LOG` is unset or invalid.
/// Safe to call more than once; later calls leave the existing subscriber in
/// place.
pub fn init_logging(default_directive: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    tracing::debug!("Client-Core v{} logging initialized", VERSION);
}
