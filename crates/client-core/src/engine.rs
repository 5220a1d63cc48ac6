//! Engine context and factory
//!
//! [`RtcEngine`] ties together everything a host needs for one native engine
//! instance: the app id it was created for, its configuration, the poll driver
//! and an optional outbound command sink. [`EngineFactory`] keeps at most one
//! engine alive, so hosts that used to reach for a process-wide singleton can
//! hold the factory instead.

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dispatch::HandlerTable;
use crate::error::{ClientError, Result};
use crate::poll::{EventSource, PollDriver, PollOutcome, PollStats};

/// Outbound channel for engine commands
///
/// Commands are already-encoded strings passed through verbatim; the return
/// value is the engine's status code, negative on failure.
pub trait CommandSink: Send {
    fn send(&mut self, command: &str) -> i32;
}

impl<F> CommandSink for F
where
    F: FnMut(&str) -> i32 + Send,
{
    fn send(&mut self, command: &str) -> i32 {
        self(command)
    }
}

/// One native engine instance
pub struct RtcEngine<S> {
    app_id: String,
    config: EngineConfig,
    driver: PollDriver<S>,
    commands: Option<Box<dyn CommandSink>>,
}

impl<S: EventSource> RtcEngine<S> {
    /// Create an engine and switch `source` into host-polled delivery
    pub fn new(app_id: impl Into<String>, mut source: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let app_id = app_id.into();

        let status = source.enable_polling();
        if status < 0 {
            warn!(app_id = %app_id, status, "Engine refused host-polled delivery");
        }

        info!(
            app_id = %app_id,
            buffer_size = config.buffer_size,
            payload_capacity = config.payload_capacity,
            "Created RTC engine"
        );

        Ok(Self {
            driver: PollDriver::new(source, &config),
            app_id,
            config,
            commands: None,
        })
    }

    /// Attach the sink used by [`set_parameters`](Self::set_parameters)
    pub fn with_command_sink(mut self, sink: impl CommandSink + 'static) -> Self {
        self.commands = Some(Box::new(sink));
        self
    }

    /// Replace the command sink
    pub fn set_command_sink(&mut self, sink: impl CommandSink + 'static) {
        self.commands = Some(Box::new(sink));
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one tick of the poll driver
    pub fn poll(&mut self) -> PollOutcome {
        self.driver.poll_once()
    }

    /// Poll until the engine queue is empty, at most `max_ticks` times
    pub fn drain(&mut self, max_ticks: usize) -> usize {
        self.driver.drain(max_ticks)
    }

    pub fn handlers(&self) -> &HandlerTable {
        self.driver.handlers()
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerTable {
        self.driver.handlers_mut()
    }

    pub fn stats(&self) -> &PollStats {
        self.driver.stats()
    }

    pub fn driver(&self) -> &PollDriver<S> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut PollDriver<S> {
        &mut self.driver
    }

    /// Forward an encoded parameter string to the engine
    pub fn set_parameters(&mut self, parameters: &str) -> Result<i32> {
        let sink = self.commands.as_mut().ok_or(ClientError::NoCommandSink)?;
        let code = sink.send(parameters);
        debug!(code, "Forwarded engine parameters");
        if code < 0 {
            return Err(ClientError::Command {
                command: parameters.to_string(),
                code,
            });
        }
        Ok(code)
    }
}

impl<S> std::fmt::Debug for RtcEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtcEngine")
            .field("app_id", &self.app_id)
            .field("config", &self.config)
            .field("driver", &self.driver)
            .field("has_command_sink", &self.commands.is_some())
            .finish()
    }
}

/// Owns at most one [`RtcEngine`]
#[derive(Debug)]
pub struct EngineFactory<S> {
    config: EngineConfig,
    engine: Option<RtcEngine<S>>,
}

impl<S: EventSource> EngineFactory<S> {
    /// Create a factory whose engines use `config`
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engine: None,
        }
    }

    /// Return the live engine, creating it on first use
    ///
    /// `make_source` only runs when no engine exists. A request for a
    /// different app id returns the existing engine unchanged.
    pub fn get_or_create<F>(&mut self, app_id: &str, make_source: F) -> Result<&mut RtcEngine<S>>
    where
        F: FnOnce() -> S,
    {
        let engine = match self.engine.take() {
            Some(engine) => {
                if engine.app_id() != app_id {
                    warn!(
                        existing = engine.app_id(),
                        requested = app_id,
                        "Engine already created for another app id, returning existing instance"
                    );
                }
                engine
            }
            None => RtcEngine::new(app_id, make_source(), self.config.clone())?,
        };
        Ok(self.engine.insert(engine))
    }

    pub fn get(&self) -> Option<&RtcEngine<S>> {
        self.engine.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut RtcEngine<S>> {
        self.engine.as_mut()
    }

    pub fn is_created(&self) -> bool {
        self.engine.is_some()
    }

    /// Release the engine, returning it to the caller
    pub fn destroy(&mut self) -> Option<RtcEngine<S>> {
        let engine = self.engine.take();
        if let Some(engine) = &engine {
            info!(app_id = engine.app_id(), "Destroyed RTC engine");
        }
        engine
    }
}
