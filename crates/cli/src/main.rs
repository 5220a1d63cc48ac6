use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn};

use rtcbridge_client_core::{
    EngineConfig, EventKind, PollOutcome, PollStats, RtcEngine, ScriptedEngine, TextEncoding,
};

mod capture;

/// Inspect native RTC engine event frames offline
#[derive(Parser, Debug)]
#[command(name = "rtcbridge", author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a hex capture through the poll driver and print every event as JSON
    Replay {
        /// Capture file, one hex-encoded frame per line
        capture: PathBuf,

        /// Decode frame text as UTF-8 instead of Latin-1
        #[arg(long)]
        utf8: bool,

        /// Payload capacity of the reusable record
        #[arg(long, default_value_t = rtcbridge_wire_core::DEFAULT_PAYLOAD_CAPACITY)]
        payload_capacity: usize,

        /// App id reported for the replay engine
        #[arg(long, default_value = "replay")]
        app_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    rtcbridge_client_core::init_logging(directive);

    match cli.command {
        Command::Replay {
            capture: path,
            utf8,
            payload_capacity,
            app_id,
        } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading capture {}", path.display()))?;
            let frames = capture::parse_capture(&text)
                .with_context(|| format!("parsing capture {}", path.display()))?;
            info!(frames = frames.len(), "Loaded capture {}", path.display());

            let encoding = if utf8 {
                TextEncoding::Utf8Lossy
            } else {
                TextEncoding::Latin1
            };
            let config = EngineConfig::new()
                .with_payload_capacity(payload_capacity)
                .with_text_encoding(encoding)
                .with_frame_logging(cli.verbose > 0);

            let stats = replay(&app_id, frames, config, |line| println!("{}", line))?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

/// Feed `frames` through a fresh engine, one per tick
///
/// Each delivered event is serialized to JSON and passed to `emit`.
fn replay<F>(app_id: &str, frames: Vec<Vec<u8>>, config: EngineConfig, emit: F) -> Result<PollStats>
where
    F: FnMut(String) + Send + Clone + 'static,
{
    let mut source = ScriptedEngine::new();
    for frame in frames {
        source.push_raw(frame);
    }
    let ticks = source.pending();

    let mut engine = RtcEngine::new(app_id, source, config)?;
    for kind in EventKind::ALL {
        let mut emit = emit.clone();
        engine
            .handlers_mut()
            .register(kind, move |event| match serde_json::to_string(event) {
                Ok(line) => emit(line),
                Err(err) => warn!("Failed to serialize {} event: {}", kind, err),
            });
    }

    for tick in 0..ticks {
        if let PollOutcome::DecodeFailed(err) = engine.poll() {
            warn!(frame = tick + 1, "Skipping malformed frame: {}", err);
        }
    }

    Ok(*engine.stats())
}
