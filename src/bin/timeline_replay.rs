//! Replay a recorded player trace and print one JSON frame per step.
//!
//! Set `RUST_LOG=debug` to see the engine's reasoning alongside the frames.

use std::io::Write;
use std::path::PathBuf;

use ballskicker_timeline::trace::{replay, Trace};
use ballskicker_timeline::{EngineConfig, TimelineResult};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "timeline-replay",
    about = "Replay a recorded timeline trace as JSON lines",
    disable_help_subcommand = true
)]
struct Args {
    /// Trace file to replay
    trace: PathBuf,

    /// Engine configuration (defaults when omitted)
    config: Option<PathBuf>,
}

fn run(args: &Args) -> TimelineResult<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let trace = Trace::load(&args.trace)?;
    log::info!("[REPLAY] {} steps from {}", trace.steps.len(), args.trace.display());

    let frames = replay(&trace, config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for frame in &frames {
        serde_json::to_writer(&mut out, frame)?;
        writeln!(out)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(&args) {
        log::error!("[REPLAY] {}", e);
        std::process::exit(1);
    }
}
