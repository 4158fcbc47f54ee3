mod audio;
mod utils;

use anyhow::{bail, Context, Result};
use audio::{load_wav, PlaybackStream};
use molebeat_core::{
    drive, AudioBuffer, BeatDispatcher, BeatEvent, BeatTimeline, LiveBeatSynchronizer,
    OfflineBeatAnalyzer, PeriodicTicker, Ticker, WallClock,
};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use utils::{Config, TickerMode};

const USAGE: &str = "\
usage: molebeat [FILE.wav] [--play | --simulate] [--periodic | --musical]

  FILE.wav     audio to analyse (defaults to the last file used)
  --play       play the file and fire beats in sync with playback
  --simulate   fire beats against a wall clock, without audio output
  --periodic   tick at a fixed period instead of on detected beats
  --musical    tick on detected beats (default)

Settings live in ~/.molebeat.toml; RUST_LOG overrides the log level.";

#[derive(Default)]
struct Options {
    file: Option<PathBuf>,
    play: bool,
    simulate: bool,
    ticker_mode: Option<TickerMode>,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self> {
        let mut options = Self::default();
        for arg in args {
            match arg.as_str() {
                "--play" => options.play = true,
                "--simulate" => options.simulate = true,
                "--periodic" => options.ticker_mode = Some(TickerMode::Periodic),
                "--musical" => options.ticker_mode = Some(TickerMode::Musical),
                flag if flag.starts_with("--") => bail!("Unknown option {}\n\n{}", flag, USAGE),
                path => options.file = Some(PathBuf::from(path)),
            }
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let (mut config, config_error) = Config::load_or_default();
    utils::init_logging(config.log_level());
    if let Some(e) = config_error {
        warn!("Ignoring config file: {:#}", e);
    }

    let options = Options::parse(&args)?;
    let path = match options
        .file
        .clone()
        .or_else(|| config.last_file.as_ref().map(PathBuf::from))
    {
        Some(path) => path,
        None => bail!("No audio file given\n\n{}", USAGE),
    };

    let buffer = load_wav(&path).with_context(|| format!("Failed to load {:?}", path))?;
    info!(
        file = %path.display(),
        duration_secs = buffer.duration().as_secs_f64(),
        sample_rate = buffer.sample_rate(),
        "loaded audio"
    );

    let timeline = OfflineBeatAnalyzer::new(config.analysis())
        .analyze(&buffer)
        .context("Beat analysis failed")?;
    print_timeline(&timeline);

    if let Err(e) = config.set_last_file(&path) {
        warn!("Could not remember last file: {:#}", e);
    }

    if options.play || options.simulate {
        let mode = options.ticker_mode.unwrap_or_else(|| config.ticker_mode());
        run_ticker(&config, mode, timeline, &buffer, options.play)?;
    }

    Ok(())
}

fn print_timeline(timeline: &BeatTimeline) {
    for (index, beat) in timeline.iter().enumerate() {
        println!("{:>5}  {:>10.3}s", index, beat.as_secs_f64());
    }
    match timeline.estimated_bpm() {
        Some(bpm) => println!("{} beats, ~{:.1} BPM", timeline.len(), bpm),
        None => println!("{} beats", timeline.len()),
    }
}

fn run_ticker(
    config: &Config,
    mode: TickerMode,
    timeline: BeatTimeline,
    buffer: &AudioBuffer,
    play: bool,
) -> Result<()> {
    let mut ticker: Box<dyn Ticker> = match mode {
        TickerMode::Musical => Box::new(
            LiveBeatSynchronizer::new(timeline, buffer.duration())
                .with_trigger_window(config.trigger_window()),
        ),
        TickerMode::Periodic => {
            Box::new(PeriodicTicker::new(config.ticker_period()).with_length(buffer.duration()))
        }
    };

    // The handler stands in for the game's "pop a mole" reaction
    let dispatcher = BeatDispatcher::spawn(|event: BeatEvent| {
        println!(
            "beat {:>5}  {:>10.3}s  late {:?}",
            event.index,
            event.scheduled.as_secs_f64(),
            event.lateness()
        );
    })
    .context("Failed to start beat dispatcher")?;
    let on_beat = |event| {
        dispatcher.dispatch(event);
    };

    let poll_interval = config.poll_interval();
    if poll_interval >= config.trigger_window() && mode == TickerMode::Musical {
        warn!(
            ?poll_interval,
            trigger_window = ?config.trigger_window(),
            "poll interval is not below the trigger window, beats may be missed"
        );
    }

    let playback = if play {
        match PlaybackStream::start(buffer) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("Playback unavailable, using wall clock: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let delivered = match &playback {
        Some(stream) => drive(ticker.as_mut(), stream, poll_interval, on_beat),
        None => {
            let clock = WallClock::start(buffer.duration());
            drive(ticker.as_mut(), &clock, poll_interval, on_beat)
        }
    };

    let handled = dispatcher.finish();
    info!(delivered, handled, ?mode, "ticker finished");
    Ok(())
}
