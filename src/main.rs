//! sensemidi - Sensor signal conditioning and threshold-triggered MIDI

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use sensemidi::config::{self, SensorConfig};
use sensemidi::conditioning::ConditionerConfig;
use sensemidi::engine::{list_midi_ports, MidiPlayer, MidiSink, RecordingSink, SinkEvent};
use sensemidi::sources::{load_trace, ManualClock, TraceCursor};
use sensemidi::trigger::{EventKind, TriggerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Replay {
            config: config_path,
            trace,
            midi,
            port,
            realtime,
            json,
        } => {
            let options = ReplayOptions {
                midi,
                port,
                realtime,
                json,
            };
            replay(&config_path, &trace, options)?;
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    print_summary(&cfg);
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let path = "sensemidi.yaml";
            if Path::new(path).exists() {
                println!("sensemidi.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, config::EXAMPLE_CONFIG)?;
                println!("Created sensemidi.yaml with example configuration.");
            }
        }

        Commands::Ports => {
            let ports = list_midi_ports()?;
            if ports.is_empty() {
                println!("No MIDI output ports available.");
            } else {
                println!("MIDI output ports:\n");
                for (index, name) in ports.iter().enumerate() {
                    let marker = if index == 0 { " (default)" } else { "" };
                    println!("  - {}{}", name, marker);
                }
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise info, raised by each `-v`
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(cfg: &SensorConfig) {
    println!("  Tick: {} ms", cfg.tick_ms);
    println!(
        "  MIDI port: {}",
        cfg.midi.port.as_deref().unwrap_or("(first available)")
    );
    println!("  Channels: {}", cfg.channels.len());
    for (index, channel) in cfg.channels.iter().enumerate() {
        let conditioning = match channel.conditioning {
            ConditionerConfig::Adaptive(_) => "adaptive",
            ConditionerConfig::Direct(_) => "direct",
        };
        let trigger = match channel.trigger {
            TriggerConfig::Velocity(_) => "velocity",
            TriggerConfig::Threshold(_) => "threshold",
            TriggerConfig::Pressure(_) => "pressure",
            TriggerConfig::Continuous(_) => "continuous",
        };
        println!(
            "    - {} (column {}, {} {}-bit, {}) -> {:?}",
            channel.name,
            channel.column_or(index),
            conditioning,
            channel.conditioning.precision(),
            trigger,
            channel.output
        );
    }
}

struct ReplayOptions {
    midi: bool,
    port: Option<String>,
    realtime: bool,
    json: bool,
}

#[derive(Serialize)]
struct EventLine<'a> {
    t_ms: u64,
    channel: &'a str,
    kind: EventKind,
    intensity: u16,
}

fn replay(config_path: &Path, trace_path: &Path, options: ReplayOptions) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let trace = load_trace(trace_path)
        .with_context(|| format!("Failed to load trace {}", trace_path.display()))?;

    if let Some(column) = cfg.max_column() {
        if column >= trace.columns() {
            bail!(
                "Configuration reads column {} but the trace has {} columns",
                column,
                trace.columns()
            );
        }
    }

    let cursor = TraceCursor::new();
    let clock = ManualClock::new(0);
    let Some(first) = trace.rows().first() else {
        bail!("Trace is empty");
    };
    cursor.set_row(first);
    clock.set(first.t_ms);

    let mut engine = cfg.build_engine(clock.clone(), |column| cursor.source(column))?;
    engine.begin();
    let names = engine.channel_names();

    let mut midi_sink = if options.midi {
        let port = options.port.as_deref().or(cfg.midi.port.as_deref());
        let mut sink = MidiSink::new(MidiPlayer::new(port)?);
        cfg.bind_outputs(&mut sink);
        Some(sink)
    } else {
        None
    };

    let running = Arc::new(AtomicBool::new(true));
    if options.realtime {
        let running_ctrlc = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running_ctrlc.store(false, Ordering::Relaxed);
        })
        .context("Error setting Ctrl-C handler")?;
    }

    info!(
        channels = engine.len(),
        rows = trace.len(),
        duration_ms = trace.duration_ms(),
        "Replaying trace"
    );

    let mut recorder = RecordingSink::new();
    let started = Instant::now();
    let mut total = 0usize;

    for (now, row) in trace.ticks(cfg.tick_ms) {
        if !running.load(Ordering::Relaxed) {
            info!(t_ms = now, "Interrupted");
            break;
        }
        if options.realtime {
            let target = Duration::from_millis(now - first.t_ms);
            let elapsed = started.elapsed();
            if target > elapsed {
                thread::sleep(target - elapsed);
            }
        }

        cursor.set_row(row);
        clock.set(now);
        match midi_sink.as_mut() {
            Some(sink) => engine.tick(&mut (&mut recorder, sink)),
            None => engine.tick(&mut recorder),
        };

        for event in recorder.drain() {
            print_event(now, &names, &event, options.json)?;
            total += 1;
        }
    }

    if let Some(mut sink) = midi_sink {
        sink.all_notes_off();
        sink.into_writer().stop();
    }

    info!(events = total, "Replay finished");
    Ok(())
}

fn print_event(t_ms: u64, names: &[String], event: &SinkEvent, json: bool) -> Result<()> {
    let channel = names.get(event.channel.0).map(String::as_str).unwrap_or("?");
    if json {
        let line = EventLine {
            t_ms,
            channel,
            kind: event.kind,
            intensity: event.intensity,
        };
        println!("{}", serde_json::to_string(&line)?);
    } else {
        let kind = match event.kind {
            EventKind::On => "on",
            EventKind::Off => "off",
            EventKind::ContinuousUpdate => "update",
        };
        println!("{:>8} ms  {:<16} {:<7} {}", t_ms, channel, kind, event.intensity);
    }
    Ok(())
}
