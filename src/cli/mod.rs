//! CLI interface for sensemidi

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sensor signal conditioning and MIDI triggering
#[derive(Parser)]
#[command(name = "sensemidi")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a recorded sensor trace through the configured channels
    Replay {
        /// Configuration file path
        #[arg(short, long, default_value = "sensemidi.yaml")]
        config: PathBuf,

        /// Trace file: one row per line, `t_ms v0 v1 ...`
        #[arg(short, long)]
        trace: PathBuf,

        /// Send events to a MIDI output port
        #[arg(long)]
        midi: bool,

        /// MIDI port name (overrides the configuration)
        #[arg(short, long)]
        port: Option<String>,

        /// Sleep between ticks to play back at recorded speed
        #[arg(long)]
        realtime: bool,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "sensemidi.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,

    /// List available MIDI output ports
    Ports,
}
