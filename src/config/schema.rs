//! Configuration schema definitions

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::conditioning::ConditionerConfig;
use crate::engine::{Channel, ChannelId, Engine, MidiBinding, MidiSink, MidiWrite};
use crate::sources::{Clock, FnSource, ManualClock, SampleSource};
use crate::trigger::TriggerConfig;

/// Main configuration for sensemidi
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Engine tick period in milliseconds (default: 1)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// MIDI output settings
    #[serde(default)]
    pub midi: MidiOutputConfig,

    /// Sensor channels, in tick order
    pub channels: Vec<ChannelConfig>,
}

fn default_tick_ms() -> u64 { 1 }

impl SensorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 || self.tick_ms > 1000 {
            bail!("tick_ms must be between 1 and 1000");
        }
        if self.channels.is_empty() {
            bail!("At least one channel is required");
        }

        let mut names = HashSet::new();
        for channel in &self.channels {
            if channel.name.is_empty() {
                bail!("Channel names must not be empty");
            }
            if !names.insert(channel.name.as_str()) {
                bail!("Duplicate channel name '{}'", channel.name);
            }
            channel.validate()?;
        }

        // Construct everything once so no error can surface mid-run
        self.build_engine(ManualClock::new(0), |_| FnSource(|| 0))?;
        Ok(())
    }

    /// Build an engine with one channel per entry, in order
    ///
    /// `source` is asked for the reader of each channel's column.
    pub fn build_engine<S, F>(&self, clock: impl Clock + 'static, mut source: F) -> Result<Engine>
    where
        S: SampleSource + 'static,
        F: FnMut(usize) -> S,
    {
        let mut engine = Engine::new(clock);
        for (index, config) in self.channels.iter().enumerate() {
            let channel = Channel::from_config(config, source(config.column_or(index)))
                .with_context(|| format!("Channel '{}'", config.name))?;
            engine.add_channel(channel);
        }
        Ok(engine)
    }

    /// Bind every channel's output on `sink`
    pub fn bind_outputs<W: MidiWrite>(&self, sink: &mut MidiSink<W>) {
        for (index, config) in self.channels.iter().enumerate() {
            sink.bind(ChannelId(index), config.output);
        }
    }

    /// Highest trace column any channel reads
    pub fn max_column(&self) -> Option<usize> {
        self.channels
            .iter()
            .enumerate()
            .map(|(index, c)| c.column_or(index))
            .max()
    }
}

/// MIDI output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MidiOutputConfig {
    /// Output port name, matched by substring (None = first port)
    #[serde(default)]
    pub port: Option<String>,
}

/// One sensor channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Unique name for this channel
    pub name: String,

    /// Trace column feeding this channel (default: the channel's position)
    #[serde(default)]
    pub column: Option<usize>,

    /// Discard readings of 0 or at/above this value, keeping the last valid one
    #[serde(default)]
    pub valid_below: Option<u32>,

    /// Conditioner settings (default: adaptive filter)
    #[serde(default)]
    pub conditioning: ConditionerConfig,

    /// Low bits collapsed by the hysteresis stage (None = no hysteresis)
    #[serde(default)]
    pub hysteresis_bits: Option<u8>,

    /// Trigger settings
    pub trigger: TriggerConfig,

    /// MIDI message the events become
    pub output: MidiBinding,
}

impl ChannelConfig {
    pub fn column_or(&self, index: usize) -> usize {
        self.column.unwrap_or(index)
    }

    /// Validate the channel
    pub fn validate(&self) -> Result<()> {
        let context = || format!("Channel '{}'", self.name);
        self.conditioning.validate().with_context(context)?;
        self.trigger.validate().with_context(context)?;
        self.output.validate().with_context(context)?;

        if let Some(bits) = self.hysteresis_bits {
            let precision = self.conditioning.precision();
            if bits >= precision {
                bail!(
                    "Channel '{}': hysteresis_bits ({}) must be below the conditioner precision ({})",
                    self.name,
                    bits,
                    precision
                );
            }
        }
        if self.valid_below == Some(0) {
            bail!("Channel '{}': valid_below must be positive", self.name);
        }
        Ok(())
    }
}
