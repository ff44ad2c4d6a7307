//! Channel engine
//!
//! Owns the clock and every channel. Each tick reads the clock once and
//! runs the channels in insertion order, each one strictly
//! conditioner -> hysteresis -> trigger -> sink.

mod channel;
mod midi;
mod sink;

pub use channel::Channel;
pub use midi::{list_midi_ports, MidiBinding, MidiMessage, MidiPlayer, MidiSink, MidiWrite, PITCH_BEND_CENTER};
pub use sink::{EventSink, LogSink, RecordingSink, SinkEvent};

use serde::{Deserialize, Serialize};

use crate::sources::Clock;

/// Index of a channel in its engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub usize);

/// The main polling engine
pub struct Engine {
    clock: Box<dyn Clock>,
    channels: Vec<Channel>,
}

impl Engine {
    /// Create an engine driven by `clock`
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            channels: Vec::new(),
        }
    }

    /// Add a channel; ids are handed out in order starting at 0
    pub fn add_channel(&mut self, channel: Channel) -> ChannelId {
        self.channels.push(channel);
        ChannelId(self.channels.len() - 1)
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.0)
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(id.0)
    }

    /// Seed every conditioner from its sensor at rest
    pub fn begin(&mut self) {
        for channel in &mut self.channels {
            channel.begin();
        }
    }

    pub fn reset_baselines(&mut self) {
        for channel in &mut self.channels {
            channel.reset_baseline();
        }
    }

    /// Run every channel once; returns the number of events delivered
    pub fn tick(&mut self, sink: &mut dyn EventSink) -> usize {
        let now_ms = self.clock.now_ms();
        self.channels
            .iter_mut()
            .enumerate()
            .map(|(index, channel)| channel.tick(ChannelId(index), now_ms, sink))
            .sum()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name().to_string()).collect()
    }
}
