//! Event sinks
//!
//! Channels hand their events to an [`EventSink`] instead of talking to an
//! output directly, so the same engine drives MIDI, logging and tests.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ChannelId;
use crate::trigger::EventKind;

/// Receiver of channel events
pub trait EventSink {
    fn on_event(&mut self, channel: ChannelId, kind: EventKind, intensity: u16);
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn on_event(&mut self, channel: ChannelId, kind: EventKind, intensity: u16) {
        (**self).on_event(channel, kind, intensity)
    }
}

/// Deliver every event to both sinks, first `A` then `B`
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn on_event(&mut self, channel: ChannelId, kind: EventKind, intensity: u16) {
        self.0.on_event(channel, kind, intensity);
        self.1.on_event(channel, kind, intensity);
    }
}

/// One delivered event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkEvent {
    pub channel: ChannelId,
    pub kind: EventKind,
    pub intensity: u16,
}

/// Collects events in delivery order
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    /// Take every event recorded so far
    pub fn drain(&mut self) -> std::vec::Drain<'_, SinkEvent> {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn on_event(&mut self, channel: ChannelId, kind: EventKind, intensity: u16) {
        self.events.push(SinkEvent {
            channel,
            kind,
            intensity,
        });
    }
}

/// Logs each event at info level
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    names: Vec<String>,
}

impl LogSink {
    /// `names` are the channel names, indexed by [`ChannelId`]
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl EventSink for LogSink {
    fn on_event(&mut self, channel: ChannelId, kind: EventKind, intensity: u16) {
        let name = self.names.get(channel.0).map(String::as_str).unwrap_or("?");
        info!(channel = name, ?kind, intensity, "event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_order() {
        let mut sink = RecordingSink::new();
        sink.on_event(ChannelId(1), EventKind::On, 90);
        sink.on_event(ChannelId(0), EventKind::Off, 0);

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events()[0].channel, ChannelId(1));
        assert_eq!(sink.events()[1].kind, EventKind::Off);

        let drained: Vec<SinkEvent> = sink.drain().collect();
        assert_eq!(drained.len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_pair_delivers_to_both() {
        let mut first = RecordingSink::new();
        let mut second = RecordingSink::new();
        {
            let mut both = (&mut first, &mut second);
            both.on_event(ChannelId(0), EventKind::ContinuousUpdate, 12);
        }
        assert_eq!(first.events(), second.events());
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_sink_event_json() {
        let event = SinkEvent {
            channel: ChannelId(2),
            kind: EventKind::ContinuousUpdate,
            intensity: 300,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"channel":2,"kind":"continuous_update","intensity":300}"#);
    }
}
