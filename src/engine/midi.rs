//! MIDI output
//!
//! Translates channel events into MIDI messages according to each channel's
//! [`MidiBinding`] and writes them to a port.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use midir::MidiOutput;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::{ChannelId, EventSink};
use crate::error::ConfigError;
use crate::trigger::EventKind;

/// Centre position of a 14-bit pitch bend
pub const PITCH_BEND_CENTER: u16 = 0x2000;

/// MIDI message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note on: channel (0-15), note (0-127), velocity (0-127)
    NoteOn(u8, u8, u8),
    /// Note off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff(u8, u8, u8),
    /// Polyphonic aftertouch: channel (0-15), note (0-127), pressure (0-127)
    KeyPressure(u8, u8, u8),
    /// Control change: channel (0-15), controller (0-127), value (0-127)
    ControlChange(u8, u8, u8),
    /// Program change: channel (0-15), program (0-127)
    ProgramChange(u8, u8),
    /// Channel aftertouch: channel (0-15), pressure (0-127)
    ChannelPressure(u8, u8),
    /// Pitch bend: channel (0-15), value (0-16383, center at 8192)
    PitchBend(u8, u16),
}

impl MidiMessage {
    /// Convert to raw MIDI bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn(ch, note, vel) => vec![0x90 | (ch & 0x0F), note & 0x7F, vel & 0x7F],
            MidiMessage::NoteOff(ch, note, vel) => {
                vec![0x80 | (ch & 0x0F), note & 0x7F, vel & 0x7F]
            }
            MidiMessage::KeyPressure(ch, note, pressure) => {
                vec![0xA0 | (ch & 0x0F), note & 0x7F, pressure & 0x7F]
            }
            MidiMessage::ControlChange(ch, ctrl, val) => {
                vec![0xB0 | (ch & 0x0F), ctrl & 0x7F, val & 0x7F]
            }
            MidiMessage::ProgramChange(ch, prog) => vec![0xC0 | (ch & 0x0F), prog & 0x7F],
            MidiMessage::ChannelPressure(ch, pressure) => vec![0xD0 | (ch & 0x0F), pressure & 0x7F],
            MidiMessage::PitchBend(ch, val) => {
                let lsb = (val & 0x7F) as u8;
                let msb = ((val >> 7) & 0x7F) as u8;
                vec![0xE0 | (ch & 0x0F), lsb, msb]
            }
        }
    }
}

/// Which MIDI message a channel's events become
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MidiBinding {
    /// On/off as note on/off, pressure updates as polyphonic aftertouch
    Note { channel: u8, note: u8 },
    /// Continuous updates as controller values; a gate sends its velocity and 0
    ControlChange { channel: u8, controller: u8 },
    /// Continuous updates as polyphonic aftertouch on a fixed note
    KeyPressure { channel: u8, note: u8 },
    /// Continuous updates as channel aftertouch
    ChannelPressure { channel: u8 },
    /// Continuous updates as 14-bit pitch bend; gate off recentres
    PitchBend { channel: u8 },
    /// Gate on selects `program`
    ProgramChange { channel: u8, program: u8 },
}

fn data_byte(name: &'static str, value: u8) -> Result<(), ConfigError> {
    if value > 127 {
        return Err(ConfigError::DataByte { name, value });
    }
    Ok(())
}

impl MidiBinding {
    pub fn channel(&self) -> u8 {
        match *self {
            MidiBinding::Note { channel, .. }
            | MidiBinding::ControlChange { channel, .. }
            | MidiBinding::KeyPressure { channel, .. }
            | MidiBinding::ChannelPressure { channel }
            | MidiBinding::PitchBend { channel }
            | MidiBinding::ProgramChange { channel, .. } => channel,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel() > 15 {
            return Err(ConfigError::MidiChannel(self.channel()));
        }
        match *self {
            MidiBinding::Note { note, .. } | MidiBinding::KeyPressure { note, .. } => {
                data_byte("note", note)
            }
            MidiBinding::ControlChange { controller, .. } => data_byte("controller", controller),
            MidiBinding::ProgramChange { program, .. } => data_byte("program", program),
            MidiBinding::ChannelPressure { .. } | MidiBinding::PitchBend { .. } => Ok(()),
        }
    }

    /// The message for one event, if this binding maps that event kind
    pub fn message(&self, kind: EventKind, intensity: u16) -> Option<MidiMessage> {
        let data = intensity.min(127) as u8;
        match (*self, kind) {
            (MidiBinding::Note { channel, note }, EventKind::On) => {
                Some(MidiMessage::NoteOn(channel, note, data))
            }
            (MidiBinding::Note { channel, note }, EventKind::Off) => {
                Some(MidiMessage::NoteOff(channel, note, data))
            }
            (MidiBinding::Note { channel, note }, EventKind::ContinuousUpdate)
            | (MidiBinding::KeyPressure { channel, note }, EventKind::ContinuousUpdate) => {
                Some(MidiMessage::KeyPressure(channel, note, data))
            }
            (MidiBinding::ControlChange { channel, controller }, EventKind::Off) => {
                Some(MidiMessage::ControlChange(channel, controller, 0))
            }
            (MidiBinding::ControlChange { channel, controller }, _) => {
                Some(MidiMessage::ControlChange(channel, controller, data))
            }
            (MidiBinding::ChannelPressure { channel }, EventKind::Off) => {
                Some(MidiMessage::ChannelPressure(channel, 0))
            }
            (MidiBinding::ChannelPressure { channel }, _) => {
                Some(MidiMessage::ChannelPressure(channel, data))
            }
            (MidiBinding::PitchBend { channel }, EventKind::ContinuousUpdate) => {
                Some(MidiMessage::PitchBend(channel, intensity.min(0x3FFF)))
            }
            (MidiBinding::PitchBend { channel }, EventKind::Off) => {
                Some(MidiMessage::PitchBend(channel, PITCH_BEND_CENTER))
            }
            (MidiBinding::ProgramChange { channel, program }, EventKind::On) => {
                Some(MidiMessage::ProgramChange(channel, program))
            }
            _ => None,
        }
    }
}

/// Something MIDI messages can be written to
pub trait MidiWrite {
    fn write(&mut self, message: MidiMessage) -> Result<()>;
}

impl MidiWrite for Vec<MidiMessage> {
    fn write(&mut self, message: MidiMessage) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

/// Event sink that writes MIDI
pub struct MidiSink<W> {
    writer: W,
    bindings: Vec<Option<MidiBinding>>,
    held: Vec<bool>,
}

impl<W: MidiWrite> MidiSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bindings: Vec::new(),
            held: Vec::new(),
        }
    }

    /// Route `channel`'s events through `binding`, replacing any previous one
    pub fn bind(&mut self, channel: ChannelId, binding: MidiBinding) {
        if self.bindings.len() <= channel.0 {
            self.bindings.resize(channel.0 + 1, None);
            self.held.resize(channel.0 + 1, false);
        }
        self.bindings[channel.0] = Some(binding);
        self.held[channel.0] = false;
    }

    pub fn binding(&self, channel: ChannelId) -> Option<&MidiBinding> {
        self.bindings.get(channel.0).and_then(Option::as_ref)
    }

    /// Whether a bound note is currently sounding on `channel`
    pub fn is_held(&self, channel: ChannelId) -> bool {
        self.held.get(channel.0).copied().unwrap_or(false)
    }

    /// Send note off for every note still sounding
    pub fn all_notes_off(&mut self) {
        for index in 0..self.bindings.len() {
            if !self.held[index] {
                continue;
            }
            if let Some(MidiBinding::Note { channel, note }) = self.bindings[index] {
                debug!(channel, note, "releasing held note");
                self.send(MidiMessage::NoteOff(channel, note, 0));
            }
            self.held[index] = false;
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn send(&mut self, message: MidiMessage) {
        if let Err(e) = self.writer.write(message) {
            warn!(?message, "MIDI send failed: {}", e);
        }
    }
}

impl<W: MidiWrite> EventSink for MidiSink<W> {
    fn on_event(&mut self, channel: ChannelId, kind: EventKind, intensity: u16) {
        let Some(binding) = self.binding(channel).copied() else {
            warn!(channel = channel.0, ?kind, "event on unbound channel dropped");
            return;
        };
        let Some(message) = binding.message(kind, intensity) else {
            trace!(channel = channel.0, ?kind, "event has no MIDI mapping for this binding");
            return;
        };
        if matches!(binding, MidiBinding::Note { .. }) {
            match kind {
                EventKind::On => self.held[channel.0] = true,
                EventKind::Off => self.held[channel.0] = false,
                EventKind::ContinuousUpdate => {}
            }
        }
        self.send(message);
    }
}

/// MIDI output player.
///
/// Writes happen on a dedicated thread. Stopping or dropping the player
/// waits for that thread, so everything queued before the stop reaches
/// the port.
pub struct MidiPlayer {
    sender: Sender<MidiPlayerCommand>,
    writer: Option<JoinHandle<()>>,
    port_name: String,
}

enum MidiPlayerCommand {
    Send(MidiMessage),
    Stop,
}

impl MidiPlayer {
    /// Create a new MIDI player connected to the given port.
    ///
    /// `port_name` matches by substring; `None` picks the first port.
    pub fn new(port_name: Option<&str>) -> Result<Self> {
        let midi_out = MidiOutput::new("sensemidi output")?;
        let ports = midi_out.ports();

        if ports.is_empty() {
            return Err(anyhow!("No MIDI output ports available"));
        }

        let port = if let Some(name) = port_name {
            ports
                .iter()
                .find(|p| {
                    midi_out
                        .port_name(p)
                        .map(|n| n.contains(name))
                        .unwrap_or(false)
                })
                .ok_or_else(|| anyhow!("MIDI port '{}' not found", name))?
                .clone()
        } else {
            ports[0].clone()
        };

        let port_name_actual = midi_out.port_name(&port)?;
        let mut conn = midi_out
            .connect(&port, "sensemidi-output")
            .map_err(|e| anyhow!("{}", e))?;
        info!(port = %port_name_actual, "MIDI output connected");

        Ok(Self::spawn(port_name_actual, move |bytes| Ok(conn.send(bytes)?)))
    }

    /// Start the writer thread around `write`, which receives each encoded
    /// message in order. `write` is dropped, closing whatever it owns, when
    /// the player stops.
    pub fn spawn<F>(port_name: impl Into<String>, mut write: F) -> Self
    where
        F: FnMut(&[u8]) -> Result<()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<MidiPlayerCommand>();

        let writer = thread::spawn(move || {
            while let Ok(cmd) = receiver.recv() {
                match cmd {
                    MidiPlayerCommand::Send(msg) => {
                        if let Err(e) = write(&msg.to_bytes()) {
                            warn!(?msg, "MIDI port write failed: {}", e);
                        }
                    }
                    MidiPlayerCommand::Stop => break,
                }
            }
        });

        Self {
            sender,
            writer: Some(writer),
            port_name: port_name.into(),
        }
    }

    /// Send a raw MIDI message.
    pub fn send(&self, msg: MidiMessage) -> Result<()> {
        self.sender.send(MidiPlayerCommand::Send(msg))?;
        Ok(())
    }

    /// Stop the MIDI player once the queued messages are written.
    pub fn stop(&mut self) {
        let _ = self.sender.send(MidiPlayerCommand::Stop);
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                warn!(port = %self.port_name, "MIDI writer thread panicked");
            }
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiWrite for MidiPlayer {
    fn write(&mut self, message: MidiMessage) -> Result<()> {
        self.send(message)
    }
}

impl Drop for MidiPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// List available MIDI output ports.
pub fn list_midi_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("sensemidi port list")?;
    let ports = midi_out.ports();

    let names: Vec<String> = ports
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect();

    Ok(names)
}
