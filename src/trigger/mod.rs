//! Trigger engines
//!
//! Triggers turn a conditioned value stream into discrete events. Each
//! channel owns exactly one trigger; which one is data ([`TriggerConfig`]),
//! not a type per sensor/message pairing.

mod continuous;
mod debounce;
mod pressure;
mod threshold;
mod velocity;

pub use continuous::{ContinuousConfig, ContinuousTrigger};
pub use debounce::Debounce;
pub use pressure::{PressureConfig, PressureTrigger};
pub use threshold::{SingleThresholdConfig, ThresholdTrigger};
pub use velocity::{ThresholdConfig, VelocityState, VelocityTrigger, DEFAULT_TRIGGER_OFFSET};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Kind of a discrete event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    On,
    Off,
    ContinuousUpdate,
}

/// An event with its intensity (velocity, pressure or control value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub intensity: u16,
}

impl Event {
    pub fn on(intensity: u16) -> Self {
        Self {
            kind: EventKind::On,
            intensity,
        }
    }

    pub fn off(intensity: u16) -> Self {
        Self {
            kind: EventKind::Off,
            intensity,
        }
    }

    pub fn update(intensity: u16) -> Self {
        Self {
            kind: EventKind::ContinuousUpdate,
            intensity,
        }
    }
}

/// Events produced by one evaluation (at most two: an on plus a pressure update)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Emitted {
    events: [Option<Event>; 2],
}

impl Emitted {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn one(event: Event) -> Self {
        Self {
            events: [Some(event), None],
        }
    }

    /// Append an event; a third event in one evaluation is dropped
    pub fn push(&mut self, event: Event) {
        if let Some(slot) = self.events.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(event);
        } else {
            tracing::warn!(?event, "more than two events in one evaluation, dropping");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events[0].is_none()
    }

    pub fn len(&self) -> usize {
        self.events.iter().flatten().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().flatten()
    }
}

impl IntoIterator for Emitted {
    type Item = Event;
    type IntoIter = std::iter::Flatten<std::array::IntoIter<Option<Event>, 2>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter().flatten()
    }
}

/// Trait for trigger engines
pub trait Trigger {
    /// Evaluate one conditioned value at `now_ms`
    fn evaluate(&mut self, value: u32, now_ms: u64) -> Emitted;

    /// Whether a note (or gate) is currently held
    fn is_on(&self) -> bool;

    /// Drop all pending state and return to rest
    fn reset(&mut self);
}

/// Trigger configuration, tagged by `kind`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerConfig {
    /// Two thresholds, velocity from crossing time
    Velocity(ThresholdConfig),
    /// One threshold, fixed velocity
    Threshold(SingleThresholdConfig),
    /// Note plus continuous pressure above a second threshold
    Pressure(PressureConfig),
    /// Value changes only
    Continuous(ContinuousConfig),
}

impl TriggerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            TriggerConfig::Velocity(config) => config.validate(),
            TriggerConfig::Threshold(config) => config.validate(),
            TriggerConfig::Pressure(config) => config.validate(),
            TriggerConfig::Continuous(config) => config.validate(),
        }
    }

    pub fn build(&self) -> Result<ChannelTrigger, ConfigError> {
        Ok(match *self {
            TriggerConfig::Velocity(config) => ChannelTrigger::Velocity(VelocityTrigger::new(config)?),
            TriggerConfig::Threshold(config) => {
                ChannelTrigger::Threshold(ThresholdTrigger::new(config)?)
            }
            TriggerConfig::Pressure(config) => ChannelTrigger::Pressure(PressureTrigger::new(config)?),
            TriggerConfig::Continuous(config) => {
                ChannelTrigger::Continuous(ContinuousTrigger::new(config)?)
            }
        })
    }
}

/// The trigger owned by a channel
#[derive(Debug, Clone)]
pub enum ChannelTrigger {
    Velocity(VelocityTrigger),
    Threshold(ThresholdTrigger),
    Pressure(PressureTrigger),
    Continuous(ContinuousTrigger),
}

impl ChannelTrigger {
    fn inner(&self) -> &dyn Trigger {
        match self {
            ChannelTrigger::Velocity(t) => t,
            ChannelTrigger::Threshold(t) => t,
            ChannelTrigger::Pressure(t) => t,
            ChannelTrigger::Continuous(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Trigger {
        match self {
            ChannelTrigger::Velocity(t) => t,
            ChannelTrigger::Threshold(t) => t,
            ChannelTrigger::Pressure(t) => t,
            ChannelTrigger::Continuous(t) => t,
        }
    }
}

impl Trigger for ChannelTrigger {
    fn evaluate(&mut self, value: u32, now_ms: u64) -> Emitted {
        self.inner_mut().evaluate(value, now_ms)
    }

    fn is_on(&self) -> bool {
        self.inner().is_on()
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitted_collects_two() {
        let mut emitted = Emitted::none();
        assert!(emitted.is_empty());
        emitted.push(Event::on(90));
        emitted.push(Event::update(100));
        emitted.push(Event::off(0));
        assert_eq!(emitted.len(), 2);

        let events: Vec<Event> = emitted.into_iter().collect();
        assert_eq!(events, vec![Event::on(90), Event::update(100)]);
    }

    #[test]
    fn test_trigger_config_from_yaml() {
        let yaml = r#"
kind: velocity
min_note_threshold: 40
trigger_value: 60
debounce_ms: 5
velocity:
  min_physical: 0.01
  max_physical: 1.0
"#;
        let config: TriggerConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        match config {
            TriggerConfig::Velocity(c) => {
                assert_eq!(c.min_note_threshold, 40);
                assert_eq!(c.trigger_value, 60);
                assert_eq!(c.debounce_ms, 5);
                assert!(!c.release_velocity);
                assert_eq!(c.velocity.max_output, 127);
            }
            other => panic!("unexpected trigger {:?}", other),
        }

        let config: TriggerConfig =
            serde_yaml::from_str("kind: continuous\ninput:\n  min_input: 10\n  max_input: 90\n")
                .unwrap();
        assert!(matches!(config, TriggerConfig::Continuous(_)));
    }

    #[test]
    fn test_build_rejects_invalid() {
        let yaml = r#"
kind: velocity
min_note_threshold: 80
trigger_value: 60
velocity:
  min_physical: 0.01
  max_physical: 1.0
"#;
        let config: TriggerConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.build().is_err());
    }

    #[test]
    fn test_channel_trigger_dispatch() {
        let config = TriggerConfig::Threshold(SingleThresholdConfig::new(50));
        let mut trigger = config.build().unwrap();
        assert!(!trigger.is_on());
        let emitted = trigger.evaluate(90, 0);
        assert_eq!(emitted.len(), 1);
        assert!(trigger.is_on());
        trigger.reset();
        assert!(!trigger.is_on());
    }
}
