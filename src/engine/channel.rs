//! One sensor-to-event pipeline

use tracing::debug;

use super::{ChannelId, EventSink};
use crate::conditioning::{Conditioner, Hysteresis};
use crate::config::ChannelConfig;
use crate::error::ConfigError;
use crate::mapping::increase_bit_depth;
use crate::sources::{LastValid, SampleSource};
use crate::trigger::{ChannelTrigger, Trigger};

/// Conditioner, optional hysteresis and trigger for one sensor
pub struct Channel {
    name: String,
    conditioner: Conditioner,
    hysteresis: Option<Hysteresis>,
    trigger: ChannelTrigger,
    value: u32,
}

impl Channel {
    /// The hysteresis, when present, must take the conditioner's precision
    pub fn new(
        name: impl Into<String>,
        conditioner: Conditioner,
        hysteresis: Option<Hysteresis>,
        trigger: ChannelTrigger,
    ) -> Result<Self, ConfigError> {
        if let Some(h) = &hysteresis {
            if h.input_bits() != conditioner.precision() {
                return Err(ConfigError::HysteresisPrecision {
                    input_bits: h.input_bits(),
                    precision: conditioner.precision(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            conditioner,
            hysteresis,
            trigger,
            value: 0,
        })
    }

    /// Build every stage from configuration, reading from `source`
    pub fn from_config<S>(config: &ChannelConfig, source: S) -> Result<Self, ConfigError>
    where
        S: SampleSource + 'static,
    {
        let source: Box<dyn SampleSource> = match config.valid_below {
            Some(limit) => Box::new(LastValid::new(source, limit)),
            None => Box::new(source),
        };
        let conditioner = config.conditioning.build(source)?;
        let hysteresis = config
            .hysteresis_bits
            .map(|bits| Hysteresis::new(bits, config.conditioning.precision()))
            .transpose()?;
        let trigger = config.trigger.build()?;
        Self::new(config.name.clone(), conditioner, hysteresis, trigger)
    }

    /// Run one tick; returns the number of events delivered
    ///
    /// Nothing happens until the conditioner's poll interval has elapsed.
    /// Once it has, the trigger sees the value even when it did not change,
    /// so transitions held back by debounce get another chance.
    pub fn tick(&mut self, id: ChannelId, now_ms: u64, sink: &mut dyn EventSink) -> usize {
        if self.conditioner.poll(now_ms).is_none() {
            return 0;
        }

        self.value = match &mut self.hysteresis {
            Some(h) => {
                h.update(self.conditioner.value());
                increase_bit_depth(h.value(), h.output_bits(), self.conditioner.precision())
            }
            None => self.conditioner.value(),
        };

        let emitted = self.trigger.evaluate(self.value, now_ms);
        let count = emitted.len();
        for event in emitted {
            debug!(channel = %self.name, kind = ?event.kind, intensity = event.intensity, "emit");
            sink.on_event(id, event.kind, event.intensity);
        }
        count
    }

    /// Initialize the conditioner from the sensor at rest
    pub fn begin(&mut self) {
        self.conditioner.begin();
        self.trigger.reset();
    }

    pub fn reset_baseline(&mut self) {
        self.conditioner.reset_baseline();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last value handed to the trigger
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_on(&self) -> bool {
        self.trigger.is_on()
    }

    pub fn conditioner(&self) -> &Conditioner {
        &self.conditioner
    }

    pub fn conditioner_mut(&mut self) -> &mut Conditioner {
        &mut self.conditioner
    }

    pub fn hysteresis(&self) -> Option<&Hysteresis> {
        self.hysteresis.as_ref()
    }

    pub fn trigger(&self) -> &ChannelTrigger {
        &self.trigger
    }

    pub fn trigger_mut(&mut self) -> &mut ChannelTrigger {
        &mut self.trigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditioning::{ConditionerConfig, DirectParams};
    use crate::engine::RecordingSink;
    use crate::sources::ScriptedSource;
    use crate::trigger::{ContinuousConfig, EventKind, TriggerConfig};

    fn direct(bits: u8) -> ConditionerConfig {
        ConditionerConfig::Direct(DirectParams {
            input_bits: bits,
            precision: 7,
            poll_interval_ms: 0,
        })
    }

    #[test]
    fn test_hysteresis_precision_mismatch() {
        let conditioner = direct(7).build(Box::new(ScriptedSource::new([0])) as Box<dyn SampleSource>).unwrap();
        let trigger = TriggerConfig::Continuous(ContinuousConfig::default()).build().unwrap();
        let result = Channel::new("x", conditioner, Some(Hysteresis::new(2, 10).unwrap()), trigger);
        assert!(matches!(
            result,
            Err(ConfigError::HysteresisPrecision { input_bits: 10, precision: 7 })
        ));
    }

    #[test]
    fn test_hysteresis_suppresses_jitter() {
        let conditioner = direct(7)
            .build(Box::new(ScriptedSource::new([64, 65, 64, 65, 64, 90])) as Box<dyn SampleSource>)
            .unwrap();
        let trigger = TriggerConfig::Continuous(ContinuousConfig::default()).build().unwrap();
        let mut channel =
            Channel::new("knob", conditioner, Some(Hysteresis::new(1, 7).unwrap()), trigger).unwrap();

        let mut sink = RecordingSink::new();
        for now in 0..6 {
            channel.tick(ChannelId(0), now, &mut sink);
        }

        // 64 reports 32, re-expanded to 65; the one-step wobble stays inside the band
        let values: Vec<u16> = sink.events().iter().map(|e| e.intensity).collect();
        assert_eq!(values, vec![65, 91]);
        assert!(sink.events().iter().all(|e| e.kind == EventKind::ContinuousUpdate));
    }

    #[test]
    fn test_not_due_is_silent() {
        let conditioner = ConditionerConfig::Direct(DirectParams {
            input_bits: 7,
            precision: 7,
            poll_interval_ms: 10,
        })
        .build(Box::new(ScriptedSource::new([50])) as Box<dyn SampleSource>)
        .unwrap();
        let trigger = TriggerConfig::Continuous(ContinuousConfig::default()).build().unwrap();
        let mut channel = Channel::new("slow", conditioner, None, trigger).unwrap();

        let mut sink = RecordingSink::new();
        assert_eq!(channel.tick(ChannelId(0), 5, &mut sink), 0);
        assert_eq!(channel.tick(ChannelId(0), 10, &mut sink), 1);
        assert_eq!(channel.tick(ChannelId(0), 15, &mut sink), 0);
        assert_eq!(channel.value(), 50);
    }
}
