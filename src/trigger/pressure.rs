//! Note plus aftertouch trigger
//!
//! The note turns on at `min_note_threshold`. While it is held and the value
//! is at or above `trigger_value`, every change of the value is reported as
//! a continuous pressure update.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{Debounce, Emitted, Event, Trigger};
use crate::error::ConfigError;
use crate::mapping::InputRange;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureConfig {
    pub min_note_threshold: u32,

    /// Pressure updates start here
    pub trigger_value: u32,

    /// Fixed note-on velocity; unset means the value at the moment of the on
    #[serde(default)]
    pub on_velocity: Option<u8>,

    #[serde(default)]
    pub input: InputRange,

    #[serde(default)]
    pub debounce_ms: u64,
}

impl PressureConfig {
    pub fn new(min_note_threshold: u32, trigger_value: u32) -> Result<Self, ConfigError> {
        let config = Self {
            min_note_threshold,
            trigger_value,
            on_velocity: None,
            input: InputRange::default(),
            debounce_ms: 0,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_on_velocity(mut self, velocity: u8) -> Self {
        self.on_velocity = Some(velocity);
        self
    }

    pub fn with_input(mut self, input: InputRange) -> Result<Self, ConfigError> {
        self.input = input;
        self.validate()?;
        Ok(self)
    }

    pub fn with_debounce(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.input.validate()?;
        if self.min_note_threshold > self.trigger_value {
            return Err(ConfigError::Thresholds {
                min_note: self.min_note_threshold,
                trigger: self.trigger_value,
            });
        }
        if self.trigger_value > self.input.output_max {
            return Err(ConfigError::ThresholdRange {
                value: self.trigger_value,
                max: self.input.output_max,
            });
        }
        if let Some(velocity) = self.on_velocity {
            if velocity > 127 {
                return Err(ConfigError::VelocityOutput {
                    min: velocity,
                    max: velocity,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PressureTrigger {
    config: PressureConfig,
    on: bool,
    last_pressure: Option<u32>,
    debounce: Debounce,
}

impl PressureTrigger {
    pub fn new(config: PressureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            debounce: Debounce::new(config.debounce_ms),
            config,
            on: false,
            last_pressure: None,
        })
    }

    pub fn config(&self) -> &PressureConfig {
        &self.config
    }

    /// Last pressure value sent while the note is held
    pub fn last_pressure(&self) -> Option<u32> {
        self.last_pressure
    }

    pub fn set_thresholds(&mut self, min_note_threshold: u32, trigger_value: u32) -> Result<(), ConfigError> {
        let config = PressureConfig {
            min_note_threshold,
            trigger_value,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_debounce_ms(&mut self, debounce_ms: u64) {
        self.config.debounce_ms = debounce_ms;
        self.debounce.set_interval_ms(debounce_ms);
    }
}

impl Trigger for PressureTrigger {
    fn evaluate(&mut self, value: u32, now_ms: u64) -> Emitted {
        let value = self.config.input.apply(value);
        let mut emitted = Emitted::none();
        let wants_on = value >= self.config.min_note_threshold;

        if wants_on != self.on {
            if !self.debounce.ready(now_ms) {
                trace!(value, wants_on, "pressure note change deferred by debounce");
                return emitted;
            }
            self.on = wants_on;
            self.debounce.mark(now_ms);
            if wants_on {
                let velocity = self.config.on_velocity.map_or(value.min(127), u32::from);
                debug!(value, velocity, "pressure note on");
                emitted.push(Event::on(velocity as u16));
            } else {
                debug!(value, "pressure note off");
                self.last_pressure = None;
                emitted.push(Event::off(0));
            }
        }

        if self.on && value >= self.config.trigger_value && self.last_pressure != Some(value) {
            trace!(value, "pressure update");
            self.last_pressure = Some(value);
            emitted.push(Event::update(value as u16));
        }

        emitted
    }

    fn is_on(&self) -> bool {
        self.on
    }

    fn reset(&mut self) {
        self.on = false;
        self.last_pressure = None;
        self.debounce.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(t: &mut PressureTrigger, value: u32, now: u64) -> Vec<Event> {
        t.evaluate(value, now).into_iter().collect()
    }

    #[test]
    fn test_note_then_pressure() {
        let mut t = PressureTrigger::new(PressureConfig::new(20, 60).unwrap()).unwrap();

        assert!(events(&mut t, 10, 0).is_empty());
        assert_eq!(events(&mut t, 30, 1), vec![Event::on(30)]);
        // Held below the pressure threshold: silent
        assert!(events(&mut t, 50, 2).is_empty());
        assert_eq!(events(&mut t, 70, 3), vec![Event::update(70)]);
        assert!(events(&mut t, 70, 4).is_empty());
        assert_eq!(events(&mut t, 75, 5), vec![Event::update(75)]);
        assert_eq!(events(&mut t, 5, 6), vec![Event::off(0)]);
        assert!(!t.is_on());
        assert_eq!(t.last_pressure(), None);
    }

    #[test]
    fn test_jump_emits_on_and_pressure() {
        let config = PressureConfig::new(20, 60).unwrap().with_on_velocity(100);
        let mut t = PressureTrigger::new(config).unwrap();
        assert_eq!(events(&mut t, 90, 0), vec![Event::on(100), Event::update(90)]);
    }

    #[test]
    fn test_pressure_resent_after_repress() {
        let mut t = PressureTrigger::new(PressureConfig::new(20, 60).unwrap()).unwrap();
        events(&mut t, 90, 0);
        events(&mut t, 0, 1);
        assert_eq!(events(&mut t, 90, 2), vec![Event::on(90), Event::update(90)]);
    }

    #[test]
    fn test_debounce_defers_release() {
        let config = PressureConfig::new(20, 60).unwrap().with_debounce(10);
        let mut t = PressureTrigger::new(config).unwrap();

        events(&mut t, 40, 0);
        assert!(events(&mut t, 0, 4).is_empty());
        assert!(t.is_on());
        assert_eq!(events(&mut t, 0, 10), vec![Event::off(0)]);
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(PressureConfig::new(80, 60).is_err());
        assert!(PressureConfig::new(20, 300).is_err());
    }

    #[test]
    fn test_with_input_validates() {
        let config = PressureConfig::new(20, 100).unwrap();
        assert!(config.with_input(InputRange::native(63)).is_err());

        let config = config.with_input(InputRange::native(1023)).unwrap();
        assert_eq!(config.input.output_max, 1023);
    }
}
