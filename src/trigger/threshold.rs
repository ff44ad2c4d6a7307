//! Single-threshold gate trigger
//!
//! Two states with an optional hysteresis band above the threshold. The
//! note turns on above `threshold + hysteresis` and off below `threshold`,
//! always with the same velocity.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{Debounce, Emitted, Event, Trigger};
use crate::error::ConfigError;
use crate::mapping::InputRange;

fn default_on_velocity() -> u8 {
    127
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleThresholdConfig {
    pub threshold: u32,

    /// Extra margin above `threshold` needed to turn on
    #[serde(default)]
    pub hysteresis: u32,

    /// Fixed note-on velocity (default: 127)
    #[serde(default = "default_on_velocity")]
    pub on_velocity: u8,

    #[serde(default)]
    pub input: InputRange,

    #[serde(default)]
    pub debounce_ms: u64,
}

impl SingleThresholdConfig {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            hysteresis: 0,
            on_velocity: default_on_velocity(),
            input: InputRange::default(),
            debounce_ms: 0,
        }
    }

    pub fn with_hysteresis(mut self, hysteresis: u32) -> Self {
        self.hysteresis = hysteresis;
        self
    }

    pub fn with_on_velocity(mut self, velocity: u8) -> Self {
        self.on_velocity = velocity;
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
        let on_point = self.threshold.saturating_add(self.hysteresis);
        // The on condition is strict, so the on point must leave room above it
        if on_point >= self.input.output_max {
            return Err(ConfigError::ThresholdRange {
                value: on_point,
                max: self.input.output_max,
            });
        }
        if self.on_velocity > 127 {
            return Err(ConfigError::VelocityOutput {
                min: self.on_velocity,
                max: self.on_velocity,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdTrigger {
    config: SingleThresholdConfig,
    on: bool,
    debounce: Debounce,
}

impl ThresholdTrigger {
    pub fn new(config: SingleThresholdConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            debounce: Debounce::new(config.debounce_ms),
            config,
            on: false,
        })
    }

    pub fn config(&self) -> &SingleThresholdConfig {
        &self.config
    }

    pub fn set_threshold(&mut self, threshold: u32, hysteresis: u32) -> Result<(), ConfigError> {
        let config = SingleThresholdConfig {
            threshold,
            hysteresis,
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

impl Trigger for ThresholdTrigger {
    fn evaluate(&mut self, value: u32, now_ms: u64) -> Emitted {
        let value = self.config.input.apply(value);
        let wants_on = if self.on {
            value >= self.config.threshold
        } else {
            value > self.config.threshold + self.config.hysteresis
        };
        if wants_on == self.on {
            return Emitted::none();
        }
        if !self.debounce.ready(now_ms) {
            trace!(value, wants_on, "threshold change deferred by debounce");
            return Emitted::none();
        }

        self.on = wants_on;
        self.debounce.mark(now_ms);
        if wants_on {
            debug!(value, velocity = self.config.on_velocity, "gate on");
            Emitted::one(Event::on(self.config.on_velocity as u16))
        } else {
            debug!(value, "gate off");
            Emitted::one(Event::off(0))
        }
    }

    fn is_on(&self) -> bool {
        self.on
    }

    fn reset(&mut self) {
        self.on = false;
        self.debounce.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(t: &mut ThresholdTrigger, value: u32, now: u64) -> Vec<Event> {
        t.evaluate(value, now).into_iter().collect()
    }

    #[test]
    fn test_on_above_threshold() {
        let mut t = ThresholdTrigger::new(SingleThresholdConfig::new(50)).unwrap();
        assert!(events(&mut t, 50, 0).is_empty());
        assert_eq!(events(&mut t, 51, 1), vec![Event::on(127)]);
        assert!(events(&mut t, 100, 2).is_empty());
        assert_eq!(events(&mut t, 49, 3), vec![Event::off(0)]);
    }

    #[test]
    fn test_hysteresis_band() {
        let config = SingleThresholdConfig::new(50).with_hysteresis(10);
        let mut t = ThresholdTrigger::new(config).unwrap();

        assert!(events(&mut t, 60, 0).is_empty());
        assert_eq!(events(&mut t, 61, 1), vec![Event::on(127)]);
        // Inside the band the gate holds
        assert!(events(&mut t, 55, 2).is_empty());
        assert!(events(&mut t, 50, 3).is_empty());
        assert!(t.is_on());
        assert_eq!(events(&mut t, 49, 4), vec![Event::off(0)]);
    }

    #[test]
    fn test_fixed_velocity() {
        let config = SingleThresholdConfig::new(10).with_on_velocity(90);
        let mut t = ThresholdTrigger::new(config).unwrap();
        assert_eq!(events(&mut t, 127, 0), vec![Event::on(90)]);
    }

    #[test]
    fn test_debounce_defers() {
        let config = SingleThresholdConfig::new(50).with_debounce(20);
        let mut t = ThresholdTrigger::new(config).unwrap();

        assert_eq!(events(&mut t, 90, 0).len(), 1);
        assert!(events(&mut t, 0, 5).is_empty());
        assert!(t.is_on());
        assert_eq!(events(&mut t, 0, 20), vec![Event::off(0)]);
    }

    #[test]
    fn test_inverted_input() {
        let config = SingleThresholdConfig::new(100)
            .with_input(InputRange::remap(50, 550).unwrap().inverted())
            .unwrap();
        let mut t = ThresholdTrigger::new(config).unwrap();

        assert!(events(&mut t, 500, 0).is_empty());
        // Close object -> high value
        assert_eq!(events(&mut t, 60, 1), vec![Event::on(127)]);
    }

    #[test]
    fn test_with_input_validates() {
        // An on point of 100 does not fit a range that tops out at 100
        let config = SingleThresholdConfig::new(90).with_hysteresis(10);
        assert!(config.with_input(InputRange::native(100)).is_err());
        assert!(config.with_input(InputRange::native(1023)).is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(ThresholdTrigger::new(SingleThresholdConfig::new(127)).is_err());
        assert!(ThresholdTrigger::new(SingleThresholdConfig::new(100).with_hysteresis(30)).is_err());
        assert!(ThresholdTrigger::new(SingleThresholdConfig::new(10).with_on_velocity(200)).is_err());
    }
}
