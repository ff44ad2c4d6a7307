//! Velocity-sensing threshold trigger
//!
//! Times how long the input takes to travel from the arm threshold
//! (`min_note_threshold`) to the commit threshold (`trigger_value`) and
//! turns that speed into the note-on velocity. Release is timed the same
//! way on the way down.
//!
//! ```text
//!            >= min               >= trigger
//!   Idle ------------> Arming ---------------> Active   (On)
//!    ^     < min         |                       |
//!    +-------------------+                       | < trigger
//!    |                                           v
//!    +------------------------------------- Releasing
//!                    < min  (Off)          >= trigger: back to Active
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{Debounce, Emitted, Event, Trigger};
use crate::error::ConfigError;
use crate::mapping::{InputRange, VelocityMap};

/// Distance between the arm and trigger thresholds when only the arm
/// threshold is given
pub const DEFAULT_TRIGGER_OFFSET: u32 = 12;

fn default_debounce() -> u64 {
    2
}

/// Per-channel thresholds and timing bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Arm point: timing starts when the value reaches it
    pub min_note_threshold: u32,

    /// Commit point: the note fires when the value reaches it
    pub trigger_value: u32,

    /// Clamp/remap applied before comparing against the thresholds
    #[serde(default)]
    pub input: InputRange,

    /// Crossing speed to velocity mapping
    pub velocity: VelocityMap,

    /// Minimum time between any two state transitions (default: 2 ms)
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Time the release as well; when off, note-offs carry velocity 0
    #[serde(default)]
    pub release_velocity: bool,
}

impl ThresholdConfig {
    pub fn new(
        min_note_threshold: u32,
        trigger_value: u32,
        velocity: VelocityMap,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            min_note_threshold,
            trigger_value,
            input: InputRange::default(),
            velocity,
            debounce_ms: default_debounce(),
            release_velocity: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Trigger value placed `offset` above the arm threshold, capped at the
    /// top of the output range
    pub fn with_offset(
        min_note_threshold: u32,
        offset: u32,
        velocity: VelocityMap,
    ) -> Result<Self, ConfigError> {
        let output_max = InputRange::default().output_max;
        let trigger_value = min_note_threshold.saturating_add(offset).min(output_max);
        Self::new(min_note_threshold, trigger_value, velocity)
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

    pub fn with_release_velocity(mut self, enabled: bool) -> Self {
        self.release_velocity = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.input.validate()?;
        self.velocity.validate()?;
        if self.min_note_threshold >= self.trigger_value {
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
        Ok(())
    }

    /// Threshold units travelled between arm and commit
    pub fn distance(&self) -> u32 {
        self.trigger_value - self.min_note_threshold
    }
}

/// Position in the note cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocityState {
    Idle,
    Arming { since_ms: u64 },
    Active,
    Releasing { since_ms: u64 },
}

/// Two-threshold trigger with crossing-time velocity
#[derive(Debug, Clone)]
pub struct VelocityTrigger {
    config: ThresholdConfig,
    state: VelocityState,
    debounce: Debounce,
}

impl VelocityTrigger {
    pub fn new(config: ThresholdConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            debounce: Debounce::new(config.debounce_ms),
            config,
            state: VelocityState::Idle,
        })
    }

    pub fn state(&self) -> VelocityState {
        self.state
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Velocity for a crossing that took `elapsed_ms`
    pub fn velocity_for(&self, elapsed_ms: u64) -> u8 {
        let physical = VelocityMap::physical_velocity(self.config.distance(), elapsed_ms);
        self.config.velocity.intensity(physical)
    }

    pub fn set_thresholds(&mut self, min_note_threshold: u32, trigger_value: u32) -> Result<(), ConfigError> {
        let config = ThresholdConfig {
            min_note_threshold,
            trigger_value,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_velocity_bounds(&mut self, min_physical: f32, max_physical: f32) -> Result<(), ConfigError> {
        let velocity = VelocityMap {
            min_physical,
            max_physical,
            ..self.config.velocity
        };
        velocity.validate()?;
        self.config.velocity = velocity;
        Ok(())
    }

    pub fn set_input_range(&mut self, input: InputRange) -> Result<(), ConfigError> {
        let config = ThresholdConfig { input, ..self.config };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_debounce_ms(&mut self, debounce_ms: u64) {
        self.config.debounce_ms = debounce_ms;
        self.debounce.set_interval_ms(debounce_ms);
    }

    pub fn set_release_velocity(&mut self, enabled: bool) {
        self.config.release_velocity = enabled;
    }
}

impl VelocityTrigger {
    /// The transition `value` asks for from the current state, if any
    fn next_state(&self, value: u32, now_ms: u64) -> Option<VelocityState> {
        let min_note = self.config.min_note_threshold;
        let trigger = self.config.trigger_value;
        match self.state {
            VelocityState::Idle if value >= min_note => Some(VelocityState::Arming { since_ms: now_ms }),
            VelocityState::Arming { .. } if value < min_note => Some(VelocityState::Idle),
            VelocityState::Arming { .. } if value >= trigger => Some(VelocityState::Active),
            VelocityState::Active if value < trigger => Some(VelocityState::Releasing { since_ms: now_ms }),
            VelocityState::Releasing { .. } if value >= trigger => Some(VelocityState::Active),
            VelocityState::Releasing { .. } if value < min_note => Some(VelocityState::Idle),
            _ => None,
        }
    }

    /// Apply at most one transition; returns whether one was applied
    fn step(&mut self, value: u32, now_ms: u64, emitted: &mut Emitted) -> bool {
        let Some(next) = self.next_state(value, now_ms) else {
            return false;
        };
        if !self.debounce.ready(now_ms) {
            trace!(value, from = ?self.state, to = ?next, "transition deferred by debounce");
            return false;
        }

        match (self.state, next) {
            (VelocityState::Idle, _) => trace!(value, "armed"),
            (VelocityState::Arming { .. }, VelocityState::Idle) => {
                debug!(value, "arm discarded without reaching trigger");
            }
            (VelocityState::Arming { since_ms }, _) => {
                let elapsed = now_ms.saturating_sub(since_ms);
                let velocity = self.velocity_for(elapsed);
                debug!(value, elapsed, velocity, "note on");
                emitted.push(Event::on(velocity as u16));
            }
            (VelocityState::Active, _) => trace!(value, "releasing"),
            (VelocityState::Releasing { .. }, VelocityState::Active) => {
                trace!(value, "release abandoned");
            }
            (VelocityState::Releasing { since_ms }, _) => {
                let elapsed = now_ms.saturating_sub(since_ms);
                let velocity = if self.config.release_velocity {
                    self.velocity_for(elapsed)
                } else {
                    0
                };
                debug!(value, elapsed, velocity, "note off");
                emitted.push(Event::off(velocity as u16));
            }
        }

        self.state = next;
        self.debounce.mark(now_ms);
        true
    }
}

impl Trigger for VelocityTrigger {
    /// Every transition waits out the debounce window after the previous
    /// one, so with a non-zero window one evaluation applies at most one.
    /// With a zero window transitions cascade until the state settles.
    fn evaluate(&mut self, value: u32, now_ms: u64) -> Emitted {
        let value = self.config.input.apply(value);
        let mut emitted = Emitted::none();
        while self.step(value, now_ms, &mut emitted) {}
        emitted
    }

    fn is_on(&self) -> bool {
        matches!(
            self.state,
            VelocityState::Active | VelocityState::Releasing { .. }
        )
    }

    fn reset(&mut self) {
        self.state = VelocityState::Idle;
        self.debounce.reset();
    }
}
