//! Physical velocity to intensity mapping

use serde::{Deserialize, Serialize};

use super::LinearMapper;
use crate::error::ConfigError;

/// Maps a crossing speed (threshold units per millisecond) to an event
/// intensity such as a MIDI velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityMap {
    /// Speeds at or below this map to `min_output`
    pub min_physical: f32,

    /// Speeds at or above this map to `max_output`
    pub max_physical: f32,

    /// Intensity for the slowest crossing (default: 1)
    #[serde(default = "default_min_output")]
    pub min_output: u8,

    /// Intensity for the fastest crossing (default: 127)
    #[serde(default = "default_max_output")]
    pub max_output: u8,
}

fn default_min_output() -> u8 {
    1
}
fn default_max_output() -> u8 {
    127
}

impl VelocityMap {
    pub fn new(min_physical: f32, max_physical: f32) -> Result<Self, ConfigError> {
        let map = Self {
            min_physical,
            max_physical,
            min_output: default_min_output(),
            max_output: default_max_output(),
        };
        map.validate()?;
        Ok(map)
    }

    pub fn with_output(mut self, min_output: u8, max_output: u8) -> Result<Self, ConfigError> {
        self.min_output = min_output;
        self.max_output = max_output;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_physical.is_finite()
            || !self.max_physical.is_finite()
            || self.min_physical >= self.max_physical
        {
            return Err(ConfigError::PhysicalVelocity {
                min: self.min_physical,
                max: self.max_physical,
            });
        }
        if self.min_output > self.max_output || self.max_output > 127 {
            return Err(ConfigError::VelocityOutput {
                min: self.min_output,
                max: self.max_output,
            });
        }
        Ok(())
    }

    /// Distance over time, with elapsed time floored to 1 ms
    pub fn physical_velocity(distance: u32, elapsed_ms: u64) -> f32 {
        distance as f32 / elapsed_ms.max(1) as f32
    }

    pub fn intensity(&self, physical: f32) -> u8 {
        if physical >= self.max_physical {
            return self.max_output;
        }
        if physical <= self.min_physical {
            return self.min_output;
        }
        let mapped = LinearMapper::new(
            self.min_physical,
            self.max_physical,
            self.min_output as f32,
            self.max_output as f32,
        )
        .map(physical);

        (mapped as u8).clamp(self.min_output, self.max_output)
    }
}
