//! Input clamping and integer range remapping
//!
//! Every trigger runs its input through an [`InputRange`] before comparing
//! against thresholds, so thresholds are always expressed in the trigger's
//! native `0..=output_max` domain regardless of the sensor range.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Native range of a 7-bit control value
pub const DEFAULT_OUTPUT_MAX: u32 = 127;

/// Integer linear map with truncation toward zero.
///
/// `x` is not clamped first; the result is clamped to the output range so
/// out-of-range inputs saturate instead of wrapping. A degenerate input
/// range maps everything to `out_min`.
pub fn map_range(x: u32, in_min: u32, in_max: u32, out_min: u32, out_max: u32) -> u32 {
    if in_min == in_max {
        return out_min;
    }
    let (x, in_min, in_max) = (x as i64, in_min as i64, in_max as i64);
    let (out_min, out_max) = (out_min as i64, out_max as i64);

    let mapped = (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min;
    mapped.clamp(out_min.min(out_max), out_min.max(out_max)) as u32
}

/// Input pre-processing shared by all triggers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputRange {
    /// Lower bound of the sensor range that gets remapped (enables remapping
    /// together with `max_input`)
    #[serde(default)]
    pub min_input: Option<u32>,

    /// Upper bound of the sensor range that gets remapped
    #[serde(default)]
    pub max_input: Option<u32>,

    /// Flip the mapping so `min_input` lands on `output_max`
    #[serde(default)]
    pub invert: bool,

    /// Top of the native output domain (default: 127)
    #[serde(default = "default_output_max")]
    pub output_max: u32,
}

fn default_output_max() -> u32 {
    DEFAULT_OUTPUT_MAX
}

impl Default for InputRange {
    fn default() -> Self {
        Self::native(DEFAULT_OUTPUT_MAX)
    }
}

impl InputRange {
    /// Clamp-only pre-processing into `0..=output_max`
    pub fn native(output_max: u32) -> Self {
        Self {
            min_input: None,
            max_input: None,
            invert: false,
            output_max,
        }
    }

    /// Clamp to `[min, max]` and remap onto `0..=127`
    pub fn remap(min: u32, max: u32) -> Result<Self, ConfigError> {
        let range = Self {
            min_input: Some(min),
            max_input: Some(max),
            ..Self::default()
        };
        range.validate()?;
        Ok(range)
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn with_output_max(mut self, output_max: u32) -> Self {
        self.output_max = output_max;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_max == 0 || self.output_max > 0x3FFF {
            return Err(ConfigError::OutputRange(self.output_max));
        }
        match (self.min_input, self.max_input) {
            (Some(min), Some(max)) if min >= max => Err(ConfigError::InputRange { min, max }),
            (Some(min), None) => Err(ConfigError::InputRange { min, max: 0 }),
            (None, Some(max)) => Err(ConfigError::InputRange { min: 0, max }),
            _ => Ok(()),
        }
    }

    /// Whether clamp-and-remap is enabled
    pub fn is_remapping(&self) -> bool {
        self.min_input.is_some() && self.max_input.is_some()
    }

    pub fn apply(&self, value: u32) -> u32 {
        match (self.min_input, self.max_input) {
            (Some(min), Some(max)) => {
                let clamped = value.clamp(min, max);
                if self.invert {
                    map_range(clamped, min, max, self.output_max, 0)
                } else {
                    map_range(clamped, min, max, 0, self.output_max)
                }
            }
            _ => {
                let clamped = value.min(self.output_max);
                if self.invert {
                    self.output_max - clamped
                } else {
                    clamped
                }
            }
        }
    }
}
