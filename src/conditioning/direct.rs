//! Direct bit-depth reader for sensors that do not drift

use serde::{Deserialize, Serialize};

use super::adaptive::MAX_PRECISION;
use crate::error::ConfigError;
use crate::mapping::{max_value, scale_bit_depth};
use crate::sources::SampleSource;

/// Parameters for a [`DirectReader`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectParams {
    /// Resolution of the raw samples (default: 12, a typical ADC)
    #[serde(default = "default_input_bits")]
    pub input_bits: u8,

    /// Output bit depth (default: 7)
    #[serde(default = "default_precision")]
    pub precision: u8,

    /// Minimum time between polls in milliseconds (default: 0, every tick)
    #[serde(default)]
    pub poll_interval_ms: u64,
}

fn default_input_bits() -> u8 { 12 }
fn default_precision() -> u8 { 7 }

impl Default for DirectParams {
    fn default() -> Self {
        Self {
            input_bits: default_input_bits(),
            precision: default_precision(),
            poll_interval_ms: 0,
        }
    }
}

impl DirectParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_bits == 0 || self.input_bits > 32 {
            return Err(ConfigError::InputPrecision(self.input_bits));
        }
        if self.precision == 0 || self.precision > MAX_PRECISION {
            return Err(ConfigError::Precision {
                got: self.precision,
                max: MAX_PRECISION,
            });
        }
        Ok(())
    }
}

/// Reads a source and rescales it to the output precision
pub struct DirectReader<S> {
    source: S,
    params: DirectParams,
    raw: u32,
    value: u32,
    last_update_ms: u64,
}

impl<S: SampleSource> DirectReader<S> {
    pub fn new(source: S, params: DirectParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            source,
            params,
            raw: 0,
            value: 0,
            last_update_ms: 0,
        })
    }

    /// Read a new sample if the poll interval has elapsed; `true` on change
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if !self.is_due(now_ms) {
            return false;
        }
        self.last_update_ms = now_ms;

        self.raw = self.source.read().min(max_value(self.params.input_bits));
        let value = scale_bit_depth(self.raw, self.params.input_bits, self.params.precision);
        let changed = value != self.value;
        self.value = value;
        changed
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_update_ms) >= self.params.poll_interval_ms
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn raw_value(&self) -> u32 {
        self.raw
    }

    pub fn precision(&self) -> u8 {
        self.params.precision
    }

    pub fn set_poll_interval(&mut self, interval_ms: u64) {
        self.params.poll_interval_ms = interval_ms;
    }
}
