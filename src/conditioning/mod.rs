//! Signal conditioning: the first stages of a channel
//!
//! A [`Conditioner`] turns raw samples into a value at a fixed output
//! precision; an optional [`Hysteresis`] stage then suppresses jitter
//! before the value reaches a trigger.

mod adaptive;
mod direct;
mod hysteresis;

pub use adaptive::{AdaptiveFilter, FilterParams, FilterState, MAX_PRECISION};
pub use direct::{DirectParams, DirectReader};
pub use hysteresis::Hysteresis;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sources::SampleSource;

/// How a channel conditions its raw samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionerConfig {
    /// Baseline-tracking filter for drifting sensors
    Adaptive(FilterParams),
    /// Plain bit-depth scaling for stable sensors
    Direct(DirectParams),
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        ConditionerConfig::Adaptive(FilterParams::default())
    }
}

impl ConditionerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ConditionerConfig::Adaptive(params) => params.validate(),
            ConditionerConfig::Direct(params) => params.validate(),
        }
    }

    pub fn precision(&self) -> u8 {
        match self {
            ConditionerConfig::Adaptive(params) => params.precision,
            ConditionerConfig::Direct(params) => params.precision,
        }
    }

    pub fn build<S: SampleSource>(&self, source: S) -> Result<Conditioner<S>, ConfigError> {
        Ok(match *self {
            ConditionerConfig::Adaptive(params) => {
                Conditioner::Adaptive(AdaptiveFilter::new(source, params)?)
            }
            ConditionerConfig::Direct(params) => {
                Conditioner::Direct(DirectReader::new(source, params)?)
            }
        })
    }
}

/// First stage of a channel
pub enum Conditioner<S = Box<dyn SampleSource>> {
    Adaptive(AdaptiveFilter<S>),
    Direct(DirectReader<S>),
}

impl<S: SampleSource> Conditioner<S> {
    /// Seed the conditioner from one reading of the sensor at rest
    pub fn begin(&mut self) {
        if let Conditioner::Adaptive(filter) = self {
            filter.initialize();
        }
    }

    /// Re-seed the baseline; direct readers have none
    pub fn reset_baseline(&mut self) {
        if let Conditioner::Adaptive(filter) = self {
            filter.reset_baseline();
        }
    }

    /// Poll the sensor; `None` when the poll interval has not elapsed,
    /// otherwise whether the output changed
    pub fn poll(&mut self, now_ms: u64) -> Option<bool> {
        match self {
            Conditioner::Adaptive(filter) => {
                let due = filter.is_due(now_ms);
                let changed = filter.poll(now_ms);
                due.then_some(changed)
            }
            Conditioner::Direct(reader) => {
                let due = reader.is_due(now_ms);
                let changed = reader.poll(now_ms);
                due.then_some(changed)
            }
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            Conditioner::Adaptive(filter) => filter.value(),
            Conditioner::Direct(reader) => reader.value(),
        }
    }

    pub fn raw_value(&self) -> f32 {
        match self {
            Conditioner::Adaptive(filter) => filter.raw_value(),
            Conditioner::Direct(reader) => reader.raw_value() as f32,
        }
    }

    pub fn precision(&self) -> u8 {
        match self {
            Conditioner::Adaptive(filter) => filter.precision(),
            Conditioner::Direct(reader) => reader.precision(),
        }
    }

    pub fn set_poll_interval(&mut self, interval_ms: u64) {
        match self {
            Conditioner::Adaptive(filter) => filter.set_poll_interval(interval_ms),
            Conditioner::Direct(reader) => reader.set_poll_interval(interval_ms),
        }
    }
}
