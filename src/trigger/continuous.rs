//! Change-only continuous trigger

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{Emitted, Event, Trigger};
use crate::error::ConfigError;
use crate::mapping::InputRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousConfig {
    #[serde(default)]
    pub input: InputRange,
}

impl ContinuousConfig {
    pub fn new(input: InputRange) -> Self {
        Self { input }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.input.validate()
    }
}

/// Reports the pre-processed value whenever it differs from the last one sent
#[derive(Debug, Clone)]
pub struct ContinuousTrigger {
    config: ContinuousConfig,
    last_sent: Option<u32>,
}

impl ContinuousTrigger {
    pub fn new(config: ContinuousConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            last_sent: None,
        })
    }

    pub fn config(&self) -> &ContinuousConfig {
        &self.config
    }

    pub fn last_sent(&self) -> Option<u32> {
        self.last_sent
    }
}

impl Trigger for ContinuousTrigger {
    fn evaluate(&mut self, value: u32, _now_ms: u64) -> Emitted {
        let value = self.config.input.apply(value);
        if self.last_sent == Some(value) {
            return Emitted::none();
        }
        trace!(value, "continuous update");
        self.last_sent = Some(value);
        Emitted::one(Event::update(value as u16))
    }

    /// Continuous controls have no gate
    fn is_on(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.last_sent = None;
    }
}
