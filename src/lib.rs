//! sensemidi - Sensor signal conditioning and threshold-triggered MIDI
//!
//! Raw readings from drifting or noisy sensors go through a conditioner
//! (adaptive baseline filter or direct bit-depth scaling), an optional
//! hysteresis quantizer and a trigger that turns the stable value into
//! note and controller events.

pub mod conditioning;
pub mod config;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod sources;
pub mod trigger;

pub use config::SensorConfig;
pub use engine::{Channel, ChannelId, Engine, EventSink};
pub use error::ConfigError;
pub use trigger::{Event, EventKind, Trigger};
