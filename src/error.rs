//! Construction-time errors
//!
//! Every validating constructor in the crate returns a [`ConfigError`].
//! Nothing in the polling path can fail; a bad configuration is rejected
//! once, before the first tick.

use thiserror::Error;

/// A configuration contract violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("output precision must be between 1 and {max} bits, got {got}")]
    Precision { got: u8, max: u8 },

    #[error("input precision must be between 1 and 32 bits, got {0}")]
    InputPrecision(u8),

    #[error("coefficient '{name}' must be in (0, 1], got {value}")]
    Coefficient { name: &'static str, value: f32 },

    #[error("'{name}' must be finite and positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },

    #[error("baseline freeze threshold must not be negative, got {0}")]
    FreezeThreshold(f32),

    #[error("hysteresis cannot collapse {bits} bits of a {input_bits}-bit input")]
    HysteresisBits { bits: u8, input_bits: u8 },

    #[error("hysteresis expects {input_bits}-bit input but the conditioner produces {precision} bits")]
    HysteresisPrecision { input_bits: u8, precision: u8 },

    #[error("arm threshold {min_note} must be below trigger value {trigger}")]
    Thresholds { min_note: u32, trigger: u32 },

    #[error("threshold {value} is above the output range maximum {max}")]
    ThresholdRange { value: u32, max: u32 },

    #[error("input range minimum {min} must be below maximum {max}")]
    InputRange { min: u32, max: u32 },

    #[error("output range maximum must be between 1 and 16383, got {0}")]
    OutputRange(u32),

    #[error("minimum physical velocity {min} must be below maximum {max}")]
    PhysicalVelocity { min: f32, max: f32 },

    #[error("velocity output range {min}..={max} is invalid (expected 0 <= min <= max <= 127)")]
    VelocityOutput { min: u8, max: u8 },

    #[error("MIDI channel must be between 0 and 15, got {0}")]
    MidiChannel(u8),

    #[error("MIDI {name} must be between 0 and 127, got {value}")]
    DataByte { name: &'static str, value: u8 },
}
