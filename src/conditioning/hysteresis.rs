//! Hysteresis quantizer
//!
//! Drops a fixed number of low bits from its input and only reports a new
//! reduced value once the input leaves a band centred on the last reported
//! one. The band is one step wide on each side, so noise confined to a
//! single step reports at most once and a signal sitting on a step boundary
//! does not chatter between the two neighbouring levels.

use crate::error::ConfigError;
use crate::mapping::max_value;

/// Bit-reducing hysteresis filter
#[derive(Debug, Clone, PartialEq)]
pub struct Hysteresis {
    bits: u8,
    input_bits: u8,
    previous: u32,
}

impl Hysteresis {
    /// Collapse `bits` low bits of an `input_bits`-wide value
    pub fn new(bits: u8, input_bits: u8) -> Result<Self, ConfigError> {
        if input_bits == 0 || input_bits > 32 {
            return Err(ConfigError::InputPrecision(input_bits));
        }
        if bits >= input_bits {
            return Err(ConfigError::HysteresisBits { bits, input_bits });
        }
        Ok(Self {
            bits,
            input_bits,
            previous: 0,
        })
    }

    /// Feed a value; returns `true` when a new reduced value was reported
    pub fn update(&mut self, value: u32) -> bool {
        let max_in = max_value(self.input_bits) as u64;
        let value = (value as u64).min(max_in);

        let changed = if self.bits == 0 {
            value != self.previous as u64
        } else {
            let max_out = max_in >> self.bits;
            let offset = 1u64 << (self.bits - 1);
            let margin = (1u64 << self.bits) - 1;
            let previous = self.previous as u64;
            let centre = (previous << self.bits) | offset;

            let lower = if previous > 0 { centre - margin } else { 0 };
            let upper = if previous < max_out { centre + margin } else { max_in };
            value < lower || value > upper
        };

        if changed {
            self.previous = (value >> self.bits) as u32;
        }
        changed
    }

    /// Last reported reduced value (0 before the first report)
    pub fn value(&self) -> u32 {
        self.previous
    }

    /// Number of collapsed bits
    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn input_bits(&self) -> u8 {
        self.input_bits
    }

    /// Width of the reported values
    pub fn output_bits(&self) -> u8 {
        self.input_bits - self.bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_on_large_move() {
        let mut h = Hysteresis::new(1, 7).unwrap();
        assert!(h.update(100));
        assert_eq!(h.value(), 50);
        assert!(h.update(20));
        assert_eq!(h.value(), 10);
    }

    #[test]
    fn test_noise_within_one_step_reports_once() {
        let mut h = Hysteresis::new(2, 7).unwrap();
        let noise = [40, 41, 42, 43, 41, 40, 43, 42];
        let reports = noise.iter().filter(|&&v| h.update(v)).count();
        assert_eq!(reports, 1);
        assert_eq!(h.value(), 10);
    }

    #[test]
    fn test_boundary_oscillation_does_not_chatter() {
        let mut h = Hysteresis::new(1, 7).unwrap();
        assert!(h.update(9));
        assert_eq!(h.value(), 4);
        // 10 is the next level, but still inside the band around 4
        for v in [10, 9, 10, 9, 10] {
            assert!(!h.update(v));
        }
        assert!(h.update(11));
        assert_eq!(h.value(), 5);
    }

    #[test]
    fn test_small_values_before_first_report() {
        let mut h = Hysteresis::new(1, 7).unwrap();
        assert!(!h.update(0));
        assert!(!h.update(2));
        assert_eq!(h.value(), 0);
        assert!(h.update(3));
        assert_eq!(h.value(), 1);
    }

    #[test]
    fn test_top_of_range_reachable() {
        let mut h = Hysteresis::new(3, 7).unwrap();
        assert!(h.update(127));
        assert_eq!(h.value(), 15);
        assert!(!h.update(125));
        assert!(!h.update(500));
    }

    #[test]
    fn test_returning_to_zero() {
        let mut h = Hysteresis::new(1, 7).unwrap();
        assert!(h.update(60));
        assert!(h.update(0));
        assert_eq!(h.value(), 0);
    }

    #[test]
    fn test_zero_bits_reports_every_change() {
        let mut h = Hysteresis::new(0, 7).unwrap();
        assert!(h.update(5));
        assert!(!h.update(5));
        assert!(h.update(6));
        assert_eq!(h.value(), 6);
        assert_eq!(h.output_bits(), 7);
    }

    #[test]
    fn test_invalid_widths() {
        assert!(Hysteresis::new(7, 7).is_err());
        assert!(Hysteresis::new(1, 0).is_err());
        assert!(Hysteresis::new(1, 33).is_err());
        assert!(Hysteresis::new(12, 32).is_ok());
    }
}
