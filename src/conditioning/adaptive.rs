//! Adaptive baseline filter
//!
//! Turns a raw, drifting sensor reading (capacitive touch in particular)
//! into a stable, range-mapped output at a fixed bit depth.
//!
//! Each evaluation runs the same fixed sequence:
//!
//! 1. first-stage exponential smoothing of the raw reading,
//! 2. delta against the baseline, clamped at zero,
//! 3. baseline tracking, frozen while the delta is at or above the freeze
//!    threshold so a sustained touch is not absorbed into the baseline,
//! 4. normalization by `delta_max`,
//! 5. the response curve,
//! 6. scaling to `2^precision - 1`,
//! 7. second-stage smoothing of the mapped value,
//! 8. rounding to the nearest integer.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ConfigError;
use crate::mapping::{max_value, ResponseCurve};
use crate::sources::SampleSource;

/// Widest output the filter produces
pub const MAX_PRECISION: u8 = 16;

/// Tuning parameters for an [`AdaptiveFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Output bit depth (default: 7, i.e. 0..=127)
    #[serde(default = "default_precision")]
    pub precision: u8,

    /// Minimum time between polls in milliseconds (default: 50)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Weight of each new raw sample in the first smoothing stage (default: 0.05)
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,

    /// Weight of the smoothed value in baseline tracking (default: 0.01)
    #[serde(default = "default_baseline_rate")]
    pub baseline_rate: f32,

    /// Delta at or above which the baseline stops tracking (default: 100)
    #[serde(default = "default_freeze_threshold")]
    pub baseline_freeze_threshold: f32,

    /// Delta that maps to full scale (default: 4000)
    #[serde(default = "default_delta_max")]
    pub delta_max: f32,

    /// Curve applied to the normalized delta (default: linear)
    #[serde(default)]
    pub curve: ResponseCurve,

    /// Weight of each new mapped value in the second smoothing stage (default: 0.2)
    #[serde(default = "default_output_smoothing")]
    pub output_smoothing: f32,
}

fn default_precision() -> u8 { 7 }
fn default_poll_interval() -> u64 { 50 }
fn default_smoothing() -> f32 { 0.05 }
fn default_baseline_rate() -> f32 { 0.01 }
fn default_freeze_threshold() -> f32 { 100.0 }
fn default_delta_max() -> f32 { 4000.0 }
fn default_output_smoothing() -> f32 { 0.2 }

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            poll_interval_ms: default_poll_interval(),
            smoothing: default_smoothing(),
            baseline_rate: default_baseline_rate(),
            baseline_freeze_threshold: default_freeze_threshold(),
            delta_max: default_delta_max(),
            curve: ResponseCurve::default(),
            output_smoothing: default_output_smoothing(),
        }
    }
}

fn check_coefficient(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Coefficient { name, value })
    }
}

impl FilterParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.precision == 0 || self.precision > MAX_PRECISION {
            return Err(ConfigError::Precision {
                got: self.precision,
                max: MAX_PRECISION,
            });
        }
        check_coefficient("smoothing", self.smoothing)?;
        check_coefficient("baseline_rate", self.baseline_rate)?;
        check_coefficient("output_smoothing", self.output_smoothing)?;

        if !(self.delta_max.is_finite() && self.delta_max > 0.0) {
            return Err(ConfigError::NotPositive {
                name: "delta_max",
                value: self.delta_max,
            });
        }
        if !(self.baseline_freeze_threshold >= 0.0) {
            return Err(ConfigError::FreezeThreshold(self.baseline_freeze_threshold));
        }
        self.curve.validate()
    }
}

/// Per-channel filter state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterState {
    pub raw: f32,
    pub smoothed: f32,
    pub baseline: f32,
    pub delta: f32,
    pub mapped_smoothed: f32,
    pub last_output: u32,
    pub last_update_ms: u64,
}

/// Baseline-tracking, two-stage smoothing filter
pub struct AdaptiveFilter<S> {
    source: S,
    params: FilterParams,
    state: FilterState,
    initialized: bool,
}

impl<S: SampleSource> AdaptiveFilter<S> {
    /// Create a filter reading from `source`
    pub fn new(source: S, params: FilterParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            source,
            params,
            state: FilterState::default(),
            initialized: false,
        })
    }

    /// Seed every stage from one raw sample
    pub fn initialize(&mut self) {
        let seed = self.source.read() as f32;
        self.state = FilterState {
            raw: seed,
            smoothed: seed,
            baseline: seed,
            ..FilterState::default()
        };
        self.initialized = true;
    }

    /// Re-seed the baseline from a fresh sample, keeping the poll cadence
    ///
    /// Call this when the sensor is known to be at rest. On a filter that
    /// was never initialized this is the same single read as `initialize`.
    pub fn reset_baseline(&mut self) {
        if !self.initialized {
            self.initialize();
            return;
        }
        let seed = self.source.read() as f32;
        let last_update_ms = self.state.last_update_ms;
        self.state = FilterState {
            raw: seed,
            smoothed: seed,
            baseline: seed,
            last_update_ms,
            ..FilterState::default()
        };
    }

    /// Read a new sample if the poll interval has elapsed
    ///
    /// Returns `true` when the output changed. Polling early is a no-op.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if !self.initialized {
            self.initialize();
        }
        if !self.is_due(now_ms) {
            return false;
        }
        self.state.last_update_ms = now_ms;

        let previous = self.state.last_output;
        self.state.raw = self.source.read() as f32;
        self.evaluate() != previous
    }

    /// Whether the poll interval has elapsed at `now_ms`
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.state.last_update_ms) >= self.params.poll_interval_ms
    }

    /// Advance both smoothing stages by one step and return the new output
    pub fn evaluate(&mut self) -> u32 {
        let p = &self.params;
        let s = &mut self.state;

        s.smoothed = s.smoothed * (1.0 - p.smoothing) + s.raw * p.smoothing;

        s.delta = (s.smoothed - s.baseline).max(0.0);

        if s.delta < p.baseline_freeze_threshold {
            s.baseline = s.baseline * (1.0 - p.baseline_rate) + s.smoothed * p.baseline_rate;
        }

        let normalized = (s.delta / p.delta_max).clamp(0.0, 1.0);
        let curved = p.curve.apply(normalized);

        let full_scale = max_value(p.precision) as f32;
        let mapped_raw = curved * full_scale;
        s.mapped_smoothed =
            s.mapped_smoothed * (1.0 - p.output_smoothing) + mapped_raw * p.output_smoothing;

        s.last_output = s.mapped_smoothed.round().clamp(0.0, full_scale) as u32;

        trace!(
            raw = s.raw,
            smoothed = s.smoothed,
            baseline = s.baseline,
            delta = s.delta,
            output = s.last_output,
            "filter step"
        );
        s.last_output
    }

    /// Last computed output
    pub fn value(&self) -> u32 {
        self.state.last_output
    }

    /// Last raw sample
    pub fn raw_value(&self) -> f32 {
        self.state.raw
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn precision(&self) -> u8 {
        self.params.precision
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_poll_interval(&mut self, interval_ms: u64) {
        self.params.poll_interval_ms = interval_ms;
    }

    pub fn set_baseline_freeze_threshold(&mut self, threshold: f32) {
        self.params.baseline_freeze_threshold = threshold.max(0.0);
    }

    /// Set the delta that maps to full scale (floored to a small positive value)
    pub fn set_delta_max(&mut self, delta_max: f32) {
        self.params.delta_max = delta_max.max(f32::EPSILON);
    }

    /// Replace the response curve; invalid curves are ignored
    pub fn set_curve(&mut self, curve: ResponseCurve) {
        if curve.validate().is_ok() {
            self.params.curve = curve;
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ScriptedSource;

    fn filter_with(samples: impl IntoIterator<Item = u32>) -> AdaptiveFilter<ScriptedSource> {
        AdaptiveFilter::new(ScriptedSource::new(samples), FilterParams::default()).unwrap()
    }

    #[test]
    fn test_initialize_seeds_state() {
        let mut filter = filter_with([2000]);
        filter.initialize();

        let state = filter.state();
        assert_eq!(state.raw, 2000.0);
        assert_eq!(state.smoothed, 2000.0);
        assert_eq!(state.baseline, 2000.0);
        assert_eq!(state.mapped_smoothed, 0.0);
        assert_eq!(filter.value(), 0);
    }

    #[test]
    fn test_early_poll_is_noop() {
        let mut filter = filter_with([2000, 2400, 2400, 2400]);
        filter.initialize();
        filter.poll(50);

        let before = *filter.state();
        for now in 51..100 {
            assert!(!filter.poll(now));
            assert_eq!(*filter.state(), before);
        }
        assert_eq!(filter.raw_value(), 2400.0);
    }

    #[test]
    fn test_first_poll_waits_for_interval() {
        let mut filter = filter_with([2000, 2400]);
        assert!(!filter.poll(0));
        assert!(filter.is_initialized());
        assert_eq!(filter.raw_value(), 2000.0);
    }

    #[test]
    fn test_baseline_frozen_while_delta_high() {
        let mut filter = filter_with([2000]);
        filter.initialize();
        filter.source_mut().push_repeated(3000, 500);

        let mut now = 0;
        let mut frozen_baseline = None;
        for _ in 0..300 {
            now += 50;
            filter.poll(now);
            let state = *filter.state();
            if state.delta >= filter.params().baseline_freeze_threshold {
                match frozen_baseline {
                    None => frozen_baseline = Some(state.baseline),
                    Some(b) => assert_eq!(state.baseline, b),
                }
            }
        }
        assert!(frozen_baseline.is_some());
    }

    #[test]
    fn test_baseline_tracks_slow_drift() {
        let mut filter = filter_with([2000]);
        filter.initialize();

        // Drift upward by one count every four polls: delta never reaches the freeze point
        let mut now = 0;
        for step in 1..=1600u32 {
            filter.source_mut().push(2000 + step / 4);
            now += 50;
            filter.poll(now);
        }
        let state = filter.state();
        assert!(state.baseline > 2200.0, "baseline did not follow drift: {}", state.baseline);
        assert!(state.delta < 100.0);
    }

    #[test]
    fn test_sustained_touch_scenario() {
        let params = FilterParams {
            baseline_freeze_threshold: 100.0,
            delta_max: 4000.0,
            precision: 7,
            ..FilterParams::default()
        };
        let mut filter = AdaptiveFilter::new(ScriptedSource::new([2000]), params).unwrap();
        filter.initialize();
        filter.source_mut().push_repeated(2400, 1000);

        let mut now = 0;
        for _ in 0..20 {
            now += 50;
            filter.poll(now);
        }
        let settled_baseline = filter.state().baseline;
        assert!(settled_baseline - 2000.0 < 5.0);

        for _ in 0..300 {
            now += 50;
            filter.poll(now);
        }
        let state = *filter.state();
        assert_eq!(state.baseline, settled_baseline);

        let expected = ((2400.0 - state.baseline) / 4000.0 * 127.0).round() as i64;
        let output = filter.value() as i64;
        assert!((output - expected).abs() <= 1, "output {} expected {}", output, expected);
        assert!(output > 0 && output < 127);
    }

    #[test]
    fn test_output_saturates_at_precision() {
        let params = FilterParams {
            precision: 10,
            delta_max: 100.0,
            smoothing: 1.0,
            output_smoothing: 1.0,
            ..FilterParams::default()
        };
        let mut filter = AdaptiveFilter::new(ScriptedSource::new([0, 5000]), params).unwrap();
        filter.initialize();
        assert!(filter.poll(50));
        assert_eq!(filter.value(), 1023);
    }

    #[test]
    fn test_poll_reports_change() {
        let params = FilterParams {
            smoothing: 1.0,
            output_smoothing: 1.0,
            poll_interval_ms: 10,
            ..FilterParams::default()
        };
        let mut filter =
            AdaptiveFilter::new(ScriptedSource::new([1000, 3000, 3000]), params).unwrap();
        filter.initialize();
        assert!(filter.poll(10));
        // 2000 / 4000 * 127 = 63.5 -> 64
        assert_eq!(filter.value(), 64);
        assert!(!filter.poll(20));
    }

    #[test]
    fn test_reset_baseline_keeps_cadence() {
        let mut filter = filter_with([2000]);
        filter.initialize();
        filter.source_mut().push_repeated(2600, 40);
        let mut now = 0;
        for _ in 0..30 {
            now += 50;
            filter.poll(now);
        }
        assert!(filter.value() > 0);

        filter.reset_baseline();
        let state = filter.state();
        assert_eq!(state.baseline, 2600.0);
        assert_eq!(state.smoothed, 2600.0);
        assert_eq!(state.last_output, 0);
        assert_eq!(state.last_update_ms, now);
        assert!(!filter.poll(now + 1));
    }

    #[test]
    fn test_reset_before_initialize_reads_once() {
        let mut filter = filter_with([2000, 2600]);
        filter.reset_baseline();
        assert!(filter.is_initialized());
        assert_eq!(filter.state().baseline, 2000.0);

        // The second sample is left for the first poll
        let interval = filter.params().poll_interval_ms;
        filter.poll(interval);
        assert_eq!(filter.raw_value(), 2600.0);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad = [
            FilterParams { precision: 0, ..FilterParams::default() },
            FilterParams { precision: 17, ..FilterParams::default() },
            FilterParams { smoothing: 0.0, ..FilterParams::default() },
            FilterParams { baseline_rate: 1.5, ..FilterParams::default() },
            FilterParams { delta_max: 0.0, ..FilterParams::default() },
            FilterParams { baseline_freeze_threshold: -1.0, ..FilterParams::default() },
            FilterParams { curve: ResponseCurve::Power { gamma: -2.0 }, ..FilterParams::default() },
        ];
        for params in bad {
            assert!(AdaptiveFilter::new(ScriptedSource::default(), params).is_err());
        }
    }

    #[test]
    fn test_params_from_yaml() {
        let params: FilterParams = serde_yaml::from_str("precision: 10\ndelta_max: 2500\n").unwrap();
        assert_eq!(params.precision, 10);
        assert_eq!(params.delta_max, 2500.0);
        assert_eq!(params.smoothing, 0.05);
        assert_eq!(params.poll_interval_ms, 50);
    }
}
