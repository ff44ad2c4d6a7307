//! Float linear interpolation

/// Maps `[in_min, in_max]` onto `[out_min, out_max]`
///
/// The slope is computed once at construction. A zero-width input range
/// collapses to `out_min`. Output is clamped to the output range unless
/// clamping is turned off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMapper {
    in_min: f32,
    out_min: f32,
    out_max: f32,
    slope: f32,
    clamp: bool,
}

impl LinearMapper {
    pub fn new(in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> Self {
        let width = in_max - in_min;
        let slope = if width.abs() < f32::EPSILON {
            0.0
        } else {
            (out_max - out_min) / width
        };
        Self {
            in_min,
            out_min,
            out_max,
            slope,
            clamp: true,
        }
    }

    /// Let values outside the input range extrapolate
    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }

    /// Output units per input unit
    pub fn slope(&self) -> f32 {
        self.slope
    }

    pub fn map(&self, input: f32) -> f32 {
        let output = self.out_min + (input - self.in_min) * self.slope;
        if self.clamp {
            output.clamp(self.out_min.min(self.out_max), self.out_min.max(self.out_max))
        } else {
            output
        }
    }
}
