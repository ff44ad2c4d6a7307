//! Response curves
//!
//! Shape a normalized `[0, 1]` signal before it is scaled to the output
//! range. All curves are monotonic and keep their end points fixed, so they
//! only change where along the travel the sensitivity sits.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Non-linear sensitivity applied to a normalized value
///
/// * `Power` computes `x^gamma`; `gamma = 1` is linear, `gamma > 1` is slow to
///   start, `gamma < 1` is fast to start.
/// * `Exponential` computes `(exp(k*x) - 1) / (exp(k) - 1)`: fine control at
///   low travel.
/// * `Logarithmic` computes `ln(1 + k*x) / ln(1 + k)`: coarse control at low
///   travel, fine control near full scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseCurve {
    Power { gamma: f32 },
    Exponential { factor: f32 },
    Logarithmic { factor: f32 },
}

impl Default for ResponseCurve {
    fn default() -> Self {
        ResponseCurve::Power { gamma: 1.0 }
    }
}

impl ResponseCurve {
    pub fn linear() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (name, value) = match *self {
            ResponseCurve::Power { gamma } => ("gamma", gamma),
            ResponseCurve::Exponential { factor } => ("factor", factor),
            ResponseCurve::Logarithmic { factor } => ("factor", factor),
        };
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::NotPositive { name, value })
        }
    }

    /// Apply the curve; input is clamped to `[0, 1]`
    pub fn apply(&self, normalized: f32) -> f32 {
        let x = normalized.clamp(0.0, 1.0);
        let shaped = match *self {
            ResponseCurve::Power { gamma } => {
                if gamma == 1.0 {
                    x
                } else {
                    x.powf(gamma)
                }
            }
            ResponseCurve::Exponential { factor } => {
                let denominator = factor.exp() - 1.0;
                if denominator.abs() < f32::EPSILON {
                    x
                } else {
                    ((factor * x).exp() - 1.0) / denominator
                }
            }
            ResponseCurve::Logarithmic { factor } => {
                let denominator = (1.0 + factor).ln();
                if denominator.abs() < f32::EPSILON {
                    x
                } else {
                    (1.0 + factor * x).ln() / denominator
                }
            }
        };
        shaped.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "expected {} ~= {}", a, b);
    }

    #[test]
    fn test_linear_is_identity() {
        let curve = ResponseCurve::linear();
        assert_eq!(curve.apply(0.0), 0.0);
        assert_eq!(curve.apply(0.25), 0.25);
        assert_eq!(curve.apply(1.0), 1.0);
    }

    #[test]
    fn test_endpoints_fixed() {
        let curves = [
            ResponseCurve::Power { gamma: 2.5 },
            ResponseCurve::Exponential { factor: 3.0 },
            ResponseCurve::Logarithmic { factor: 9.0 },
        ];
        for curve in curves {
            assert_close(curve.apply(0.0), 0.0);
            assert_close(curve.apply(1.0), 1.0);
        }
    }

    #[test]
    fn test_curve_shapes() {
        // With k=3, at t=0.5: (exp(1.5) - 1) / (exp(3) - 1) = 0.182
        let exp = ResponseCurve::Exponential { factor: 3.0 };
        assert!((exp.apply(0.5) - 0.182).abs() < 0.01);

        let log = ResponseCurve::Logarithmic { factor: 9.0 };
        assert!(log.apply(0.5) > 0.5);

        let square = ResponseCurve::Power { gamma: 2.0 };
        assert_close(square.apply(0.5), 0.25);
    }

    #[test]
    fn test_out_of_range_input_clamped() {
        let curve = ResponseCurve::Power { gamma: 0.5 };
        assert_eq!(curve.apply(-1.0), 0.0);
        assert_eq!(curve.apply(4.0), 1.0);
    }

    #[test]
    fn test_monotonic() {
        let curve = ResponseCurve::Exponential { factor: 5.0 };
        let mut previous = 0.0;
        for i in 0..=100 {
            let y = curve.apply(i as f32 / 100.0);
            assert!(y >= previous);
            previous = y;
        }
    }

    #[test]
    fn test_validate() {
        assert!(ResponseCurve::Power { gamma: 0.0 }.validate().is_err());
        assert!(ResponseCurve::Exponential { factor: f32::NAN }.validate().is_err());
        assert!(ResponseCurve::Logarithmic { factor: 2.0 }.validate().is_ok());
    }

    #[test]
    fn test_curve_from_yaml() {
        let curve: ResponseCurve = serde_yaml::from_str("kind: power\ngamma: 1.5\n").unwrap();
        assert_eq!(curve, ResponseCurve::Power { gamma: 1.5 });
    }
}
