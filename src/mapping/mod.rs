//! Numeric mapping utilities
//!
//! Range remapping, bit-depth scaling, response curves and the
//! physical-velocity to intensity map shared by every pipeline stage.

mod bit_depth;
mod curve;
mod linear;
mod range;
mod velocity;

pub use bit_depth::{decrease_bit_depth, increase_bit_depth, max_value, scale_bit_depth};
pub use curve::ResponseCurve;
pub use linear::LinearMapper;
pub use range::{map_range, InputRange, DEFAULT_OUTPUT_MAX};
pub use velocity::VelocityMap;
