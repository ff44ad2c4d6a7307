//! Raw sample sources and clocks
//!
//! Sources produce unsigned integer readings at whatever cadence the caller
//! polls them. Hardware access lives behind [`SampleSource`]; everything in
//! this module is either an adapter or a software stand-in for a sensor.

mod clock;
mod source;
mod trace;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use source::{FnSource, LastValid, SampleSource, ScriptedSource};
pub use trace::{load_trace, ReplaySource, Trace, TraceCursor, TraceError, TraceRow, TraceTicks};
