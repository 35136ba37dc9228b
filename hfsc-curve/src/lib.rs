//! Service curve types and fixed-point curve arithmetic.
//!
//! A service curve is a two-segment piecewise-linear function mapping
//! elapsed time to bytes of guaranteed service (Stoica, Zhang and Ng,
//! SIGCOMM '97). Externally a curve is described by `(m1, d, m2)`: an
//! initial slope in bits per second, a breakpoint delay in milliseconds,
//! and a final slope in bits per second.
//!
//! Internally all arithmetic runs on scaled integers: slopes become bytes
//! per machine tick in fixed point, delays become machine ticks. The
//! scheduler never touches the external units on its hot path.

mod curve;
mod runtime;

pub use curve::{InternalCurve, ServiceCurve, INFINITY, ISM_SHIFT, SM_SHIFT};
pub use runtime::RuntimeCurve;
