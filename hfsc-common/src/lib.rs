//! Common time primitives for the hfsc crates.
//!
//! Everything the scheduler computes — eligible times, deadlines, virtual
//! times, fit times — is expressed in integer machine ticks of a single
//! monotonic clock defined here.

mod clock;

pub use clock::{MachClock, MACHCLK_FREQ, MACHCLK_PER_TICK, SCHED_HZ};
