//! Hierarchical Fair Service Curve (HFSC) packet scheduler.
//!
//! A per-link queueing discipline enforcing both real-time (deadline-based)
//! and proportional link-sharing guarantees across a tree of traffic
//! classes, following Stoica, Zhang and Ng (SIGCOMM '97), extended with an
//! upper-limit curve for rate capping.
//!
//! Each class may carry up to three service curves:
//!
//! - a **real-time** curve, from which eligible times and deadlines are
//!   derived for earliest-deadline-first dispatch;
//! - a **link-share** curve, from which virtual time is derived for
//!   proportional fairness among siblings;
//! - an **upper-limit** curve capping the class's rate via its fit time.
//!
//! [`HfscScheduler`] is the synchronous core: classification tags go in
//! through [`HfscScheduler::enqueue`], scheduled packets come out of
//! [`HfscScheduler::dequeue`]. [`HfscHandle`] wraps a scheduler for an
//! owning interface: one coarse lock around every operation plus a drain
//! driver that retries dequeues whenever backlogged traffic is not yet
//! allowed to leave.

mod class;
mod error;
mod iface;
mod list;
mod pool;
mod queue;
mod sched;
mod stats;

pub use class::ClassConfig;
pub use error::{EnqueueError, Error};
pub use iface::{HfscHandle, RETRY_INTERVAL};
pub use queue::DEFAULT_QLIMIT;
pub use sched::{HfscScheduler, MAX_CLASSES};
pub use stats::{ClassStats, PktCounter};

pub use hfsc_common::{MachClock, MACHCLK_FREQ};
pub use hfsc_curve::ServiceCurve;
