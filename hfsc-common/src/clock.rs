use tokio::time::Instant;

/// Machine clock frequency in ticks per second.
///
/// One tick is one nanosecond. At this resolution the fixed-point slope
/// scaling in `hfsc-curve` keeps at least three significant decimal digits
/// for link rates between 100 Kbit/s and 1 Gbit/s.
pub const MACHCLK_FREQ: u64 = 1_000_000_000;

/// Frequency of the periodic scheduling tick, per second.
pub const SCHED_HZ: u64 = 1_000;

/// Machine ticks per scheduling tick.
///
/// A rate-limited class whose fit time lags the current time by more than
/// this is considered to have drifted and gets its fit-time adjusted.
pub const MACHCLK_PER_TICK: u64 = MACHCLK_FREQ / SCHED_HZ;

/// Monotonic machine clock, anchored at creation.
///
/// Built on [`tokio::time::Instant`] so that tests running under a paused
/// runtime can drive it with `tokio::time::advance`. Reading the clock
/// outside a runtime falls back to real monotonic time.
#[derive(Debug, Clone, Copy)]
pub struct MachClock {
    origin: Instant,
}

impl MachClock {
    /// Creates a clock anchored at the current instant. Time zero is "now".
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }

    /// Returns the current time in machine ticks since the clock was created.
    pub fn now(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

impl Default for MachClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn clock_follows_paused_time() {
        let clock = MachClock::new();
        assert_eq!(clock.now(), 0);

        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        assert_eq!(clock.now(), 5 * 1_000_000);
    }
}
