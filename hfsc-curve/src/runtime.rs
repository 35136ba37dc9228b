use crate::curve::{seg_x2y, seg_y2x, InternalCurve, SM_SHIFT};

/// A service curve anchored at a point in (time, bytes-served) space.
///
/// The scheduler keeps one of these per criterion (deadline, eligible,
/// virtual, upper-limit) and re-anchors or lower-envelopes it whenever a
/// class starts a new backlog period. Both evaluation directions are
/// supported: `x2y` answers "how many bytes by time x", `y2x` answers "at
/// what time is byte y reached".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeCurve {
    /// Anchor time in machine ticks.
    pub x: u64,
    /// Bytes served at the anchor.
    pub y: u64,
    /// Scaled slope of the first segment.
    pub sm1: u64,
    /// Scaled inverse slope of the first segment.
    pub ism1: u64,
    /// First-segment length in ticks.
    pub dx: u64,
    /// First-segment height in bytes.
    pub dy: u64,
    /// Scaled slope of the second segment.
    pub sm2: u64,
    /// Scaled inverse slope of the second segment.
    pub ism2: u64,
}

impl RuntimeCurve {
    /// Anchors `isc` at `(x, y)`.
    pub fn new(isc: &InternalCurve, x: u64, y: u64) -> Self {
        Self {
            x,
            y,
            sm1: isc.sm1,
            ism1: isc.ism1,
            dx: isc.dx,
            dy: isc.dy,
            sm2: isc.sm2,
            ism2: isc.ism2,
        }
    }

    /// Bytes served by time `x`.
    pub fn x2y(&self, x: u64) -> u64 {
        if x <= self.x {
            self.y
        } else if x <= self.x + self.dx {
            // x belongs to the first segment
            self.y + seg_x2y(x - self.x, self.sm1)
        } else {
            self.y + self.dy + seg_x2y(x - self.x - self.dx, self.sm2)
        }
    }

    /// Time at which byte `y` is served. Saturates at [`crate::INFINITY`]
    /// when a zero-rate segment can never reach `y`.
    pub fn y2x(&self, y: u64) -> u64 {
        if y < self.y {
            self.x
        } else if y <= self.y + self.dy {
            if self.dy == 0 {
                // vertical first segment: y belongs to the breakpoint
                self.x + self.dx
            } else {
                self.x.saturating_add(seg_y2x(y - self.y, self.ism1))
            }
        } else {
            (self.x + self.dx).saturating_add(seg_y2x(y - self.y - self.dy, self.ism2))
        }
    }

    /// Replaces this curve with the pointwise minimum of itself and `isc`
    /// anchored at `(x, y)`.
    ///
    /// This is what lets a class resume a backlog period without ever being
    /// promised more service than its curve allows across the idle gap. The
    /// segment slopes are invariant: the curve is always combined with the
    /// internal curve it was created from, so only the anchor and
    /// breakpoint move.
    pub fn combine_min(&mut self, isc: &InternalCurve, x: u64, y: u64) {
        if isc.sm1 <= isc.sm2 {
            // convex: the curves cannot cross, a single comparison at the
            // anchor decides
            let y1 = self.x2y(x);
            if y1 < y {
                return;
            }
            self.x = x;
            self.y = y;
            return;
        }

        // concave: evaluate the current curve at both ends of the new
        // curve's first segment
        let y1 = self.x2y(x);
        if y1 <= y {
            // current curve is below the new one everywhere
            return;
        }

        let y2 = self.x2y(x + isc.dx);
        if y2 >= y + isc.dy {
            // current curve is above the new one everywhere: replace
            self.x = x;
            self.y = y;
            self.dx = isc.dx;
            self.dy = isc.dy;
            return;
        }

        // the two curves cross inside the new first segment; solve
        //   seg_x2y(dx, sm1) == seg_x2y(dx, sm2) + (y1 - y)
        // for the breakpoint offset dx of the combined curve
        let mut dx = ((((y1 - y) as u128) << SM_SHIFT) / (isc.sm1 - isc.sm2) as u128) as u64;
        // if (x, y1) still lies on the current first segment, push the
        // breakpoint past it
        if self.x + self.dx > x {
            dx += self.x + self.dx - x;
        }
        let dy = seg_x2y(dx, isc.sm1);

        self.x = x;
        self.y = y;
        self.dx = dx;
        self.dy = dy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InternalCurve, ServiceCurve, INFINITY};

    const MS: u64 = 1_000_000;

    #[test]
    fn linear_curve_eval_both_ways() {
        // 1 Mbit/s = 1000 bytes per 8 ms
        let isc = InternalCurve::from(ServiceCurve::linear(1_000_000));
        let rtsc = RuntimeCurve::new(&isc, 10 * MS, 500);

        assert_eq!(rtsc.x2y(10 * MS), 500);
        assert_eq!(rtsc.x2y(5 * MS), 500);

        let x = rtsc.y2x(1500);
        assert!(x.abs_diff(18 * MS) < MS / 100, "x = {x}");
        // below the anchor the curve answers the anchor time
        assert_eq!(rtsc.y2x(100), 10 * MS);
    }

    #[test]
    fn convex_eval_crosses_breakpoint() {
        // zero first slope for 100 ms, then 1 Mbit/s
        let isc = InternalCurve::from(ServiceCurve::new(0, 100, 1_000_000));
        let rtsc = RuntimeCurve::new(&isc, 0, 0);

        // flat first segment: the anchor byte is not reached before the
        // breakpoint, so its service time is the breakpoint itself
        assert_eq!(rtsc.y2x(0), 100 * MS);
        let first_byte = rtsc.y2x(1);
        assert!(first_byte.abs_diff(100 * MS) < MS / 100, "x = {first_byte}");
        assert_eq!(rtsc.x2y(50 * MS), 0);

        let x = rtsc.y2x(1000);
        assert!(x.abs_diff(108 * MS) < MS / 100, "x = {x}");
    }

    #[test]
    fn zero_final_rate_saturates() {
        // 1 Mbit/s for 8 ms (1000 bytes), then nothing
        let isc = InternalCurve::from(ServiceCurve::new(1_000_000, 8, 0));
        let rtsc = RuntimeCurve::new(&isc, 0, 0);

        assert_eq!(rtsc.y2x(isc.dy + 1), INFINITY);
    }

    #[test]
    fn convex_combine_moves_anchor_only_when_needed() {
        let isc = InternalCurve::from(ServiceCurve::linear(1_000_000));
        let mut rtsc = RuntimeCurve::new(&isc, 0, 0);

        // after a 100 ms idle gap the old curve is above the new anchor,
        // so the anchor moves
        rtsc.combine_min(&isc, 100 * MS, 0);
        assert_eq!((rtsc.x, rtsc.y), (100 * MS, 0));

        // a new anchor above the current curve leaves it untouched
        let snapshot = rtsc;
        rtsc.combine_min(&isc, 100 * MS, 10_000);
        assert_eq!(rtsc, snapshot);
    }

    #[test]
    fn concave_combine_lower_bounds_both() {
        // 10 Mbit/s for 10 ms, then 1 Mbit/s
        let isc = InternalCurve::from(ServiceCurve::new(10_000_000, 10, 1_000_000));
        let mut rtsc = RuntimeCurve::new(&isc, 0, 0);

        // the class went idle; restart the backlog period at 5 ms with
        // 2000 bytes already counted
        let (x0, y0) = (5 * MS, 2000);
        let fresh = RuntimeCurve::new(&isc, x0, y0);
        let old = rtsc;
        rtsc.combine_min(&isc, x0, y0);

        for t in [x0, 8 * MS, 15 * MS, 40 * MS, 200 * MS] {
            let combined = rtsc.x2y(t);
            assert!(combined <= old.x2y(t), "above old curve at {t}");
            assert!(combined <= fresh.x2y(t), "above fresh curve at {t}");
        }
    }

    #[test]
    fn concave_combine_keeps_lower_existing_curve() {
        let isc = InternalCurve::from(ServiceCurve::new(10_000_000, 10, 1_000_000));
        let mut rtsc = RuntimeCurve::new(&isc, 0, 0);
        let snapshot = rtsc;

        // anchored far above the existing curve: no change
        rtsc.combine_min(&isc, 0, 1_000_000);
        assert_eq!(rtsc, snapshot);
    }
}
