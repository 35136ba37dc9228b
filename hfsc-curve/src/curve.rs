use hfsc_common::MACHCLK_FREQ;

/// Fixed-point shift for slopes (bytes per machine tick).
///
/// A slope of one byte per tick is `1 << SM_SHIFT`. Together with the
/// nanosecond machine clock this keeps at least three significant decimal
/// digits for rates between 100 Kbit/s and 1 Gbit/s.
pub const SM_SHIFT: u32 = 24;

/// Fixed-point shift for inverse slopes (machine ticks per byte).
pub const ISM_SHIFT: u32 = 10;

/// Sentinel for an infinite time or inverse slope.
///
/// A zero-rate segment can never serve another byte, so the time at which
/// it would is "never".
pub const INFINITY: u64 = u64::MAX;

/// A two-segment service curve in external units.
///
/// `m1` and `m2` are slopes in bits per second; `d` is the breakpoint delay
/// in milliseconds. A curve with both slopes zero means "no curve".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceCurve {
    /// Slope of the first segment, in bits per second.
    pub m1: u64,
    /// Breakpoint between the two segments, in milliseconds.
    pub d: u64,
    /// Slope of the second segment, in bits per second.
    pub m2: u64,
}

impl ServiceCurve {
    /// Creates a curve from `(m1, d, m2)` in bits/sec, ms, bits/sec.
    pub const fn new(m1: u64, d: u64, m2: u64) -> Self {
        Self { m1, d, m2 }
    }

    /// Creates a linear curve: a single slope with no breakpoint.
    pub const fn linear(m2: u64) -> Self {
        Self { m1: 0, d: 0, m2 }
    }

    /// Returns true if both slopes are zero, meaning "no curve".
    pub const fn is_zero(&self) -> bool {
        self.m1 == 0 && self.m2 == 0
    }

    /// Returns true if the curve is concave (`m1 > m2`).
    pub const fn is_concave(&self) -> bool {
        self.m1 > self.m2
    }
}

/// A service curve converted to internal fixed-point units.
///
/// `sm1`/`sm2` are the segment slopes in scaled bytes per tick, `ism1`/
/// `ism2` the scaled inverse slopes in ticks per byte, and `(dx, dy)` the
/// breakpoint in (ticks, bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InternalCurve {
    /// Scaled slope of the first segment.
    pub sm1: u64,
    /// Scaled inverse slope of the first segment.
    pub ism1: u64,
    /// Breakpoint offset in machine ticks.
    pub dx: u64,
    /// Bytes served by the first segment at the breakpoint.
    pub dy: u64,
    /// Scaled slope of the second segment.
    pub sm2: u64,
    /// Scaled inverse slope of the second segment.
    pub ism2: u64,
}

impl InternalCurve {
    /// Converts an external curve into fixed-point form.
    pub fn from_curve(sc: &ServiceCurve) -> Self {
        let sm1 = m2sm(sc.m1);
        let dx = d2dx(sc.d);
        Self {
            sm1,
            ism1: m2ism(sc.m1),
            dx,
            dy: seg_x2y(dx, sm1),
            sm2: m2sm(sc.m2),
            ism2: m2ism(sc.m2),
        }
    }

    /// Converts back to external units, for stats export.
    ///
    /// Exact inverse of [`Self::from_curve`] up to one integer rounding
    /// unit per field.
    pub fn to_curve(&self) -> ServiceCurve {
        ServiceCurve { m1: sm2m(self.sm1), d: dx2d(self.dx), m2: sm2m(self.sm2) }
    }

    /// Returns true if the curve is concave in internal units.
    pub const fn is_concave(&self) -> bool {
        self.sm1 > self.sm2
    }
}

impl From<ServiceCurve> for InternalCurve {
    fn from(sc: ServiceCurve) -> Self {
        Self::from_curve(&sc)
    }
}

/// Converts a slope in bits/sec to scaled bytes per machine tick.
pub(crate) fn m2sm(m: u64) -> u64 {
    (((m as u128) << SM_SHIFT) / 8 / MACHCLK_FREQ as u128) as u64
}

/// Converts a slope in bits/sec to a scaled inverse slope in ticks per
/// byte. Zero rate maps to [`INFINITY`].
pub(crate) fn m2ism(m: u64) -> u64 {
    if m == 0 {
        INFINITY
    } else {
        (((MACHCLK_FREQ as u128) << ISM_SHIFT) * 8 / m as u128) as u64
    }
}

/// Converts a delay in milliseconds to machine ticks.
pub(crate) fn d2dx(d: u64) -> u64 {
    (d as u128 * MACHCLK_FREQ as u128 / 1000) as u64
}

/// Converts a scaled slope back to bits/sec.
pub(crate) fn sm2m(sm: u64) -> u64 {
    ((sm as u128 * 8 * MACHCLK_FREQ as u128) >> SM_SHIFT) as u64
}

/// Converts machine ticks back to milliseconds.
pub(crate) fn dx2d(dx: u64) -> u64 {
    (dx as u128 * 1000 / MACHCLK_FREQ as u128) as u64
}

/// Evaluates a single segment: bytes served after `x` ticks at slope `sm`.
///
/// The product is widened to 128 bits so it cannot overflow.
pub(crate) fn seg_x2y(x: u64, sm: u64) -> u64 {
    ((x as u128 * sm as u128) >> SM_SHIFT) as u64
}

/// Evaluates a single segment in reverse: ticks needed to serve `y` bytes
/// at inverse slope `ism`.
pub(crate) fn seg_y2x(y: u64, ism: u64) -> u64 {
    if y == 0 {
        0
    } else if ism == INFINITY {
        INFINITY
    } else {
        ((y as u128 * ism as u128) >> ISM_SHIFT) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One slope quantum in bits/sec: the most a round trip may lose.
    fn slope_unit() -> u64 {
        sm2m(1) + 1
    }

    #[test]
    fn round_trip_representative_grid() {
        let rates = [100_000u64, 1_000_000, 10_000_000, 100_000_000, 1_000_000_000];
        let delays = [0u64, 1, 10, 100, 1000];

        for &m1 in &rates {
            for &d in &delays {
                for &m2 in &rates {
                    let sc = ServiceCurve::new(m1, d, m2);
                    let back = InternalCurve::from_curve(&sc).to_curve();

                    assert!(back.m1 <= m1 && m1 - back.m1 <= slope_unit(), "m1 {m1} -> {}", back.m1);
                    assert!(back.m2 <= m2 && m2 - back.m2 <= slope_unit(), "m2 {m2} -> {}", back.m2);
                    // delay conversion is exact at nanosecond resolution
                    assert_eq!(back.d, d);
                }
            }
        }
    }

    #[test]
    fn precision_keeps_three_digits_at_100kbps() {
        let back = sm2m(m2sm(100_000));
        assert!(back >= 99_500, "recovered {back}");
    }

    #[test]
    fn zero_rate_maps_to_infinity() {
        assert_eq!(m2ism(0), INFINITY);
        assert_eq!(seg_y2x(1, INFINITY), INFINITY);
        assert_eq!(seg_y2x(0, INFINITY), 0);
    }

    #[test]
    fn segment_eval_inverse() {
        // 1 Mbit/s = 125_000 bytes/sec: 1000 bytes should take 8 ms
        let sm = m2sm(1_000_000);
        let ism = m2ism(1_000_000);

        let x = seg_y2x(1000, ism);
        let eight_ms = 8_000_000u64;
        assert!(x.abs_diff(eight_ms) < 10_000, "x = {x}");

        let y = seg_x2y(x, sm);
        assert!(y.abs_diff(1000) <= 1, "y = {y}");
    }

    #[test]
    fn internal_curve_breakpoint() {
        // 10 Mbit/s for 100 ms, then 1 Mbit/s
        let isc = InternalCurve::from_curve(&ServiceCurve::new(10_000_000, 100, 1_000_000));
        assert_eq!(isc.dx, 100_000_000);
        // 10 Mbit/s for 100 ms is 125_000 bytes
        assert!(isc.dy.abs_diff(125_000) <= 8, "dy = {}", isc.dy);
        assert!(isc.is_concave());
    }
}
