use hfsc_curve::ServiceCurve;

/// A packet/byte counter pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PktCounter {
    /// Number of packets counted.
    pub packets: u64,
    /// Number of bytes counted.
    pub bytes: u64,
}

impl PktCounter {
    pub(crate) fn add(&mut self, len: u64) {
        self.packets += 1;
        self.bytes += len;
    }
}

/// Point-in-time snapshot of one class, as exported to the policy layer.
///
/// Curves are reported in external `(m1, d, m2)` units; everything else is
/// in machine ticks and bytes, raw enough to reconstruct the scheduling
/// state for debugging.
#[derive(Debug, Clone, Copy)]
pub struct ClassStats {
    /// Scheduler-assigned sequence number.
    pub id: u32,
    /// Caller-chosen handle.
    pub handle: u32,
    /// Real-time curve, if any.
    pub rsc: Option<ServiceCurve>,
    /// Link-share curve, if any.
    pub fsc: Option<ServiceCurve>,
    /// Upper-limit curve, if any.
    pub usc: Option<ServiceCurve>,
    /// Total work in bytes.
    pub total: u64,
    /// Cumulative work in bytes done by the real-time criterion.
    pub cumul: u64,
    /// Deadline.
    pub d: u64,
    /// Eligible time.
    pub e: u64,
    /// Virtual time.
    pub vt: u64,
    /// Fit time, `max(myf, cfmin)`.
    pub f: u64,
    /// Virtual time at the start of the current backlog period.
    pub initvt: u64,
    /// Virtual-time period sequence number.
    pub vtperiod: u32,
    /// Parent's virtual-time period sequence number at activation.
    pub parentperiod: u32,
    /// Number of active descendants counted through this class.
    pub nactive: u32,
    /// Inter-period cumulative virtual-time offset.
    pub vtoff: u64,
    /// Maximum child virtual time seen in the last period.
    pub cvtmax: u64,
    /// Fit time from this class's own upper-limit curve.
    pub myf: u64,
    /// Earliest fit time among the active children.
    pub cfmin: u64,
    /// Minimum virtual time among the children fit for link-sharing.
    pub cvtmin: u64,
    /// Cumulative fit-time drift adjustment.
    pub myfadj: u64,
    /// Intra-period cumulative virtual-time adjustment.
    pub vtadj: u64,
    /// Scheduler clock at the time of the snapshot, in machine ticks.
    pub cur_time: u64,
    /// Machine clock frequency in ticks per second.
    pub machclk_freq: u64,
    /// Queued packets.
    pub qlen: u32,
    /// Queued bytes.
    pub qbytes: u64,
    /// Queue limit in packets.
    pub qlimit: u32,
    /// Packets and bytes transmitted.
    pub xmit_cnt: PktCounter,
    /// Packets and bytes dropped.
    pub drop_cnt: PktCounter,
    /// Number of backlog periods.
    pub period: u32,
}
