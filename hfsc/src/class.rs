use hfsc_curve::{InternalCurve, RuntimeCurve, ServiceCurve};

use crate::list::OrderedList;
use crate::pool::ClassId;
use crate::queue::ClassQueue;
use crate::stats::PktCounter;

/// Configuration for one class, builder style.
///
/// All three curves are optional: a class may be realtime-only,
/// link-share-only, an upper-limited combination, or a pure container. A
/// curve given with both slopes zero counts as absent.
///
/// # Example
///
/// ```
/// use hfsc::{ClassConfig, ServiceCurve};
///
/// // a leaf sharing 10 Mbit/s under class 1, capped at 20 Mbit/s,
/// // catching unclassified traffic
/// let config = ClassConfig::new(0x10)
///     .with_parent(0x1)
///     .with_linkshare(ServiceCurve::linear(10_000_000))
///     .with_upperlimit(ServiceCurve::linear(20_000_000))
///     .with_default(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClassConfig {
    /// Caller-chosen opaque handle, unique within the scheduler.
    pub handle: u32,
    /// Parent handle; `None` creates the root class.
    pub parent: Option<u32>,
    /// Real-time curve.
    pub realtime: Option<ServiceCurve>,
    /// Link-share curve.
    pub linkshare: Option<ServiceCurve>,
    /// Upper-limit curve.
    pub upperlimit: Option<ServiceCurve>,
    /// Queue limit in packets; 0 selects [`DEFAULT_QLIMIT`](crate::DEFAULT_QLIMIT).
    pub qlimit: u32,
    /// Marks this class as the fallback for unclassified traffic.
    pub default_class: bool,
}

impl ClassConfig {
    /// Creates a config for the given handle; everything else defaults off.
    pub fn new(handle: u32) -> Self {
        Self { handle, ..Self::default() }
    }

    /// Sets the parent class handle.
    pub fn with_parent(mut self, parent: u32) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the real-time curve.
    pub fn with_realtime(mut self, sc: ServiceCurve) -> Self {
        self.realtime = Some(sc);
        self
    }

    /// Sets the link-share curve.
    pub fn with_linkshare(mut self, sc: ServiceCurve) -> Self {
        self.linkshare = Some(sc);
        self
    }

    /// Sets the upper-limit curve.
    pub fn with_upperlimit(mut self, sc: ServiceCurve) -> Self {
        self.upperlimit = Some(sc);
        self
    }

    /// Sets the queue limit in packets.
    pub fn with_qlimit(mut self, qlimit: u32) -> Self {
        self.qlimit = qlimit;
        self
    }

    /// Sets or clears the default-class flag.
    pub fn with_default(mut self, default_class: bool) -> Self {
        self.default_class = default_class;
        self
    }
}

/// One node of the class tree.
///
/// Scheduling state follows the HFSC paper's naming: `vt` virtual time,
/// `e` eligible time, `d` deadline, `f` fit time, with the adjustment and
/// period-tracking fields the algorithm threads through its ancestor
/// walks.
#[derive(Debug)]
pub(crate) struct Class {
    /// Scheduler-assigned sequence number.
    pub(crate) id: u32,
    /// Caller-chosen handle.
    pub(crate) handle: u32,
    pub(crate) default_class: bool,

    pub(crate) parent: Option<ClassId>,
    /// Next sibling in the parent's child chain.
    pub(crate) siblings: Option<ClassId>,
    /// First child.
    pub(crate) children: Option<ClassId>,

    pub(crate) queue: ClassQueue,

    /// Internal real-time service curve.
    pub(crate) rsc: Option<InternalCurve>,
    /// Internal link-share (fair service) curve.
    pub(crate) fsc: Option<InternalCurve>,
    /// Internal upper-limit curve.
    pub(crate) usc: Option<InternalCurve>,

    /// Deadline curve, derived from `rsc`.
    pub(crate) deadline: RuntimeCurve,
    /// Eligible curve, derived from `rsc`.
    pub(crate) eligible: RuntimeCurve,
    /// Virtual-time curve, derived from `fsc`.
    pub(crate) virt: RuntimeCurve,
    /// Fit-time curve, derived from `usc`.
    pub(crate) ulimit: RuntimeCurve,

    /// Total work in bytes.
    pub(crate) total: u64,
    /// Cumulative work in bytes done by the real-time criterion.
    pub(crate) cumul: u64,

    /// Deadline.
    pub(crate) d: u64,
    /// Eligible time.
    pub(crate) e: u64,
    /// Virtual time.
    pub(crate) vt: u64,
    /// Fit time, `max(myf, cfmin)`.
    pub(crate) f: u64,
    /// Fit time from this class's own upper-limit curve.
    pub(crate) myf: u64,
    /// Cumulative fit-time drift adjustment.
    pub(crate) myfadj: u64,
    /// Earliest fit time among the active children.
    pub(crate) cfmin: u64,
    /// Minimum virtual time among the children fit for link-sharing;
    /// monotonically non-decreasing within a backlog period.
    pub(crate) cvtmin: u64,
    /// Intra-period cumulative virtual-time adjustment.
    pub(crate) vtadj: u64,
    /// Inter-period cumulative virtual-time offset.
    pub(crate) vtoff: u64,
    /// Maximum child virtual time seen in the last period.
    pub(crate) cvtmax: u64,
    /// Virtual time at the start of the current backlog period.
    pub(crate) initvt: u64,

    /// Virtual-time period sequence number.
    pub(crate) vtperiod: u32,
    /// Parent's period sequence number at activation.
    pub(crate) parentperiod: u32,
    /// Number of active descendants counted through this class.
    pub(crate) nactive: u32,

    /// Active children, ordered by virtual time.
    pub(crate) actc: OrderedList,

    pub(crate) xmit_cnt: PktCounter,
    pub(crate) drop_cnt: PktCounter,
    /// Number of backlog periods.
    pub(crate) period: u32,
}

impl Class {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u32,
        handle: u32,
        parent: Option<ClassId>,
        rsc: Option<InternalCurve>,
        fsc: Option<InternalCurve>,
        usc: Option<InternalCurve>,
        qlimit: u32,
        default_class: bool,
    ) -> Self {
        let anchored = |isc: Option<InternalCurve>| {
            isc.map(|isc| RuntimeCurve::new(&isc, 0, 0)).unwrap_or_default()
        };

        Self {
            id,
            handle,
            default_class,
            parent,
            siblings: None,
            children: None,
            queue: ClassQueue::new(qlimit),
            deadline: anchored(rsc),
            eligible: anchored(rsc),
            virt: anchored(fsc),
            ulimit: anchored(usc),
            rsc,
            fsc,
            usc,
            total: 0,
            cumul: 0,
            d: 0,
            e: 0,
            vt: 0,
            f: 0,
            myf: 0,
            myfadj: 0,
            cfmin: 0,
            cvtmin: 0,
            vtadj: 0,
            vtoff: 0,
            cvtmax: 0,
            initvt: 0,
            vtperiod: 0,
            parentperiod: 0,
            nactive: 0,
            actc: OrderedList::default(),
            xmit_cnt: PktCounter::default(),
            drop_cnt: PktCounter::default(),
            period: 0,
        }
    }

    pub(crate) fn is_parent(&self) -> bool {
        self.children.is_some()
    }

    pub(crate) fn qlen(&self) -> u32 {
        self.queue.len()
    }
}
