use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use hfsc_common::{MachClock, MACHCLK_FREQ, MACHCLK_PER_TICK};
use hfsc_curve::{InternalCurve, RuntimeCurve, ServiceCurve, INFINITY};

use crate::class::{Class, ClassConfig};
use crate::error::{EnqueueError, Error};
use crate::list::OrderedList;
use crate::pool::{ClassId, ClassPool};
use crate::queue::DEFAULT_QLIMIT;
use crate::stats::ClassStats;

/// Maximum number of live classes per scheduler.
pub const MAX_CLASSES: usize = 64;

/// The per-interface HFSC scheduler: class tree, handle registry, eligible
/// list and packet counters.
///
/// The scheduler is a single unit of mutation with no internal locking; it
/// is meant to be driven from one logical owner (the interface send path)
/// which serializes every call. [`HfscHandle`](crate::HfscHandle) provides
/// that serialization plus the dequeue-retry driver.
///
/// Dequeue returning `None` is not distinguishable from an empty tree at
/// this boundary: a class's fit time may simply not have arrived yet.
/// Callers decide by also checking [`Self::backlog`].
#[derive(Debug)]
pub struct HfscScheduler {
    pool: ClassPool,
    /// Handle -> class. Uniqueness of handles is enforced on add.
    registry: rustc_hash::FxHashMap<u32, ClassId>,
    root: Option<ClassId>,
    default_class: Option<ClassId>,
    /// Classes backlogged under a real-time curve, ordered by eligible time.
    eligible: OrderedList,
    /// Packets queued across the whole tree.
    packets: u64,
    /// Class id sequence number.
    class_seq: u32,
    /// Class chosen by the last peek, consumed by the following remove.
    pollcache: Option<ClassId>,
    clock: MachClock,
    /// The owning interface's outbound queue length, mirrored here.
    ifq_len: Option<Arc<AtomicUsize>>,
}

impl HfscScheduler {
    /// Creates an empty scheduler with a fresh machine clock.
    pub fn new() -> Self {
        Self {
            pool: ClassPool::default(),
            registry: rustc_hash::FxHashMap::default(),
            root: None,
            default_class: None,
            eligible: OrderedList::default(),
            packets: 0,
            class_seq: 0,
            pollcache: None,
            clock: MachClock::new(),
            ifq_len: None,
        }
    }

    /// Mirrors enqueue/dequeue into the owning interface's queue-length
    /// counter.
    pub fn with_ifq_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.ifq_len = Some(counter);
        self
    }

    /// Packets currently queued across the whole tree.
    pub fn backlog(&self) -> u64 {
        self.packets
    }

    /// True when no packet is queued anywhere in the tree.
    pub fn is_empty(&self) -> bool {
        self.packets == 0
    }

    /// Number of live classes.
    pub fn class_count(&self) -> usize {
        self.registry.len()
    }

    // === class tree management ===

    /// Creates a class.
    ///
    /// The first class created without a parent becomes the root; exactly
    /// one root may exist. Children are appended at the tail of the
    /// parent's sibling chain. A failed add leaves the tree untouched.
    pub fn add_class(&mut self, config: ClassConfig) -> Result<u32, Error> {
        let ClassConfig { handle, parent, realtime, linkshare, upperlimit, qlimit, default_class } =
            config;

        if self.registry.contains_key(&handle) {
            return Err(Error::Exists(handle));
        }
        if self.registry.len() >= MAX_CLASSES {
            return Err(Error::TableFull(MAX_CLASSES));
        }
        let parent_id = match parent {
            Some(p) => Some(self.lookup(p)?),
            None if self.root.is_some() => return Err(Error::RootExists),
            None => None,
        };

        let rsc = realtime.filter(|sc| !sc.is_zero()).map(InternalCurve::from);
        let fsc = linkshare.filter(|sc| !sc.is_zero()).map(InternalCurve::from);
        let usc = upperlimit.filter(|sc| !sc.is_zero()).map(InternalCurve::from);
        let qlimit = if qlimit == 0 { DEFAULT_QLIMIT } else { qlimit };

        self.class_seq += 1;
        let class = Class::new(self.class_seq, handle, parent_id, rsc, fsc, usc, qlimit, default_class);
        let id = self.pool.insert(class);
        self.registry.insert(handle, id);

        match parent_id {
            Some(p) => match self.pool[p].children {
                None => self.pool[p].children = Some(id),
                Some(first) => {
                    let mut tail = first;
                    while let Some(next) = self.pool[tail].siblings {
                        tail = next;
                    }
                    self.pool[tail].siblings = Some(id);
                }
            },
            None => self.root = Some(id),
        }
        // the last class flagged as default wins
        if default_class {
            if let Some(old) = self.default_class {
                self.pool[old].default_class = false;
            }
            self.default_class = Some(id);
        }

        tracing::debug!(handle, parent = ?parent, "created class");
        Ok(handle)
    }

    /// Destroys a class.
    ///
    /// Fails with [`Error::Busy`] while the class has children. A
    /// backlogged leaf is purged first, then unlinked and freed.
    pub fn delete_class(&mut self, handle: u32) -> Result<(), Error> {
        let id = self.lookup(handle)?;
        if self.pool[id].is_parent() {
            return Err(Error::Busy(handle));
        }

        if !self.pool[id].queue.is_empty() {
            self.purge_queue(id);
        }

        match self.pool[id].parent {
            Some(p) => {
                // patch the sibling chain
                let next = self.pool[id].siblings;
                if self.pool[p].children == Some(id) {
                    self.pool[p].children = next;
                } else {
                    let mut prev = self.pool[p].children;
                    while let Some(s) = prev {
                        if self.pool[s].siblings == Some(id) {
                            self.pool[s].siblings = next;
                            break;
                        }
                        prev = self.pool[s].siblings;
                    }
                }
            }
            None => self.root = None,
        }
        if self.pool[id].default_class {
            self.default_class = None;
        }
        if self.pollcache == Some(id) {
            self.pollcache = None;
        }
        self.registry.remove(&handle);
        self.pool.remove(id);

        tracing::debug!(handle, "destroyed class");
        Ok(())
    }

    /// Reconfigures the curves of a live class.
    ///
    /// `None` leaves a curve untouched; a curve with both slopes zero
    /// removes it, purging the class's queue first where the class may be
    /// linked into the corresponding scheduling structure. A non-zero curve
    /// re-derives the internal form and re-anchors the matching runtime
    /// curve at the class's current progress.
    pub fn modify_class(
        &mut self,
        handle: u32,
        realtime: Option<ServiceCurve>,
        linkshare: Option<ServiceCurve>,
        upperlimit: Option<ServiceCurve>,
    ) -> Result<(), Error> {
        let id = self.lookup(handle)?;
        let cur_time = self.clock.now();

        if let Some(sc) = realtime {
            if sc.is_zero() {
                if self.pool[id].rsc.is_some() {
                    if !self.pool[id].queue.is_empty() {
                        self.purge_queue(id);
                    }
                    self.pool[id].rsc = None;
                }
            } else {
                let isc = InternalCurve::from_curve(&sc);
                let cl = &mut self.pool[id];
                cl.rsc = Some(isc);
                cl.deadline = RuntimeCurve::new(&isc, cur_time, cl.cumul);
                cl.eligible = cl.deadline;
                if isc.sm1 <= isc.sm2 {
                    cl.eligible.dx = 0;
                    cl.eligible.dy = 0;
                }
            }
        }

        if let Some(sc) = linkshare {
            if sc.is_zero() {
                if self.pool[id].fsc.is_some() {
                    if !self.pool[id].queue.is_empty() {
                        self.purge_queue(id);
                    }
                    self.pool[id].fsc = None;
                }
            } else {
                let isc = InternalCurve::from_curve(&sc);
                let cl = &mut self.pool[id];
                cl.fsc = Some(isc);
                cl.virt = RuntimeCurve::new(&isc, cl.vt, cl.total);
            }
        }

        if let Some(sc) = upperlimit {
            if sc.is_zero() {
                if self.pool[id].usc.is_some() {
                    let cl = &mut self.pool[id];
                    cl.usc = None;
                    cl.myf = 0;
                }
            } else {
                let isc = InternalCurve::from_curve(&sc);
                let cl = &mut self.pool[id];
                cl.usc = Some(isc);
                cl.ulimit = RuntimeCurve::new(&isc, cur_time, cl.total);
                cl.myf = 0;
            }
        }

        tracing::debug!(handle, "modified class");
        Ok(())
    }

    // === datapath ===

    /// Queues a packet on the class identified by `class_tag`.
    ///
    /// Unknown tags and tags naming a non-leaf class fall back to the
    /// default class; without one the packet is refused. A full queue
    /// tail-drops and counts the packet against the class.
    pub fn enqueue(&mut self, class_tag: u32, packet: Bytes) -> Result<(), EnqueueError> {
        let id = match self.registry.get(&class_tag) {
            Some(&id) if !self.pool[id].is_parent() => id,
            _ => self.default_class.ok_or(EnqueueError::NoClass)?,
        };

        let len = packet.len() as u64;
        let cl = &mut self.pool[id];
        if cl.queue.enqueue(packet).is_err() {
            cl.drop_cnt.add(len);
            tracing::trace!(handle = cl.handle, "queue limit reached, dropping packet");
            return Err(EnqueueError::QueueFull);
        }
        self.packets += 1;
        self.inc_ifq();

        if self.pool[id].qlen() == 1 {
            // first packet of a new backlog period
            self.set_active(id, len);
        }
        Ok(())
    }

    /// Picks and optionally removes the next packet to send.
    ///
    /// With `remove == false` this is a peek: the chosen class is cached so
    /// the following remove call does not repeat the search. Selection
    /// prefers the earliest deadline among classes whose eligible time has
    /// arrived; otherwise it walks the tree top-down by minimum virtual
    /// time among children whose fit time has arrived. If an intermediate
    /// class has no fit child the whole call yields `None` even though
    /// other subtrees might have data; the owner retries shortly after.
    pub fn dequeue(&mut self, remove: bool) -> Option<Bytes> {
        if self.packets == 0 {
            return None;
        }
        let cur_time = self.clock.now();
        let mut realtime = false;

        let cached = if remove { self.pollcache.take() } else { None };
        let id = match cached {
            Some(id) => {
                // chosen by the previous peek; re-check the criterion
                let cl = &self.pool[id];
                realtime = cl.rsc.is_some() && cl.e <= cur_time;
                id
            }
            None => {
                let id = if let Some(id) = self.eligible_min_deadline(cur_time) {
                    realtime = true;
                    id
                } else {
                    let mut id = self.root?;
                    while self.pool[id].is_parent() {
                        let fit = self.first_fit(id, cur_time)?;
                        // don't let the chosen child drag cvtmin backwards
                        let vt = self.pool[fit].vt;
                        let parent = &mut self.pool[id];
                        if parent.cvtmin < vt {
                            parent.cvtmin = vt;
                        }
                        id = fit;
                    }
                    id
                };
                if !remove {
                    self.pollcache = Some(id);
                    return self.pool[id].queue.head().cloned();
                }
                id
            }
        };

        let packet = self.pool[id].queue.dequeue()?;
        let len = packet.len() as u64;
        self.packets -= 1;
        self.dec_ifq();
        self.pool[id].xmit_cnt.add(len);

        self.update_vf(id, len, cur_time);
        if realtime {
            self.pool[id].cumul += len;
        }

        if let Some(next_len) = self.pool[id].queue.head_len() {
            if self.pool[id].rsc.is_some() {
                if realtime {
                    self.update_ed(id, next_len);
                } else {
                    self.update_d(id, next_len);
                }
            }
        } else {
            // the class ran dry
            self.set_passive(id);
        }

        Some(packet)
    }

    /// Drops every queued packet in every class and detaches all classes
    /// from the eligible/active lists. The tree itself is left intact.
    pub fn purge(&mut self) {
        let mut cur = self.root;
        while let Some(id) = cur {
            if !self.pool[id].queue.is_empty() {
                self.purge_queue(id);
            }
            cur = self.next_class(id);
        }
    }

    // === stats export ===

    /// Snapshot of one class by handle.
    pub fn class_stats(&self, handle: u32) -> Result<ClassStats, Error> {
        let id = self.lookup(handle)?;
        Ok(self.collect_stats(id))
    }

    /// Snapshots of every class, in pre-order over the tree.
    pub fn stats_dump(&self) -> Vec<ClassStats> {
        let mut out = Vec::with_capacity(self.registry.len());
        let mut cur = self.root;
        while let Some(id) = cur {
            out.push(self.collect_stats(id));
            cur = self.next_class(id);
        }
        out
    }

    fn collect_stats(&self, id: ClassId) -> ClassStats {
        let cl = &self.pool[id];
        ClassStats {
            id: cl.id,
            handle: cl.handle,
            rsc: cl.rsc.map(|isc| isc.to_curve()),
            fsc: cl.fsc.map(|isc| isc.to_curve()),
            usc: cl.usc.map(|isc| isc.to_curve()),
            total: cl.total,
            cumul: cl.cumul,
            d: cl.d,
            e: cl.e,
            vt: cl.vt,
            f: cl.f,
            initvt: cl.initvt,
            vtperiod: cl.vtperiod,
            parentperiod: cl.parentperiod,
            nactive: cl.nactive,
            vtoff: cl.vtoff,
            cvtmax: cl.cvtmax,
            myf: cl.myf,
            cfmin: cl.cfmin,
            cvtmin: cl.cvtmin,
            myfadj: cl.myfadj,
            vtadj: cl.vtadj,
            cur_time: self.clock.now(),
            machclk_freq: MACHCLK_FREQ,
            qlen: cl.qlen(),
            qbytes: cl.queue.bytes(),
            qlimit: cl.queue.qlimit(),
            xmit_cnt: cl.xmit_cnt,
            drop_cnt: cl.drop_cnt,
            period: cl.period,
        }
    }

    // === activation bookkeeping ===

    fn set_active(&mut self, id: ClassId, len: u64) {
        if self.pool[id].rsc.is_some() {
            self.init_ed(id, len);
        }
        if self.pool[id].fsc.is_some() {
            self.init_vf(id, len);
        }
        self.pool[id].period += 1;
    }

    fn set_passive(&mut self, id: ClassId) {
        if self.pool[id].rsc.is_some() {
            self.eligible.remove(id);
        }
        // the active lists are maintained by update_vf, which runs
        // whenever vt or f changes
    }

    fn init_ed(&mut self, id: ClassId, next_len: u64) {
        let cur_time = self.clock.now();
        let cl = &mut self.pool[id];
        let Some(rsc) = cl.rsc else { return };

        // lower-envelope the deadline curve at the current point so the
        // class cannot claim service it skipped while idle
        cl.deadline.combine_min(&rsc, cur_time, cl.cumul);

        // for a concave rsc the eligible curve equals the deadline curve;
        // for a convex one it is the linear second segment alone
        cl.eligible = cl.deadline;
        if rsc.sm1 <= rsc.sm2 {
            cl.eligible.dx = 0;
            cl.eligible.dy = 0;
        }

        cl.e = cl.eligible.y2x(cl.cumul);
        cl.d = cl.deadline.y2x(cl.cumul + next_len);

        self.eligible_insert(id);
    }

    fn update_ed(&mut self, id: ClassId, next_len: u64) {
        let cl = &mut self.pool[id];
        cl.e = cl.eligible.y2x(cl.cumul);
        cl.d = cl.deadline.y2x(cl.cumul + next_len);

        self.eligible_update(id);
    }

    fn update_d(&mut self, id: ClassId, next_len: u64) {
        let cl = &mut self.pool[id];
        cl.d = cl.deadline.y2x(cl.cumul + next_len);
    }

    /// Activates `id` for link-sharing at every level up to the root.
    fn init_vf(&mut self, id: ClassId, _len: u64) {
        let mut cur_time = None;
        let mut go_active = true;
        let mut cl = id;

        while let Some(parent) = self.pool[cl].parent {
            if go_active {
                let nactive = self.pool[cl].nactive;
                self.pool[cl].nactive = nactive + 1;
                go_active = nactive == 0;
            }

            if go_active {
                match self.pool[parent].actc.last() {
                    Some(max_cl) => {
                        // start between the min and max of the already
                        // active siblings; never decrease vt unless the
                        // parent began a new period
                        let mut vt = self.pool[max_cl].vt;
                        if self.pool[parent].cvtmin != 0 {
                            vt = (self.pool[parent].cvtmin + vt) / 2;
                        }
                        let parent_vtperiod = self.pool[parent].vtperiod;
                        let c = &mut self.pool[cl];
                        if c.parentperiod != parent_vtperiod || vt > c.vt {
                            c.vt = vt;
                        }
                    }
                    None => {
                        // first child of a brand-new parent backlog period:
                        // fold cvtmax into every sibling's vt offset so
                        // this period never regresses below the last one
                        let vt = self.pool[parent].cvtmax;
                        let mut child = self.pool[parent].children;
                        while let Some(sib) = child {
                            self.pool[sib].vtoff += vt;
                            child = self.pool[sib].siblings;
                        }
                        self.pool[cl].vt = 0;
                        let p = &mut self.pool[parent];
                        p.cvtmax = 0;
                        p.cvtmin = 0;
                    }
                }

                let c = &mut self.pool[cl];
                c.initvt = c.vt;

                // lower-envelope the virtual curve at the restart point
                if let Some(fsc) = c.fsc {
                    let vt = c.vt + c.vtoff;
                    c.virt.combine_min(&fsc, vt, c.total);
                    if c.virt.x == vt {
                        c.virt.x -= c.vtoff;
                        c.vtoff = 0;
                    }
                }
                c.vtadj = 0;
                c.vtperiod += 1;

                let parent_vtperiod = self.pool[parent].vtperiod;
                let parent_nactive = self.pool[parent].nactive;
                let c = &mut self.pool[cl];
                c.parentperiod = parent_vtperiod;
                if parent_nactive == 0 {
                    c.parentperiod += 1;
                }
                c.f = 0;

                self.actc_insert(parent, cl);

                if let Some(usc) = self.pool[cl].usc {
                    let now = match cur_time {
                        Some(t) => t,
                        None => {
                            let t = self.clock.now();
                            cur_time = Some(t);
                            t
                        }
                    };
                    let c = &mut self.pool[cl];
                    c.ulimit.combine_min(&usc, now, c.total);
                    c.myf = c.ulimit.y2x(c.total);
                    c.myfadj = 0;
                }
            }

            let c = &self.pool[cl];
            let f = c.myf.max(c.cfmin);
            if f != c.f {
                self.pool[cl].f = f;
                self.update_cfmin(parent);
            }

            cl = parent;
        }
    }

    /// Charges `len` bytes to `id` and every ancestor, updating virtual
    /// and fit times, and deactivating levels whose backlog drained.
    fn update_vf(&mut self, id: ClassId, len: u64, cur_time: u64) {
        let mut go_passive = self.pool[id].queue.is_empty();
        let mut cl = id;

        while let Some(parent) = self.pool[cl].parent {
            self.pool[cl].total += len;

            if self.pool[cl].fsc.is_none() || self.pool[cl].nactive == 0 {
                cl = parent;
                continue;
            }

            if go_passive {
                let nactive = self.pool[cl].nactive - 1;
                self.pool[cl].nactive = nactive;
                go_passive = nactive == 0;
            }

            if go_passive {
                // no more active child: this level leaves its period
                let vt = self.pool[cl].vt;
                let p = &mut self.pool[parent];
                if vt > p.cvtmax {
                    p.cvtmax = vt;
                }
                self.pool[parent].actc.remove(cl);
                self.update_cfmin(parent);

                cl = parent;
                continue;
            }

            let c = &self.pool[cl];
            let vt = c.virt.y2x(c.total).wrapping_sub(c.vtoff).wrapping_add(c.vtadj);
            let cvtmin = self.pool[parent].cvtmin;
            let c = &mut self.pool[cl];
            c.vt = vt;
            // a class skipped for non-fit in the past may lag cvtmin;
            // carry the clamp in vtadj so it survives across calls
            if c.vt < cvtmin {
                c.vtadj += cvtmin - c.vt;
                c.vt = cvtmin;
            }

            self.actc_update(parent, cl);

            if self.pool[cl].usc.is_some() {
                let c = &mut self.pool[cl];
                c.myf = c.myfadj.wrapping_add(c.ulimit.y2x(c.total));

                // in steady state under rate-limiting myf tracks the clock
                // within one scheduling tick; further behind means drift,
                // and an uncorrected lag would let the class go greedy
                let myf_bound = cur_time.saturating_sub(MACHCLK_PER_TICK);
                if c.myf < myf_bound {
                    let delta = cur_time.wrapping_sub(c.myf);
                    c.myfadj = c.myfadj.wrapping_add(delta);
                    c.myf = c.myf.wrapping_add(delta);
                }
            }

            let c = &self.pool[cl];
            let f = c.myf.max(c.cfmin);
            if f != c.f {
                self.pool[cl].f = f;
                self.update_cfmin(parent);
            }

            cl = parent;
        }
    }

    /// Recomputes `cfmin` of `id` from its active children.
    fn update_cfmin(&mut self, id: ClassId) {
        let cfmin = {
            let cl = &self.pool[id];
            if cl.actc.is_empty() {
                0
            } else {
                let mut min = INFINITY;
                for child in cl.actc.iter() {
                    let f = self.pool[child].f;
                    if f == 0 {
                        min = 0;
                        break;
                    }
                    if f < min {
                        min = f;
                    }
                }
                min
            }
        };
        self.pool[id].cfmin = cfmin;
    }

    /// Drains a class's queue and detaches it from the scheduling lists.
    fn purge_queue(&mut self, id: ClassId) {
        if self.pool[id].queue.is_empty() {
            return;
        }

        while let Some(packet) = self.pool[id].queue.dequeue() {
            self.pool[id].drop_cnt.add(packet.len() as u64);
            self.packets -= 1;
            self.dec_ifq();
        }

        // a zero-length, time-zero update detaches the class from the
        // active lists of the whole ancestor chain
        self.update_vf(id, 0, 0);
        self.set_passive(id);

        if self.pollcache == Some(id) {
            self.pollcache = None;
        }
    }

    // === selection queries ===

    /// Earliest-deadline class among those whose eligible time has come.
    fn eligible_min_deadline(&self, now: u64) -> Option<ClassId> {
        let mut best: Option<ClassId> = None;
        for id in self.eligible.iter() {
            let cl = &self.pool[id];
            if cl.e > now {
                break;
            }
            match best {
                Some(b) if self.pool[b].d <= cl.d => {}
                _ => best = Some(id),
            }
        }
        best
    }

    /// First active child of `id`, in virtual-time order, whose fit time
    /// has arrived.
    fn first_fit(&self, id: ClassId, now: u64) -> Option<ClassId> {
        self.pool[id].actc.iter().find(|&child| self.pool[child].f <= now)
    }

    // === list plumbing ===

    fn eligible_insert(&mut self, id: ClassId) {
        let mut list = mem::take(&mut self.eligible);
        list.insert(id, |c| self.pool[c].e);
        self.eligible = list;
    }

    fn eligible_update(&mut self, id: ClassId) {
        let mut list = mem::take(&mut self.eligible);
        list.update(id, |c| self.pool[c].e);
        self.eligible = list;
    }

    fn actc_insert(&mut self, parent: ClassId, id: ClassId) {
        let mut list = mem::take(&mut self.pool[parent].actc);
        list.insert(id, |c| self.pool[c].vt);
        self.pool[parent].actc = list;
    }

    fn actc_update(&mut self, parent: ClassId, id: ClassId) {
        let mut list = mem::take(&mut self.pool[parent].actc);
        list.update(id, |c| self.pool[c].vt);
        self.pool[parent].actc = list;
    }

    // === traversal and lookup ===

    /// Pre-order successor: first child, else next sibling, else the next
    /// sibling of the nearest ancestor that has one.
    fn next_class(&self, id: ClassId) -> Option<ClassId> {
        if let Some(child) = self.pool[id].children {
            return Some(child);
        }
        if let Some(sibling) = self.pool[id].siblings {
            return Some(sibling);
        }
        let mut up = self.pool[id].parent;
        while let Some(p) = up {
            if let Some(sibling) = self.pool[p].siblings {
                return Some(sibling);
            }
            up = self.pool[p].parent;
        }
        None
    }

    fn lookup(&self, handle: u32) -> Result<ClassId, Error> {
        self.registry.get(&handle).copied().ok_or(Error::NotFound(handle))
    }

    fn inc_ifq(&self) {
        if let Some(counter) = &self.ifq_len {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn dec_ifq(&self) {
        if let Some(counter) = &self.ifq_len {
            counter.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl Default for HfscScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ls(handle: u32, parent: u32) -> ClassConfig {
        ClassConfig::new(handle).with_parent(parent).with_linkshare(ServiceCurve::linear(1_000_000))
    }

    fn pkt(len: usize) -> Bytes {
        Bytes::from(vec![0u8; len])
    }

    #[test]
    fn builds_tree_and_rejects_duplicates() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        sched.add_class(ls(10, 1)).unwrap();
        sched.add_class(ls(11, 1)).unwrap();

        assert_eq!(sched.add_class(ClassConfig::new(10).with_parent(1)), Err(Error::Exists(10)));
        assert_eq!(sched.add_class(ClassConfig::new(2)), Err(Error::RootExists));
        assert_eq!(sched.add_class(ls(12, 99)), Err(Error::NotFound(99)));
        assert_eq!(sched.class_count(), 3);
    }

    #[test]
    fn table_full_after_max_classes() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        for i in 0..MAX_CLASSES as u32 - 1 {
            sched.add_class(ls(100 + i, 1)).unwrap();
        }

        assert_eq!(sched.add_class(ls(9999, 1)), Err(Error::TableFull(MAX_CLASSES)));

        // earlier classes are still resolvable and intact
        for i in 0..MAX_CLASSES as u32 - 1 {
            assert_eq!(sched.class_stats(100 + i).unwrap().handle, 100 + i);
        }
    }

    #[test]
    fn delete_with_children_is_busy() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        sched.add_class(ls(10, 1)).unwrap();

        assert_eq!(sched.delete_class(1), Err(Error::Busy(1)));
        sched.delete_class(10).unwrap();
        sched.delete_class(1).unwrap();
        assert_eq!(sched.class_count(), 0);
    }

    #[test]
    fn delete_backlogged_leaf_purges_first() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        sched.add_class(ls(10, 1)).unwrap();

        for _ in 0..5 {
            sched.enqueue(10, pkt(100)).unwrap();
        }
        assert_eq!(sched.backlog(), 5);

        sched.delete_class(10).unwrap();
        assert_eq!(sched.backlog(), 0);
    }

    #[test]
    fn delete_patches_sibling_chain() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        for h in [10, 11, 12] {
            sched.add_class(ls(h, 1)).unwrap();
        }

        sched.delete_class(11).unwrap();
        let order: Vec<u32> = sched.stats_dump().iter().map(|s| s.handle).collect();
        assert_eq!(order, [1, 10, 12]);
    }

    #[test]
    fn stats_dump_is_preorder() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        sched.add_class(ls(10, 1)).unwrap();
        sched.add_class(ls(11, 1)).unwrap();
        sched.add_class(ls(100, 10)).unwrap();
        sched.add_class(ls(101, 10)).unwrap();
        sched.add_class(ls(110, 11)).unwrap();

        let order: Vec<u32> = sched.stats_dump().iter().map(|s| s.handle).collect();
        assert_eq!(order, [1, 10, 100, 101, 11, 110]);
    }

    #[test]
    fn enqueue_falls_back_to_default_class() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        sched.add_class(ls(10, 1).with_default(true)).unwrap();

        // unknown tag
        sched.enqueue(777, pkt(64)).unwrap();
        // tag of a non-leaf class
        sched.enqueue(1, pkt(64)).unwrap();

        assert_eq!(sched.class_stats(10).unwrap().qlen, 2);
    }

    #[test]
    fn enqueue_without_default_class_is_refused() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        sched.add_class(ls(10, 1)).unwrap();

        assert_eq!(sched.enqueue(777, pkt(64)), Err(EnqueueError::NoClass));
        assert_eq!(sched.backlog(), 0);
    }

    #[test]
    fn qlen_stays_within_qlimit_and_drops_count() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        sched.add_class(ls(10, 1).with_qlimit(50)).unwrap();

        for i in 0..100 {
            let res = sched.enqueue(10, pkt(100));
            if i < 50 {
                res.unwrap();
            } else {
                assert_eq!(res, Err(EnqueueError::QueueFull));
            }
            let stats = sched.class_stats(10).unwrap();
            assert!(stats.qlen <= stats.qlimit);
        }

        let stats = sched.class_stats(10).unwrap();
        assert_eq!(stats.qlen, 50);
        assert_eq!(stats.drop_cnt.packets, 50);
        assert_eq!(stats.drop_cnt.bytes, 5000);
        assert_eq!(sched.backlog(), 50);
    }

    #[test]
    fn purge_empties_every_class() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        sched.add_class(ls(10, 1)).unwrap();
        sched.add_class(ls(11, 1)).unwrap();

        for _ in 0..10 {
            sched.enqueue(10, pkt(100)).unwrap();
            sched.enqueue(11, pkt(100)).unwrap();
        }
        assert_eq!(sched.backlog(), 20);

        sched.purge();
        assert_eq!(sched.backlog(), 0);
        for handle in [10, 11] {
            let stats = sched.class_stats(handle).unwrap();
            assert_eq!(stats.qlen, 0);
            assert_eq!(stats.drop_cnt.packets, 10);
            assert_eq!(stats.nactive, 0);
        }
        assert!(sched.dequeue(true).is_none());
    }

    #[test]
    fn modify_class_swaps_curves() {
        let mut sched = HfscScheduler::new();
        sched.add_class(ClassConfig::new(1)).unwrap();
        sched.add_class(ls(10, 1)).unwrap();

        sched
            .modify_class(10, Some(ServiceCurve::linear(2_000_000)), None, None)
            .unwrap();
        let stats = sched.class_stats(10).unwrap();
        assert!(stats.rsc.is_some());
        assert!(stats.fsc.is_some());

        // removing the link-share curve purges the backlog first
        sched.enqueue(10, pkt(100)).unwrap();
        sched.modify_class(10, None, Some(ServiceCurve::new(0, 0, 0)), None).unwrap();
        let stats = sched.class_stats(10).unwrap();
        assert!(stats.fsc.is_none());
        assert_eq!(stats.qlen, 0);
        assert_eq!(sched.backlog(), 0);

        assert_eq!(sched.modify_class(99, None, None, None), Err(Error::NotFound(99)));
    }
}
