use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::class::ClassConfig;
use crate::error::{EnqueueError, Error};
use crate::sched::HfscScheduler;
use crate::stats::ClassStats;
use hfsc_curve::ServiceCurve;

/// Interval between dequeue retries while backlogged traffic is not yet
/// allowed to leave.
///
/// Link-sharing dequeue legitimately yields nothing while every candidate
/// class's fit time lies in the future, so the driver polls again at
/// sub-scheduling-tick granularity rather than stalling output.
pub const RETRY_INTERVAL: Duration = Duration::from_micros(250);

/// Handle to a scheduler attached to an interface send path.
///
/// Every operation takes one coarse lock around the whole scheduler: the
/// algorithm's ancestor-chain walks need the entire tree as a consistent
/// snapshot, so there is nothing to gain from finer locking. A background
/// drain driver moves scheduled packets to the interface's output channel
/// and embodies the retry timer. Dropping the handle cancels the driver;
/// [`HfscHandle::detach`] additionally purges all queues first.
#[derive(Debug)]
pub struct HfscHandle {
    inner: Arc<Inner>,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct Inner {
    sched: Mutex<HfscScheduler>,
    /// Rearms the parked driver on the first enqueue after idle.
    rearm: Notify,
    /// Outbound queue length, shared with the owning interface.
    ifq_len: Arc<AtomicUsize>,
}

impl HfscHandle {
    /// Attaches a fresh scheduler to an interface output queue and spawns
    /// the drain driver.
    pub fn attach(output: mpsc::UnboundedSender<Bytes>) -> Self {
        let ifq_len = Arc::new(AtomicUsize::new(0));
        let sched = HfscScheduler::new().with_ifq_counter(Arc::clone(&ifq_len));
        let inner =
            Arc::new(Inner { sched: Mutex::new(sched), rearm: Notify::new(), ifq_len });
        let cancel = CancellationToken::new();

        tokio::spawn(drive(Arc::clone(&inner), output, cancel.clone()));
        tracing::debug!("scheduler attached");

        Self { inner, cancel }
    }

    /// See [`HfscScheduler::add_class`].
    pub fn add_class(&self, config: ClassConfig) -> Result<u32, Error> {
        self.inner.sched.lock().add_class(config)
    }

    /// See [`HfscScheduler::delete_class`].
    pub fn delete_class(&self, handle: u32) -> Result<(), Error> {
        self.inner.sched.lock().delete_class(handle)
    }

    /// See [`HfscScheduler::modify_class`].
    pub fn modify_class(
        &self,
        handle: u32,
        realtime: Option<ServiceCurve>,
        linkshare: Option<ServiceCurve>,
        upperlimit: Option<ServiceCurve>,
    ) -> Result<(), Error> {
        self.inner.sched.lock().modify_class(handle, realtime, linkshare, upperlimit)
    }

    /// Queues a packet and wakes the drain driver.
    pub fn enqueue(&self, class_tag: u32, packet: Bytes) -> Result<(), EnqueueError> {
        let res = self.inner.sched.lock().enqueue(class_tag, packet);
        if res.is_ok() {
            self.inner.rearm.notify_one();
        }
        res
    }

    /// See [`HfscScheduler::dequeue`]. Only useful when driving the
    /// scheduler manually instead of through the drain driver.
    pub fn dequeue(&self, remove: bool) -> Option<Bytes> {
        self.inner.sched.lock().dequeue(remove)
    }

    /// See [`HfscScheduler::purge`].
    pub fn purge(&self) {
        self.inner.sched.lock().purge();
    }

    /// See [`HfscScheduler::class_stats`].
    pub fn class_stats(&self, handle: u32) -> Result<ClassStats, Error> {
        self.inner.sched.lock().class_stats(handle)
    }

    /// See [`HfscScheduler::stats_dump`].
    pub fn stats_dump(&self) -> Vec<ClassStats> {
        self.inner.sched.lock().stats_dump()
    }

    /// Packets currently queued in the discipline.
    pub fn backlog(&self) -> u64 {
        self.inner.sched.lock().backlog()
    }

    /// The owning interface's view of the queue length.
    pub fn ifq_len(&self) -> usize {
        self.inner.ifq_len.load(Ordering::Relaxed)
    }

    /// Detaches the scheduler: stops the driver and purges every class,
    /// backlogged or not.
    pub fn detach(self) {
        self.cancel.cancel();
        self.inner.sched.lock().purge();
        tracing::debug!("scheduler detached");
    }
}

impl Drop for HfscHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The drain driver: dequeues to the output channel, retrying every
/// [`RETRY_INTERVAL`] while the backlog is non-empty but nothing fits, and
/// parking until the next enqueue when the tree runs dry.
async fn drive(
    inner: Arc<Inner>,
    output: mpsc::UnboundedSender<Bytes>,
    cancel: CancellationToken,
) {
    loop {
        while inner.sched.lock().is_empty() {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = inner.rearm.notified() => {}
            }
        }

        loop {
            let packet = inner.sched.lock().dequeue(true);
            match packet {
                Some(packet) => {
                    if output.send(packet).is_err() {
                        // receiver gone: the interface went down
                        return;
                    }
                }
                None => {
                    if inner.sched.lock().is_empty() {
                        break;
                    }
                    tracing::trace!("dequeue stalled on unfit classes, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(RETRY_INTERVAL) => {}
                    }
                }
            }
        }
    }
}
