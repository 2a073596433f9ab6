//! # Admission control
//!
//! Decides, per incoming job, whether it runs now, waits, or is rejected.
//!
//! ```text
//! admit(timeout, cancel)
//!   ├─ free slot?             ──► Admitted (fast path, queue bypassed)
//!   ├─ timeout == 0           ──► Rejected(CapacityExceeded)
//!   ├─ queue full             ──► Rejected(QueueFull)
//!   └─ wait on ticket
//!        ├─ served by release ──► Admitted (slot handed over directly)
//!        ├─ timeout elapsed   ──► Rejected(AcquireTimeout)
//!        └─ cancelled/dropped ──► Rejected(Cancelled)
//! ```
//!
//! ## Invariants
//! - `0 <= active <= N` and `0 <= queued <= M`.
//! - Tickets are served strictly FIFO.
//! - Every slot is released exactly once: [`SlotPermit`] is not `Clone` and releases in `Drop`.
//! - Serving and withdrawing a ticket both happen under the same lock, so a ticket is
//!   either served or withdrawn, never both. A waiter that loses the race against a
//!   release is admitted.
mod pool;
mod queue;
mod state;

pub use pool::SlotPool;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use pressgate_model::{AdmissionCounters, Event, EventKind, JobId, JobRecord, RejectReason};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::{error::AdmitError, observer::ObserverSet};

use queue::WaitTicket;
use state::{AdmissionState, Handoff};

/// Shared admission controller. Cloning is cheap and yields a handle to the same state.
#[derive(Clone)]
pub struct AdmissionController {
    inner: Arc<Shared>,
}

struct Shared {
    state: Mutex<AdmissionState>,
    observers: ObserverSet,
    slots: usize,
    queue_capacity: usize,
}

impl AdmissionController {
    /// Controller with `slots` execution slots (at least one) and room for
    /// `queue_capacity` waiting callers.
    pub fn new(slots: usize, queue_capacity: usize, observers: ObserverSet) -> Self {
        let state = AdmissionState::new(slots, queue_capacity);
        let slots = state.pool.capacity();
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(state),
                observers,
                slots,
                queue_capacity,
            }),
        }
    }

    /// Non-blocking admission; fails with `CapacityExceeded` when no slot is free.
    pub fn try_admit(&self) -> Result<SlotPermit, AdmitError> {
        let id = JobId::new();
        let admitted = {
            let mut state = self.lock();
            let admitted = state.try_admit(id);
            if !admitted {
                state.record_rejected(RejectReason::CapacityExceeded);
            }
            admitted
        };

        if admitted {
            self.publish_admitted(id, Duration::ZERO);
            Ok(self.permit(id, Duration::ZERO))
        } else {
            self.publish_rejected(id, RejectReason::CapacityExceeded, Duration::ZERO);
            Err(AdmitError::CapacityExceeded)
        }
    }

    /// Admit a job, waiting at most `acquire_timeout` in the FIFO queue.
    ///
    /// With a zero timeout this never suspends. Cancelling `cancel` (or dropping the
    /// returned future) while waiting withdraws the ticket without side effects.
    #[instrument(
        level = "trace",
        skip(self, cancel),
        fields(timeout_ms = acquire_timeout.as_millis() as u64)
    )]
    pub async fn admit(
        &self,
        acquire_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<SlotPermit, AdmitError> {
        let id = JobId::new();

        let enqueued = {
            let mut state = self.lock();
            if state.try_admit(id) {
                Ok(None)
            } else if acquire_timeout.is_zero() {
                state.record_rejected(RejectReason::CapacityExceeded);
                Err(RejectReason::CapacityExceeded)
            } else {
                let (ticket, rx) = WaitTicket::new(id);
                match state.enqueue(ticket) {
                    Ok(position) => Ok(Some((rx, position))),
                    Err(_) => {
                        state.record_rejected(RejectReason::QueueFull);
                        Err(RejectReason::QueueFull)
                    }
                }
            }
        };

        let (rx, position) = match enqueued {
            Ok(None) => {
                self.publish_admitted(id, Duration::ZERO);
                return Ok(self.permit(id, Duration::ZERO));
            }
            Ok(Some(waiting)) => waiting,
            Err(reason) => {
                self.publish_rejected(id, reason, Duration::ZERO);
                return Err(reason.into());
            }
        };

        self.inner.observers.publish(
            Event::new(EventKind::JobQueued)
                .with_job(id)
                .with_position(position),
        );
        trace!(job = %id, position, "waiting for an execution slot");

        let mut waiter = Waiter {
            controller: self.clone(),
            id,
            since: Instant::now(),
            resolved: false,
        };

        tokio::select! {
            biased;
            served = rx => match served {
                Ok(()) => Ok(waiter.served()),
                Err(_) => waiter.give_up(RejectReason::Cancelled),
            },
            _ = cancel.cancelled() => waiter.give_up(RejectReason::Cancelled),
            _ = tokio::time::sleep(acquire_timeout) => waiter.give_up(RejectReason::AcquireTimeout),
        }
    }

    /// Execution slots (N).
    #[inline]
    pub fn slots(&self) -> usize {
        self.inner.slots
    }

    /// Wait-queue capacity (M).
    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.inner.queue_capacity
    }

    pub fn active(&self) -> usize {
        self.lock().pool.in_use()
    }

    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn counters(&self) -> AdmissionCounters {
        self.lock().counters()
    }

    /// Counters and running jobs read under one lock acquisition.
    pub fn snapshot(&self) -> (AdmissionCounters, Vec<JobRecord>) {
        let state = self.lock();
        (state.counters(), state.jobs())
    }

    pub(crate) fn observers(&self) -> &ObserverSet {
        &self.inner.observers
    }

    pub(crate) fn mark_started(&self, id: JobId, soft_deadline: Option<Duration>) {
        self.lock().mark_started(id, soft_deadline);
    }

    pub(crate) fn mark_overdue(&self, id: JobId) {
        self.lock().mark_overdue(id);
    }

    fn lock(&self) -> MutexGuard<'_, AdmissionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn permit(&self, id: JobId, waited: Duration) -> SlotPermit {
        SlotPermit {
            controller: self.clone(),
            id,
            waited,
        }
    }

    fn release(&self, id: JobId) {
        let handoff = self.lock().release(id);
        self.inner
            .observers
            .publish(Event::new(EventKind::SlotReleased).with_job(id));
        if let Some(Handoff { job, waited }) = handoff {
            debug!(released = %id, next = %job, "slot handed to queue head");
            self.publish_admitted(job, waited);
        }
    }

    fn publish_admitted(&self, id: JobId, waited: Duration) {
        self.inner.observers.publish(
            Event::new(EventKind::JobAdmitted)
                .with_job(id)
                .with_wait(waited),
        );
    }

    fn publish_rejected(&self, id: JobId, reason: RejectReason, waited: Duration) {
        self.inner.observers.publish(
            Event::new(EventKind::JobRejected)
                .with_job(id)
                .with_reason(reason)
                .with_wait(waited),
        );
    }
}

/// Scoped ownership of one execution slot.
///
/// Dropping the permit releases the slot, on every exit path of the job body
/// (return, error, panic unwinding, task cancellation).
#[must_use = "dropping the permit immediately releases the slot"]
pub struct SlotPermit {
    controller: AdmissionController,
    id: JobId,
    waited: Duration,
}

impl SlotPermit {
    #[inline]
    pub fn job_id(&self) -> JobId {
        self.id
    }

    /// Time spent in the wait queue (zero on the fast path).
    #[inline]
    pub fn waited(&self) -> Duration {
        self.waited
    }

    pub(crate) fn controller(&self) -> &AdmissionController {
        &self.controller
    }
}

impl std::fmt::Debug for SlotPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotPermit")
            .field("job", &self.id)
            .field("waited", &self.waited)
            .finish()
    }
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.controller.release(self.id);
    }
}

/// Drop guard for a queued caller.
///
/// Resolves the ticket exactly once: served, timed out, cancelled, or (if the
/// awaiting future is dropped) withdrawn in `Drop`.
struct Waiter {
    controller: AdmissionController,
    id: JobId,
    since: Instant,
    resolved: bool,
}

impl Waiter {
    fn served(&mut self) -> SlotPermit {
        self.resolved = true;
        self.controller.permit(self.id, self.since.elapsed())
    }

    fn give_up(&mut self, reason: RejectReason) -> Result<SlotPermit, AdmitError> {
        self.resolved = true;
        let withdrawn = {
            let mut state = self.controller.lock();
            let withdrawn = state.withdraw(self.id);
            if withdrawn {
                state.record_rejected(reason);
            }
            withdrawn
        };

        if withdrawn {
            let waited = self.since.elapsed();
            self.controller.publish_rejected(self.id, reason, waited);
            Err(reason.into())
        } else {
            // Served in the same instant; the slot is already ours.
            Ok(self.controller.permit(self.id, self.since.elapsed()))
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        let withdrawn = {
            let mut state = self.controller.lock();
            let withdrawn = state.withdraw(self.id);
            if withdrawn {
                state.record_rejected(RejectReason::Cancelled);
            }
            withdrawn
        };

        if withdrawn {
            self.controller
                .publish_rejected(self.id, RejectReason::Cancelled, self.since.elapsed());
        } else {
            // Served but nobody is left to run the job: pass the slot on.
            self.controller.release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::Recorder;
    use std::sync::Arc;

    fn controller(slots: usize, queue: usize) -> AdmissionController {
        AdmissionController::new(slots, queue, ObserverSet::default())
    }

    async fn wait_until_queued(ctl: &AdmissionController, n: usize) {
        for _ in 0..1000 {
            if ctl.queued() == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("queue never reached {n} (now {})", ctl.queued());
    }

    #[tokio::test]
    async fn fast_path_admits_while_slots_are_free() {
        let ctl = controller(2, 0);
        let cancel = CancellationToken::new();

        let a = ctl.admit(Duration::ZERO, &cancel).await.unwrap();
        let b = ctl.admit(Duration::ZERO, &cancel).await.unwrap();
        assert_ne!(a.job_id(), b.job_id());
        assert_eq!(ctl.active(), 2);
        assert_eq!(a.waited(), Duration::ZERO);

        drop(a);
        drop(b);
        assert_eq!(ctl.active(), 0);
        assert_eq!(ctl.counters().total_finished, 2);
    }

    #[tokio::test]
    async fn fail_fast_never_queues() {
        // N=1, M=1, acquireTimeout=0: B and C are rejected, queue stays unused.
        let ctl = controller(1, 1);
        let cancel = CancellationToken::new();

        let _a = ctl.admit(Duration::ZERO, &cancel).await.unwrap();
        let b = ctl.admit(Duration::ZERO, &cancel).await;
        let c = ctl.admit(Duration::ZERO, &cancel).await;

        assert_eq!(b.unwrap_err(), AdmitError::CapacityExceeded);
        assert_eq!(c.unwrap_err(), AdmitError::CapacityExceeded);
        assert_eq!(ctl.queued(), 0);

        let counters = ctl.counters();
        assert_eq!(counters.total_admitted, 1);
        assert_eq!(counters.rejected.capacity_exceeded, 2);
    }

    #[test]
    fn try_admit_is_synchronous() {
        let ctl = controller(1, 5);
        let permit = ctl.try_admit().unwrap();
        assert_eq!(ctl.try_admit().unwrap_err(), AdmitError::CapacityExceeded);
        drop(permit);
        assert!(ctl.try_admit().is_ok());
    }

    #[tokio::test]
    async fn full_queue_rejects_without_waiting() {
        let ctl = controller(1, 1);
        let cancel = CancellationToken::new();
        let a = ctl.admit(Duration::ZERO, &cancel).await.unwrap();

        let waiter = {
            let ctl = ctl.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { ctl.admit(Duration::from_secs(5), &cancel).await })
        };
        wait_until_queued(&ctl, 1).await;

        let started = Instant::now();
        let c = ctl.admit(Duration::from_secs(5), &cancel).await;
        assert_eq!(c.unwrap_err(), AdmitError::QueueFull);
        assert!(started.elapsed() < Duration::from_secs(1));

        drop(a);
        let b = waiter.await.unwrap().expect("B should be admitted once A releases");
        assert_eq!(ctl.active(), 1);
        assert_eq!(ctl.queued(), 0);
        drop(b);
        assert_eq!(ctl.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_times_out_when_slot_is_never_released() {
        let ctl = controller(1, 1);
        let cancel = CancellationToken::new();
        let _a = ctl.admit(Duration::ZERO, &cancel).await.unwrap();

        let b = ctl.admit(Duration::from_secs(5), &cancel).await;
        assert_eq!(b.unwrap_err(), AdmitError::AcquireTimeout);
        assert_eq!(ctl.queued(), 0);
        assert_eq!(ctl.counters().rejected.acquire_timeout, 1);
    }

    #[tokio::test]
    async fn released_slot_goes_to_longest_waiting_ticket() {
        let ctl = controller(1, 3);
        let cancel = CancellationToken::new();
        let a = ctl.admit(Duration::ZERO, &cancel).await.unwrap();

        let spawn_waiter = |tag: &'static str| {
            let ctl = ctl.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let permit = ctl.admit(Duration::from_secs(10), &cancel).await.unwrap();
                (tag, permit)
            })
        };

        let first = spawn_waiter("first");
        wait_until_queued(&ctl, 1).await;
        let second = spawn_waiter("second");
        wait_until_queued(&ctl, 2).await;

        drop(a);
        let (tag, permit) = first.await.unwrap();
        assert_eq!(tag, "first");
        assert_eq!(ctl.queued(), 1, "second is still waiting");

        drop(permit);
        let (tag, _permit) = second.await.unwrap();
        assert_eq!(tag, "second");
    }

    #[tokio::test]
    async fn cancellation_withdraws_ticket() {
        let ctl = controller(1, 1);
        let cancel = CancellationToken::new();
        let _a = ctl.admit(Duration::ZERO, &cancel).await.unwrap();

        let waiter_cancel = CancellationToken::new();
        let waiter = {
            let ctl = ctl.clone();
            let token = waiter_cancel.clone();
            tokio::spawn(async move { ctl.admit(Duration::from_secs(30), &token).await })
        };
        wait_until_queued(&ctl, 1).await;

        waiter_cancel.cancel();
        assert_eq!(waiter.await.unwrap().unwrap_err(), AdmitError::Cancelled);
        assert_eq!(ctl.queued(), 0);
        assert_eq!(ctl.active(), 1);
        assert_eq!(ctl.counters().rejected.cancelled, 1);
    }

    #[tokio::test]
    async fn dropped_waiter_leaves_queue() {
        let ctl = controller(1, 1);
        let cancel = CancellationToken::new();
        let a = ctl.admit(Duration::ZERO, &cancel).await.unwrap();

        let waiter = {
            let ctl = ctl.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { ctl.admit(Duration::from_secs(30), &cancel).await })
        };
        wait_until_queued(&ctl, 1).await;

        waiter.abort();
        let _ = waiter.await;
        assert_eq!(ctl.queued(), 0);

        drop(a);
        assert_eq!(ctl.active(), 0, "slot returned to the pool, not to the dead waiter");
    }

    #[tokio::test]
    async fn served_but_abandoned_waiter_passes_slot_on() {
        let ctl = controller(1, 2);
        let cancel = CancellationToken::new();
        let a = ctl.admit(Duration::ZERO, &cancel).await.unwrap();

        // Build the admit future by hand so it can be dropped after being served
        // but before it is polled again.
        let abandoned = ctl.admit(Duration::from_secs(30), &cancel);
        let mut abandoned = Box::pin(abandoned);
        assert!(futures_poll_once(abandoned.as_mut()).await.is_none());
        assert_eq!(ctl.queued(), 1);

        let next = {
            let ctl = ctl.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { ctl.admit(Duration::from_secs(30), &cancel).await })
        };
        wait_until_queued(&ctl, 2).await;

        drop(a); // serves `abandoned`
        drop(abandoned); // never picks it up -> slot moves to `next`

        let permit = next.await.unwrap().expect("slot should reach the next waiter");
        assert_eq!(ctl.active(), 1);
        drop(permit);
        assert_eq!(ctl.active(), 0);
    }

    #[tokio::test]
    async fn events_follow_admission_decisions() {
        let recorder = Arc::new(Recorder::default());
        let ctl = AdmissionController::new(1, 0, ObserverSet::new(vec![recorder.clone()]));
        let cancel = CancellationToken::new();

        let a = ctl.admit(Duration::ZERO, &cancel).await.unwrap();
        let _ = ctl.admit(Duration::from_secs(1), &cancel).await;
        drop(a);

        assert_eq!(
            recorder.kinds(),
            vec![
                EventKind::JobAdmitted,
                EventKind::JobRejected,
                EventKind::SlotReleased
            ]
        );
        let rejected = &recorder.events()[1];
        assert_eq!(rejected.reason, Some(RejectReason::QueueFull));
    }

    #[tokio::test]
    async fn never_exceeds_slot_count_under_contention() {
        let ctl = controller(3, 64);
        let cancel = CancellationToken::new();
        let peak = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let ctl = ctl.clone();
            let cancel = cancel.clone();
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let permit = ctl.admit(Duration::from_secs(10), &cancel).await.unwrap();
                let active = ctl.active();
                peak.fetch_max(active, std::sync::atomic::Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                drop(permit);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert!(peak.load(std::sync::atomic::Ordering::SeqCst) <= 3);
        let c = ctl.counters();
        assert_eq!(c.total_admitted, 32);
        assert_eq!(c.total_finished, 32);
        assert_eq!(c.active, 0);
        assert_eq!(c.queued, 0);
    }

    /// Poll a future exactly once; `Some` if it completed.
    async fn futures_poll_once<F: std::future::Future + ?Sized>(
        fut: std::pin::Pin<&mut F>,
    ) -> Option<F::Output> {
        let mut fut = Some(fut);
        std::future::poll_fn(move |cx| {
            let f = fut.take().expect("polled once");
            match f.poll(cx) {
                std::task::Poll::Ready(v) => std::task::Poll::Ready(Some(v)),
                std::task::Poll::Pending => std::task::Poll::Ready(None),
            }
        })
        .await
    }
}
