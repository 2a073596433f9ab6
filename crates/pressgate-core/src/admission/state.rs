use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use pressgate_model::{AdmissionCounters, JobId, JobRecord, RejectReason, RejectionBreakdown};

use super::pool::SlotPool;
use super::queue::{WaitQueue, WaitTicket};

/// A slot passed straight from a finishing job to the queue head.
pub(crate) struct Handoff {
    pub job: JobId,
    pub waited: Duration,
}

/// All mutable admission state, guarded as one unit by the controller's mutex.
pub(crate) struct AdmissionState {
    pub pool: SlotPool,
    pub queue: WaitQueue,
    /// Jobs waiting for or holding a slot, keyed by id.
    jobs: HashMap<JobId, JobRecord>,

    total_admitted: u64,
    rejected: RejectionBreakdown,
    total_timed_out: u64,
    total_finished: u64,
    last_started_at: Option<SystemTime>,
    last_finished_at: Option<SystemTime>,
}

impl AdmissionState {
    pub fn new(slots: usize, queue_capacity: usize) -> Self {
        Self {
            pool: SlotPool::new(slots),
            queue: WaitQueue::new(queue_capacity),
            jobs: HashMap::new(),
            total_admitted: 0,
            rejected: RejectionBreakdown::default(),
            total_timed_out: 0,
            total_finished: 0,
            last_started_at: None,
            last_finished_at: None,
        }
    }

    /// Fast path: take a free slot for `id` if there is one.
    pub fn try_admit(&mut self, id: JobId) -> bool {
        if !self.pool.try_acquire() {
            return false;
        }
        self.record_admitted(id, Duration::ZERO);
        true
    }

    pub fn enqueue(&mut self, ticket: WaitTicket) -> Result<usize, WaitTicket> {
        let id = ticket.id;
        let position = self.queue.enqueue(ticket)?;
        self.jobs.insert(id, JobRecord::queued(id));
        Ok(position)
    }

    /// Drop a waiting ticket. `true` if it was still queued, i.e. it was *not* served.
    pub fn withdraw(&mut self, id: JobId) -> bool {
        let withdrawn = self.queue.remove(id).is_some();
        if withdrawn {
            self.jobs.remove(&id);
        }
        withdrawn
    }

    pub fn record_rejected(&mut self, reason: RejectReason) {
        self.rejected.record(reason);
    }

    /// Give back the slot held by `id`.
    ///
    /// The longest-waiting ticket, if any, receives the slot directly; otherwise the
    /// slot returns to the pool.
    pub fn release(&mut self, id: JobId) -> Option<Handoff> {
        self.jobs.remove(&id);
        self.total_finished += 1;
        self.last_finished_at = Some(SystemTime::now());

        match self.queue.dequeue() {
            Some(ticket) => {
                let handoff = Handoff {
                    job: ticket.id,
                    waited: ticket.enqueued_at.elapsed(),
                };
                self.record_admitted(handoff.job, handoff.waited);
                ticket.serve();
                Some(handoff)
            }
            None => {
                self.pool.release();
                None
            }
        }
    }

    pub fn mark_started(&mut self, id: JobId, soft_deadline: Option<Duration>) {
        if let Some(rec) = self.jobs.get_mut(&id) {
            match soft_deadline {
                Some(deadline) => rec.start(deadline),
                None => rec.started_at = Some(SystemTime::now()),
            }
        }
    }

    pub fn mark_overdue(&mut self, id: JobId) {
        self.total_timed_out += 1;
        if let Some(rec) = self.jobs.get_mut(&id) {
            rec.mark_overdue();
        }
    }

    pub fn counters(&self) -> AdmissionCounters {
        AdmissionCounters {
            active: self.pool.in_use(),
            queued: self.queue.len(),
            total_admitted: self.total_admitted,
            total_rejected: self.rejected.total(),
            rejected: self.rejected,
            total_timed_out: self.total_timed_out,
            total_finished: self.total_finished,
            last_started_at: self.last_started_at,
            last_finished_at: self.last_finished_at,
        }
    }

    /// Queued and running jobs, oldest first.
    pub fn jobs(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self.jobs.values().cloned().collect();
        jobs.sort_by_key(|j| j.admitted_at);
        jobs
    }

    fn record_admitted(&mut self, id: JobId, waited: Duration) {
        self.total_admitted += 1;
        self.last_started_at = Some(SystemTime::now());
        self.jobs
            .entry(id)
            .and_modify(|rec| rec.admit(waited))
            .or_insert_with(|| JobRecord::admitted(id, waited));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressgate_model::JobState;

    #[test]
    fn fast_path_admits_until_pool_is_empty() {
        let mut st = AdmissionState::new(1, 1);
        assert!(st.try_admit(JobId::new()));
        assert!(!st.try_admit(JobId::new()));

        let c = st.counters();
        assert_eq!(c.active, 1);
        assert_eq!(c.total_admitted, 1);
        assert!(c.last_started_at.is_some());
    }

    #[test]
    fn release_without_waiters_returns_slot_to_pool() {
        let mut st = AdmissionState::new(1, 1);
        let id = JobId::new();
        assert!(st.try_admit(id));

        assert!(st.release(id).is_none());
        let c = st.counters();
        assert_eq!(c.active, 0);
        assert_eq!(c.total_finished, 1);
        assert!(st.jobs().is_empty());
    }

    #[test]
    fn release_hands_slot_to_queue_head() {
        let mut st = AdmissionState::new(1, 2);
        let running = JobId::new();
        assert!(st.try_admit(running));

        let first = JobId::new();
        let (t1, mut rx1) = WaitTicket::new(first);
        let (t2, mut rx2) = WaitTicket::new(JobId::new());
        assert!(st.enqueue(t1).is_ok());
        assert!(st.enqueue(t2).is_ok());

        let handoff = st.release(running).expect("queue head should be served");
        assert_eq!(handoff.job, first);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());

        let c = st.counters();
        assert_eq!(c.active, 1, "slot moved, not freed");
        assert_eq!(c.queued, 1);
        assert_eq!(c.total_admitted, 2);
        let jobs = st.jobs();
        assert_eq!(jobs.len(), 2);
        let served = jobs.iter().find(|j| j.id == first).unwrap();
        assert_eq!(served.state, JobState::Running);
        assert_eq!(
            jobs.iter().filter(|j| j.state == JobState::Queued).count(),
            1
        );
    }

    #[test]
    fn withdrawn_ticket_leaves_no_record() {
        let mut st = AdmissionState::new(1, 1);
        assert!(st.try_admit(JobId::new()));

        let waiting = JobId::new();
        let (t, _rx) = WaitTicket::new(waiting);
        assert!(st.enqueue(t).is_ok());
        assert_eq!(st.jobs().iter().filter(|j| j.state == JobState::Queued).count(), 1);

        assert!(st.withdraw(waiting));
        assert!(st.jobs().iter().all(|j| j.id != waiting));
    }

    #[test]
    fn withdraw_distinguishes_served_from_waiting() {
        let mut st = AdmissionState::new(1, 1);
        let running = JobId::new();
        assert!(st.try_admit(running));

        let waiting = JobId::new();
        let (t, _rx) = WaitTicket::new(waiting);
        assert!(st.enqueue(t).is_ok());
        st.release(running);

        assert!(!st.withdraw(waiting), "already served");
    }

    #[test]
    fn overdue_marks_record_and_counts() {
        let mut st = AdmissionState::new(1, 0);
        let id = JobId::new();
        assert!(st.try_admit(id));
        st.mark_started(id, Some(Duration::from_secs(1)));
        st.mark_overdue(id);

        assert_eq!(st.counters().total_timed_out, 1);
        let jobs = st.jobs();
        assert_eq!(jobs[0].state, JobState::TimedOut);
        assert!(jobs[0].overdue);
        assert!(jobs[0].deadline.is_some());
    }

    #[test]
    fn rejections_are_counted_by_reason() {
        let mut st = AdmissionState::new(1, 0);
        st.record_rejected(RejectReason::QueueFull);
        st.record_rejected(RejectReason::CapacityExceeded);

        let c = st.counters();
        assert_eq!(c.total_rejected, 2);
        assert_eq!(c.rejected.queue_full, 1);
        assert_eq!(c.rejected.capacity_exceeded, 1);
    }
}
