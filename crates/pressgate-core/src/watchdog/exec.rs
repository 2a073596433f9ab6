use std::any::Any;
use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use pressgate_model::{Event, EventKind, JobId, JobState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::admission::{AdmissionController, SlotPermit};
use crate::error::{AdmitError, JobError};

/// Opaque, synchronous unit of work executed under an execution slot.
///
/// Implemented for every `FnOnce() -> Result<T, E>` whose error is displayable.
pub trait JobBody: Send + 'static {
    type Output: Send + 'static;

    fn run(self) -> Result<Self::Output, JobError>;
}

impl<F, T, E> JobBody for F
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Display,
{
    type Output = T;

    fn run(self) -> Result<T, JobError> {
        self().map_err(|e| JobError::Failed(e.to_string()))
    }
}

/// Outcome of a supervised job.
#[derive(Debug)]
pub struct JobReport<T> {
    pub id: JobId,
    /// `Completed` or `TimedOut`.
    pub state: JobState,
    /// Time spent in the wait queue.
    pub waited: Duration,
    /// Wall time of the body.
    pub elapsed: Duration,
    pub result: Result<T, JobError>,
}

impl<T> JobReport<T> {
    pub fn timed_out(&self) -> bool {
        self.state == JobState::TimedOut
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs job bodies with a soft deadline.
///
/// The deadline never interrupts the body; it only flags the job as overdue.
/// The slot is released when the body really returns, even if the awaiting
/// caller has gone away.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionWatchdog {
    soft_deadline: Option<Duration>,
}

impl ExecutionWatchdog {
    /// `None` (or a zero duration) disables overrun tracking.
    pub fn new(soft_deadline: Option<Duration>) -> Self {
        Self {
            soft_deadline: soft_deadline.filter(|d| !d.is_zero()),
        }
    }

    pub fn soft_deadline(&self) -> Option<Duration> {
        self.soft_deadline
    }

    #[instrument(level = "debug", skip_all, fields(job = %permit.job_id()))]
    pub async fn supervise<B>(&self, permit: SlotPermit, body: B) -> JobReport<B::Output>
    where
        B: JobBody,
    {
        let id = permit.job_id();
        let waited = permit.waited();
        let controller = permit.controller().clone();
        let deadline = self.soft_deadline;

        controller.mark_started(id, deadline);
        let mut started = Event::new(EventKind::JobStarted).with_job(id);
        if let Some(d) = deadline {
            started = started.with_timeout(d);
        }
        controller.observers().publish(started);

        let overdue = Arc::new(AtomicBool::new(false));
        let clock = Instant::now();

        let mut task = tokio::task::spawn_blocking({
            let overdue = Arc::clone(&overdue);
            move || {
                let result = match catch_unwind(AssertUnwindSafe(move || body.run())) {
                    Ok(result) => result,
                    Err(payload) => Err(JobError::Panicked(panic_message(payload.as_ref()))),
                };
                let elapsed = clock.elapsed();

                // Finished right at the deadline, before the timer got a chance to run.
                if let Some(d) = deadline
                    && elapsed >= d
                {
                    flag_overdue(permit.controller(), id, d, &overdue);
                }
                let timed_out = overdue.load(Ordering::Acquire);

                permit.controller().observers().publish(
                    Event::new(EventKind::JobCompleted)
                        .with_job(id)
                        .with_elapsed(elapsed)
                        .with_failed(result.is_err())
                        .with_timed_out(timed_out),
                );
                drop(permit);

                Completion {
                    result,
                    elapsed,
                    timed_out,
                }
            }
        });

        let joined = match deadline {
            Some(d) => {
                tokio::select! {
                    biased;
                    joined = &mut task => joined,
                    _ = tokio::time::sleep(d) => {
                        flag_overdue(&controller, id, d, &overdue);
                        task.await
                    }
                }
            }
            None => task.await,
        };

        // The body itself never unwinds past `catch_unwind`; a join error means the
        // blocking pool was shut down underneath us.
        let completion = joined.unwrap_or_else(|e| Completion {
            result: Err(JobError::Panicked(e.to_string())),
            elapsed: clock.elapsed(),
            timed_out: overdue.load(Ordering::Acquire),
        });

        let state = if completion.timed_out {
            JobState::TimedOut
        } else {
            JobState::Completed
        };
        debug!(
            elapsed_ms = completion.elapsed.as_millis() as u64,
            state = ?state,
            failed = completion.result.is_err(),
            "job finished"
        );

        JobReport {
            id,
            state,
            waited,
            elapsed: completion.elapsed,
            result: completion.result,
        }
    }
}

struct Completion<T> {
    result: Result<T, JobError>,
    elapsed: Duration,
    timed_out: bool,
}

/// Marks `id` overdue exactly once, whichever side notices first.
fn flag_overdue(
    controller: &AdmissionController,
    id: JobId,
    deadline: Duration,
    overdue: &AtomicBool,
) {
    if overdue.swap(true, Ordering::AcqRel) {
        return;
    }
    controller.mark_overdue(id);
    warn!(
        job = %id,
        deadline_s = deadline.as_secs(),
        "job exceeded its soft deadline, still running"
    );
    controller.observers().publish(
        Event::new(EventKind::SoftDeadlineExceeded)
            .with_job(id)
            .with_timeout(deadline),
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "job body panicked".to_string()
    }
}

/// Admission followed by supervised execution: the path a heavy request takes.
#[derive(Clone)]
pub struct JobRunner {
    controller: AdmissionController,
    watchdog: ExecutionWatchdog,
    acquire_timeout: Duration,
}

impl JobRunner {
    pub fn new(
        controller: AdmissionController,
        watchdog: ExecutionWatchdog,
        acquire_timeout: Duration,
    ) -> Self {
        Self {
            controller,
            watchdog,
            acquire_timeout,
        }
    }

    pub fn controller(&self) -> &AdmissionController {
        &self.controller
    }

    pub fn watchdog(&self) -> &ExecutionWatchdog {
        &self.watchdog
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    /// Admit, then run `body` under the watchdog.
    ///
    /// `cancel` only matters while waiting for a slot; an admitted body always
    /// runs to completion.
    pub async fn run<B>(
        &self,
        body: B,
        cancel: &CancellationToken,
    ) -> Result<JobReport<B::Output>, AdmitError>
    where
        B: JobBody,
    {
        let permit = self.controller.admit(self.acquire_timeout, cancel).await?;
        Ok(self.watchdog.supervise(permit, body).await)
    }
}
