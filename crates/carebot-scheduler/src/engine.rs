use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    clock::Clock,
    error::{Result, SchedulerError},
    log::ActivityLog,
    store::{JobState, StateStore},
    types::{DispatchOutcome, FireContext, Job, JobHandler, JobId},
};

pub const DEFAULT_MAX_SLEEP: Duration = Duration::from_secs(60);

struct Entry {
    job: Job,
    next_fire: Option<DateTime<Utc>>,
    run_count: u32,
}

/// Cloneable handle that stops a running [`Scheduler`] from another task.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Ask `run_forever` to return at its next safe point. Calling this more
    /// than once has no further effect.
    pub fn shutdown(&self) {
        if !self.tx.send_replace(true) {
            info!("scheduler shutdown requested");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Single-loop job scheduler.
///
/// Jobs sit in a min-heap keyed by `(next_fire, registration order)`. The
/// loop pops every due entry, awaits its handler, records the outcome and
/// pushes the job back with a fire time strictly after the firing instant,
/// so occurrences missed while the process was asleep collapse into one.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    log: Arc<dyn ActivityLog>,
    store: Option<StateStore>,
    entries: Vec<Entry>,
    index: HashMap<JobId, usize>,
    queue: BinaryHeap<Reverse<(DateTime<Utc>, usize)>>,
    max_sleep: Duration,
    shutdown: ShutdownHandle,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, log: Arc<dyn ActivityLog>) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            clock,
            log,
            store: None,
            entries: Vec::new(),
            index: HashMap::new(),
            queue: BinaryHeap::new(),
            max_sleep: DEFAULT_MAX_SLEEP,
            shutdown: ShutdownHandle { tx: Arc::new(tx) },
        }
    }

    /// Persist fire state in `store` and honour state left by a previous run.
    /// Must be set before jobs are registered.
    pub fn with_state_store(mut self, store: StateStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Cap a single sleep so wall-clock jumps (host suspend, NTP) are noticed.
    pub fn with_max_sleep(mut self, max_sleep: Duration) -> Self {
        self.max_sleep = max_sleep.max(Duration::from_millis(1));
        self
    }

    /// Add a job. Returns its first fire time.
    ///
    /// An occurrence falling on the current second is due immediately. When
    /// a state store holds an earlier, already-passed `next_fire` for the same
    /// rule, that occurrence is kept so it fires once on the next pass.
    pub fn register(&mut self, job: Job) -> Result<DateTime<Utc>> {
        if self.index.contains_key(&job.id) {
            return Err(SchedulerError::DuplicateJob {
                id: job.id.to_string(),
            });
        }

        let now = self.clock.now();
        let schedule = job.trigger.to_string();
        let mut next =
            job.trigger
                .first_at_or_after(now)
                .ok_or_else(|| SchedulerError::InvalidSchedule {
                    expression: job.trigger.expression().to_string(),
                    reason: "schedule has no upcoming occurrence".to_string(),
                })?;

        let mut job = job;
        let mut run_count = 0;
        if let Some(store) = &self.store {
            match store.load(&job.id)? {
                Some(state) if state.schedule == schedule => {
                    run_count = state.run_count;
                    job.last_fired = job.last_fired.or(state.last_fired);
                    if state.next_fire < next {
                        warn!(
                            job_id = %job.id,
                            missed = %state.next_fire,
                            "occurrence missed while offline, firing once"
                        );
                        next = state.next_fire;
                    }
                }
                Some(_) => info!(job_id = %job.id, "schedule changed, stored state ignored"),
                None => {}
            }
        }

        let idx = self.entries.len();
        info!(job_id = %job.id, trigger = %job.trigger, next_fire = %next, "job registered");
        self.index.insert(job.id.clone(), idx);
        self.entries.push(Entry {
            job,
            next_fire: Some(next),
            run_count,
        });
        self.queue.push(Reverse((next, idx)));
        self.persist(idx);
        Ok(next)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Request `run_forever` to stop. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// `(id, next_fire)` for every live job, in registration order.
    pub fn next_fire_times(&self) -> Vec<(JobId, DateTime<Utc>)> {
        self.entries
            .iter()
            .filter_map(|e| e.next_fire.map(|t| (e.job.id.clone(), t)))
            .collect()
    }

    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.index.get(id).map(|&i| &self.entries[i].job)
    }

    /// Drive the loop until [`shutdown`](Self::shutdown) is requested.
    ///
    /// Handlers run one at a time; a shutdown request never interrupts one
    /// that is in flight.
    pub async fn run_forever(&mut self) {
        let mut shutdown = self.shutdown.tx.subscribe();
        info!(jobs = self.entries.len(), "scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.run_due().await;
            if *shutdown.borrow() {
                break;
            }

            let wait = self.sleep_duration();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("scheduler stopped");
    }

    /// Fire every job whose next fire time has arrived, earliest first (ties
    /// in registration order). Each job fires at most once per call.
    pub async fn run_due(&mut self) -> Vec<DispatchOutcome> {
        let now = self.clock.now();
        let mut outcomes = Vec::new();

        while let Some(&Reverse((due, idx))) = self.queue.peek() {
            if due > now {
                break;
            }
            self.queue.pop();

            let (handler, ctx) = self.fire_context(idx, due);
            let outcome = dispatch(handler, ctx, Arc::clone(&self.log)).await;
            let entry = &mut self.entries[idx];
            entry.job.last_fired = Some(outcome.fired_at);
            entry.run_count += 1;

            // Strictly after both the firing and the pass start: no re-fire
            // within this pass, and missed occurrences are skipped.
            let basis = outcome.fired_at.max(now);
            entry.next_fire = entry.job.trigger.next_after(basis);
            match entry.next_fire {
                Some(next) => self.queue.push(Reverse((next, idx))),
                None => warn!(job_id = %entry.job.id, "schedule exhausted, job retired"),
            }
            self.persist(idx);
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Run one job immediately, outside its cadence. The outcome is logged
    /// and becomes the job's `last_fired`; its next fire time is unchanged.
    pub async fn fire_now(&mut self, id: &JobId) -> Result<DispatchOutcome> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| SchedulerError::JobNotFound { id: id.to_string() })?;
        let (handler, ctx) = self.fire_context(idx, self.clock.now());
        let outcome = dispatch(handler, ctx, Arc::clone(&self.log)).await;
        self.entries[idx].job.last_fired = Some(outcome.fired_at);
        self.persist(idx);
        Ok(outcome)
    }

    fn sleep_duration(&self) -> Duration {
        let Some(&Reverse((next, _))) = self.queue.peek() else {
            return self.max_sleep;
        };
        (next - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(self.max_sleep)
    }

    fn fire_context(
        &self,
        idx: usize,
        scheduled_for: DateTime<Utc>,
    ) -> (Arc<dyn JobHandler>, FireContext) {
        let job = &self.entries[idx].job;
        let ctx = FireContext {
            job_id: job.id.clone(),
            scheduled_for,
            fired_at: self.clock.now(),
        };
        (Arc::clone(&job.handler), ctx)
    }

    fn persist(&self, idx: usize) {
        let Some(store) = &self.store else {
            return;
        };
        let entry = &self.entries[idx];
        let Some(next_fire) = entry.next_fire else {
            return;
        };
        let state = JobState {
            id: entry.job.id.clone(),
            schedule: entry.job.trigger.to_string(),
            last_fired: entry.job.last_fired,
            next_fire,
            run_count: entry.run_count,
        };
        if let Err(e) = store.save(&state) {
            error!(job_id = %state.id, "failed to persist job state: {e}");
        }
    }
}

/// Invoke the handler, catching errors and panics, and append the outcome.
async fn dispatch(
    handler: Arc<dyn JobHandler>,
    ctx: FireContext,
    log: Arc<dyn ActivityLog>,
) -> DispatchOutcome {
    let span = info_span!("dispatch", job_id = %ctx.job_id);
    let result = AssertUnwindSafe(handler.run(&ctx))
        .catch_unwind()
        .instrument(span.clone())
        .await;

    let error = match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => {
            span.in_scope(|| error!(code = e.code(), error = %e, "job failed"));
            Some(e.to_string())
        }
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            span.in_scope(|| error!(panic = %msg, "job handler panicked"));
            Some(format!("handler panicked: {msg}"))
        }
    };

    let outcome = DispatchOutcome {
        job_id: ctx.job_id,
        scheduled_for: ctx.scheduled_for,
        fired_at: ctx.fired_at,
        delivered: error.is_none(),
        error,
    };
    if outcome.delivered {
        span.in_scope(|| info!(scheduled_for = %outcome.scheduled_for, "job delivered"));
    }
    if let Err(e) = log.append(&outcome) {
        error!(job_id = %outcome.job_id, "activity log append failed: {e}");
    }
    outcome
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
