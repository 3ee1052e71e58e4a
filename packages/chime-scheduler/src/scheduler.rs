use crate::Scheduler;
use crate::config::SchedulerConfig;
use crate::error::{SchedulerError, TaskError, TaskKind};
use crate::queue::MicrotaskQueue;
use crate::task::{self, Task};
use crate::timer::{TimerId, TimerQueue};
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

type ErrorHook = Rc<dyn Fn(&TaskError)>;

/// Summary of one call to [`LocalScheduler::run`] or [`LocalScheduler::run_until`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub microtasks_run: usize,
    pub timers_fired: usize,
    /// Tasks that failed during this run, in execution order.
    pub errors: Vec<TaskError>,
    /// Logical time when the run returned.
    pub ended_at: u64,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A deterministic single-threaded event loop with a microtask queue and a
/// timer queue driven by a logical clock.
///
/// All methods take `&self`; tasks typically capture an `Rc<LocalScheduler>`
/// and schedule more work while the loop is running. No internal borrow is
/// held while a task executes.
pub struct LocalScheduler {
    config: SchedulerConfig,
    microtasks: MicrotaskQueue,
    timers: RefCell<TimerQueue>,
    clock: Cell<u64>,
    running: Cell<bool>,
    errors: RefCell<Vec<TaskError>>,
    error_hook: RefCell<Option<ErrorHook>>,
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            clock: Cell::new(config.start_time),
            config,
            microtasks: MicrotaskQueue::new(),
            timers: RefCell::new(TimerQueue::new()),
            running: Cell::new(false),
            errors: RefCell::new(Vec::new()),
            error_hook: RefCell::new(None),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn now(&self) -> u64 {
        self.clock.get()
    }

    /// Queue `task` to run `delay_ms` logical milliseconds from now.
    pub fn schedule_timer<F>(&self, delay_ms: i64, task: F) -> Result<TimerId, SchedulerError>
    where
        F: FnOnce() + 'static,
    {
        self.insert_timer(delay_ms, Box::new(task))
    }

    pub fn schedule_microtask<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.push_microtask(Box::new(task));
    }

    /// Cancel a timer that has not fired yet. Unknown, fired and already
    /// cancelled ids are ignored.
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        let cancelled = self.timers.borrow_mut().cancel(id);
        if cancelled {
            tracing::debug!(timer = id.as_u64(), "timer cancelled");
        }
        cancelled
    }

    /// Install a callback invoked for every failed task.
    pub fn on_error<F>(&self, hook: F)
    where
        F: Fn(&TaskError) + 'static,
    {
        *self.error_hook.borrow_mut() = Some(Rc::new(hook));
    }

    /// Errors collected outside of `run()`, e.g. from `tick()`.
    pub fn take_errors(&self) -> Vec<TaskError> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().pending()
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.len()
    }

    /// Deadline of the next timer that will fire, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.borrow_mut().next_deadline()
    }

    pub fn is_idle(&self) -> bool {
        self.microtasks.is_empty() && self.timers.borrow().is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Drain all pending work until both queues are empty.
    ///
    /// Microtasks drain fully before every timer, the clock jumps forward to
    /// each timer's deadline, and a failing task never stops the loop.
    pub fn run(&self) -> Result<RunReport, SchedulerError> {
        self.drive(None)
    }

    /// Like [`run`](Self::run), but only fires timers due at or before
    /// `deadline`, then moves the clock to `deadline`.
    pub fn run_until(&self, deadline: u64) -> Result<RunReport, SchedulerError> {
        self.drive(Some(deadline))
    }

    /// Drain the microtask queue only; timers stay queued and the clock
    /// does not move.
    pub fn run_microtasks(&self) -> Result<RunReport, SchedulerError> {
        let _turn = Turn::enter(&self.running).ok_or(SchedulerError::Reentrant)?;
        let first_error = self.errors.borrow().len();

        let microtasks_run = self.drain_microtasks();
        Ok(RunReport {
            microtasks_run,
            timers_fired: 0,
            errors: self.errors_since(first_error),
            ended_at: self.now(),
        })
    }

    /// Run a single turn: drain microtasks, fire at most one timer, drain
    /// the microtasks it produced. Returns `true` if work remains.
    pub fn tick(&self) -> bool {
        let Some(_turn) = Turn::enter(&self.running) else {
            tracing::warn!("tick() called while the scheduler is running; ignoring");
            return !self.is_idle();
        };

        self.drain_microtasks();
        if self.fire_next(None) {
            self.drain_microtasks();
        }
        !self.is_idle()
    }

    fn drive(&self, limit: Option<u64>) -> Result<RunReport, SchedulerError> {
        let _turn = Turn::enter(&self.running).ok_or(SchedulerError::Reentrant)?;
        let first_error = self.errors.borrow().len();
        let mut report = RunReport::default();

        tracing::debug!(
            now = self.now(),
            timers = self.pending_timers(),
            microtasks = self.pending_microtasks(),
            "run started"
        );

        loop {
            report.microtasks_run += self.drain_microtasks();
            if !self.fire_next(limit) {
                break;
            }
            report.timers_fired += 1;
        }

        if let Some(deadline) = limit {
            if deadline > self.clock.get() {
                self.clock.set(deadline);
            }
        }

        report.errors = self.errors_since(first_error);
        report.ended_at = self.now();

        tracing::debug!(
            now = report.ended_at,
            microtasks = report.microtasks_run,
            timers = report.timers_fired,
            failures = report.errors.len(),
            "run finished"
        );
        Ok(report)
    }

    /// Errors recorded after index `first`. A task may have called
    /// `take_errors` meanwhile, so the list can be shorter than `first`.
    fn errors_since(&self, first: usize) -> Vec<TaskError> {
        let mut errors = self.errors.borrow_mut();
        let first = first.min(errors.len());
        errors.split_off(first)
    }

    fn insert_timer(&self, delay_ms: i64, task: Task) -> Result<TimerId, SchedulerError> {
        let delay = u64::try_from(delay_ms)
            .map_err(|_| SchedulerError::InvalidDelay { delay: delay_ms })?;
        let fire_at = self.now().saturating_add(delay);
        let id = self.timers.borrow_mut().insert(fire_at, task);

        tracing::trace!(timer = id.as_u64(), delay, fire_at, "timer scheduled");
        Ok(id)
    }

    fn push_microtask(&self, task: Task) {
        self.microtasks.push(task);
        tracing::trace!(queued = self.microtasks.len(), "microtask scheduled");
    }

    fn drain_microtasks(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.microtasks.pop() {
            self.execute(task, TaskKind::Microtask);
            ran += 1;
        }
        ran
    }

    fn fire_next(&self, limit: Option<u64>) -> bool {
        let next = self.timers.borrow_mut().pop_due(limit);
        let Some((id, fire_at, task)) = next else {
            return false;
        };

        if fire_at > self.clock.get() {
            self.clock.set(fire_at);
        }
        tracing::debug!(timer = id.as_u64(), now = self.now(), "timer fired");
        self.execute(task, TaskKind::Timer(id));
        true
    }

    fn execute(&self, task: Task, kind: TaskKind) {
        let silence = self.config.silence_task_panics;
        if let Err(err) = task::run_guarded(task, kind, self.now(), silence) {
            self.report(err);
        }
    }

    fn report(&self, err: TaskError) {
        if self.config.log_task_errors {
            tracing::warn!(kind = %err.kind, at = err.at, "task failed: {}", err.message);
        }

        let hook = self.error_hook.borrow().clone();
        if let Some(hook) = hook {
            // A failing hook must not take the loop down with it.
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(&err))) {
                tracing::error!(
                    kind = %err.kind,
                    "error hook panicked: {}",
                    task::panic_message(payload.as_ref())
                );
            }
        }

        if self.config.collect_errors {
            self.errors.borrow_mut().push(err);
        }
    }
}

impl Scheduler for LocalScheduler {
    fn schedule_microtask(&self, task: Task) {
        self.push_microtask(task);
    }

    fn schedule_timer(&self, delay_ms: i64, task: Task) -> Result<TimerId, SchedulerError> {
        self.insert_timer(delay_ms, task)
    }

    fn cancel_timer(&self, id: TimerId) -> bool {
        LocalScheduler::cancel_timer(self, id)
    }

    fn now(&self) -> u64 {
        LocalScheduler::now(self)
    }
}

/// Marks the scheduler as running for the lifetime of the guard.
struct Turn<'a> {
    running: &'a Cell<bool>,
}

impl<'a> Turn<'a> {
    fn enter(running: &'a Cell<bool>) -> Option<Self> {
        if running.replace(true) {
            None
        } else {
            Some(Self { running })
        }
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        self.running.set(false);
    }
}
