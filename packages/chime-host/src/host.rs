use crate::console::{Console, LogSink, TracingSink};
use chime_promise::{Promise, Resolver};
use chime_scheduler::{LocalScheduler, RunReport, SchedulerConfig, SchedulerError, TimerId};
use std::rc::Rc;

/// The globals a script host exposes: `setTimeout`, `clearTimeout`,
/// `queueMicrotask`, `console` and promise construction, all driven by one
/// [`LocalScheduler`].
///
/// Timer handles are plain integers here, as a script would see them.
pub struct Host {
    scheduler: Rc<LocalScheduler>,
    console: Console,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// Host with default scheduler settings, console output going to `tracing`.
    pub fn new() -> Self {
        Self::with_sink(TracingSink)
    }

    /// Failed callbacks are reported on the console only; the panic hook
    /// stays quiet for them.
    pub fn with_sink(sink: impl LogSink + 'static) -> Self {
        let config = SchedulerConfig {
            silence_task_panics: true,
            ..SchedulerConfig::default()
        };
        Self::with_config(config, sink)
    }

    pub fn with_config(config: SchedulerConfig, sink: impl LogSink + 'static) -> Self {
        let scheduler = Rc::new(LocalScheduler::with_config(config));
        let console = Console::new(sink);

        // Failed callbacks surface on the console as they happen.
        let errors = console.clone();
        scheduler.on_error(move |err| {
            errors.error(format_args!("Task execution failed: {}", err.message));
        });

        Self { scheduler, console }
    }

    pub fn scheduler(&self) -> &Rc<LocalScheduler> {
        &self.scheduler
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Schedule `callback` after `delay_ms`; returns the numeric timer id.
    pub fn set_timeout<F>(&self, callback: F, delay_ms: i64) -> Result<u64, SchedulerError>
    where
        F: FnOnce() + 'static,
    {
        self.scheduler
            .schedule_timer(delay_ms, callback)
            .map(TimerId::as_u64)
    }

    /// Cancel a timer by numeric id. Unknown ids are ignored.
    pub fn clear_timeout(&self, id: u64) {
        self.scheduler.cancel_timer(TimerId::from_u64(id));
    }

    pub fn queue_microtask<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        self.scheduler.schedule_microtask(callback);
    }

    /// `new Promise(executor)`: the executor runs immediately.
    pub fn promise<T, F>(&self, executor: F) -> Promise<T>
    where
        T: Clone + 'static,
        F: FnOnce(Resolver<T>),
    {
        Promise::new(self.scheduler.clone(), executor)
    }

    /// Run the promise jobs queued by the synchronous part of a script,
    /// without firing any timers.
    pub fn flush_microtasks(&self) -> Result<RunReport, SchedulerError> {
        self.scheduler.run_microtasks()
    }

    /// Flush pending jobs, then drive timers and microtasks until nothing is
    /// left. Failed callbacks have already been written to the console.
    pub fn run_event_loop(&self) -> Result<RunReport, SchedulerError> {
        let flushed = self.flush_microtasks()?;
        self.console.log("Starting event loop...");
        tracing::info!(
            timers = self.scheduler.pending_timers(),
            "starting event loop"
        );

        let mut report = self.scheduler.run()?;
        report.microtasks_run += flushed.microtasks_run;
        let mut errors = flushed.errors;
        errors.append(&mut report.errors);
        report.errors = errors;

        tracing::info!(
            now = report.ended_at,
            timers = report.timers_fired,
            failures = report.errors.len(),
            "event loop finished"
        );
        Ok(report)
    }
}
