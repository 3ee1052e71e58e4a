use crate::scheduler::LocalScheduler;

/// Tunables for a [`LocalScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// Logical time the clock starts at, in milliseconds.
    pub start_time: u64,
    /// Emit a `tracing` warning for every task that fails.
    pub log_task_errors: bool,
    /// Keep failed tasks in the error list handed back by `run()`.
    pub collect_errors: bool,
    /// Keep the panic hook from printing task panics; the `TaskError`
    /// becomes the only report.
    pub silence_task_panics: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start_time: 0,
            log_task_errors: true,
            collect_errors: true,
            silence_task_panics: false,
        }
    }
}

/// Builder for configuring and creating a scheduler.
///
/// # Examples
///
/// ```rust
/// use chime_scheduler::SchedulerBuilder;
///
/// let scheduler = SchedulerBuilder::new()
///     .start_time(1_000)
///     .log_task_errors(false)
///     .build();
/// assert_eq!(scheduler.now(), 1_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn start_time(mut self, ms: u64) -> Self {
        self.config.start_time = ms;
        self
    }

    pub fn log_task_errors(mut self, enabled: bool) -> Self {
        self.config.log_task_errors = enabled;
        self
    }

    pub fn collect_errors(mut self, enabled: bool) -> Self {
        self.config.collect_errors = enabled;
        self
    }

    pub fn silence_task_panics(mut self, enabled: bool) -> Self {
        self.config.silence_task_panics = enabled;
        self
    }

    pub fn build(self) -> LocalScheduler {
        LocalScheduler::with_config(self.config)
    }
}
