pub mod config;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod task;
pub mod timer;

pub use config::{SchedulerBuilder, SchedulerConfig};
pub use error::{SchedulerError, TaskError, TaskKind};
pub use scheduler::{LocalScheduler, RunReport};
pub use task::Task;
pub use timer::TimerId;

/// The core Scheduler trait that hosts and promise machinery build on.
/// Object safe, so consumers can hold an `Rc<dyn Scheduler>` without caring
/// which event loop drives the queues.
pub trait Scheduler {
    /// Schedule a microtask (runs before the next timer fires).
    /// Used for promise continuations.
    fn schedule_microtask(&self, task: Task);

    /// Schedule a timer that fires `delay_ms` logical milliseconds from now.
    ///
    /// A delay of zero still defers the task past the current turn.
    /// Negative delays are rejected with [`SchedulerError::InvalidDelay`].
    fn schedule_timer(&self, delay_ms: i64, task: Task) -> Result<TimerId, SchedulerError>;

    /// Cancel a pending timer. Unknown or already fired ids are ignored.
    /// Returns `true` only if a pending timer was cancelled by this call.
    fn cancel_timer(&self, id: TimerId) -> bool;

    /// Current logical time in milliseconds.
    fn now(&self) -> u64;
}
