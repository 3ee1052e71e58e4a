use crate::timer::TimerId;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("invalid timer delay {delay}ms: delay must be non-negative")]
    InvalidDelay { delay: i64 },

    #[error("scheduler is already running; run() cannot be nested inside a task")]
    Reentrant,
}

/// Which queue a failed task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Microtask,
    Timer(TimerId),
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Microtask => f.write_str("microtask"),
            TaskKind::Timer(id) => write!(f, "timer #{}", id.as_u64()),
        }
    }
}

/// A task panicked while running. Non-fatal: the loop keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failed at {at}ms: {message}")]
pub struct TaskError {
    pub kind: TaskKind,
    /// Logical time at which the task ran.
    pub at: u64,
    pub message: String,
}
