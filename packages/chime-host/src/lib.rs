pub mod console;
pub mod host;

pub use console::{Console, Level, LogSink, MemorySink, TracingSink};
pub use host::Host;

pub use chime_promise::{Promise, PromiseState, Reason, Resolver};
pub use chime_scheduler::{LocalScheduler, RunReport, SchedulerConfig, SchedulerError, TaskError};
