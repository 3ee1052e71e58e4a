use std::cell::RefCell;
use std::fmt::{self, Display};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Log,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Log => f.write_str("log"),
            Level::Error => f.write_str("error"),
        }
    }
}

/// Where console output ends up. Implement this to route script output into
/// an embedder's own logging.
pub trait LogSink {
    fn write(&self, level: Level, line: &str);
}

/// Forwards console lines to `tracing` under the `chime::console` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: Level, line: &str) {
        match level {
            Level::Log => tracing::info!(target: "chime::console", "{line}"),
            Level::Error => tracing::error!(target: "chime::console", "{line}"),
        }
    }
}

/// Keeps every line in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Rc<RefCell<Vec<(Level, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines written so far, regardless of level.
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.borrow().clone()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: Level, line: &str) {
        self.entries.borrow_mut().push((level, line.to_string()));
    }
}

/// `console.log` / `console.error`. Multiple arguments are joined with a
/// single space, one line per call.
#[derive(Clone)]
pub struct Console {
    sink: Rc<dyn LogSink>,
}

impl Console {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Rc::new(sink),
        }
    }

    pub fn log(&self, message: impl Display) {
        self.sink.write(Level::Log, &message.to_string());
    }

    pub fn error(&self, message: impl Display) {
        self.sink.write(Level::Error, &message.to_string());
    }

    pub fn log_args(&self, args: &[&dyn Display]) {
        self.sink.write(Level::Log, &join(args));
    }

    pub fn error_args(&self, args: &[&dyn Display]) {
        self.sink.write(Level::Error, &join(args));
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

fn join(args: &[&dyn Display]) -> String {
    args.iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
