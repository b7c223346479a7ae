//! Progress-line sinks.
//!
//! The orchestrator never prints. Every progress or result line goes to a
//! [`LogSink`] supplied by the caller, which decides whether and where it is
//! shown.

use std::sync::{Mutex, PoisonError};

/// Receiver of human-readable progress lines.
pub trait LogSink: Send + Sync {
    /// Delivers one line.
    fn emit(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn emit(&self, line: &str) {
        self(line);
    }
}

/// Discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn emit(&self, _line: &str) {}
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }

    /// Lines received so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
    }
}

/// Forwards each line to `tracing` at INFO level.
#[cfg(feature = "telemetry")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[cfg(feature = "telemetry")]
impl LogSink for TracingSink {
    fn emit(&self, line: &str) {
        tracing::info!(target: "escrow_gas::progress", "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_sink() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let sink = move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        };
        sink.emit("a");
        sink.emit("b");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.emit("first");
        sink.emit("second");
        NullSink.emit("dropped");
        assert_eq!(sink.lines(), vec!["first", "second"]);
    }
}
