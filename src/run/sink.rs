// src/run/sink.rs

use std::sync::Mutex;
use tracing::{info, warn};

/// Append-only line sink for user-facing progress and error output.
pub trait LogSink: Send + Sync {
    fn append(&self, line: &str);
}

/// Forwards lines to `tracing`; error sinks log at warn.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    errors: bool,
}

impl TracingSink {
    pub fn output() -> Self {
        Self { errors: false }
    }

    pub fn errors() -> Self {
        Self { errors: true }
    }
}

impl LogSink for TracingSink {
    fn append(&self, line: &str) {
        if self.errors {
            warn!(target: "psquery::sink", "{}", line);
        } else {
            info!(target: "psquery::sink", "{}", line);
        }
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|l| l.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }
}

impl LogSink for MemorySink {
    fn append(&self, line: &str) {
        let mut lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        lines.push(line.to_string());
    }
}

pub struct NullSink;

impl LogSink for NullSink {
    fn append(&self, _line: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_memory_sink_from_threads() {
        let sink = Arc::new(MemorySink::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..25 {
                        sink.append(&format!("{t}:{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let lines = sink.lines();
        assert_eq!(lines.len(), 100);
        // per-producer order is kept
        let mine: Vec<_> = lines.iter().filter(|l| l.starts_with("2:")).collect();
        assert_eq!(mine.first().map(|s| s.as_str()), Some("2:0"));
        assert_eq!(mine.last().map(|s| s.as_str()), Some("2:24"));
    }
}
