// Logging boundary handed to the rover at construction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// One event recorded by a rover component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    /// Component that raised the event, e.g. "Photographing State".
    pub source: String,
    pub severity: Severity,
    pub message: String,
    pub cause: Option<String>,
}

/// Destination for journal entries. Recording is fire-and-forget.
pub trait LogSink: Send + Sync {
    fn record(&self, entry: &LogEntry);
}

/// Forwards entries to `tracing`.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, entry: &LogEntry) {
        match entry.severity {
            Severity::Info => info!(source = %entry.source, "{}", entry.message),
            Severity::Error => error!(
                source = %entry.source,
                cause = entry.cause.as_deref().unwrap_or("-"),
                "{}",
                entry.message
            ),
        }
    }
}

/// Collects entries in memory. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.severity == Severity::Error)
            .collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn record(&self, entry: &LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
    }
}

/// The rover's system log.
///
/// Every entry goes to the sink; the newest `capacity` entries are also kept
/// so they can be downlinked on request.
pub struct Journal {
    sink: Arc<dyn LogSink>,
    recent: VecDeque<LogEntry>,
    capacity: usize,
}

impl Journal {
    pub fn new(sink: Arc<dyn LogSink>, capacity: usize) -> Self {
        Self {
            sink,
            recent: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn info(&mut self, source: &str, message: impl Into<String>) {
        self.write(source, Severity::Info, message.into(), None);
    }

    pub fn error(&mut self, source: &str, message: impl Into<String>, cause: Option<String>) {
        self.write(source, Severity::Error, message.into(), cause);
    }

    fn write(&mut self, source: &str, severity: Severity, message: String, cause: Option<String>) {
        let entry = LogEntry {
            at: Utc::now(),
            source: source.to_string(),
            severity,
            message,
            cause,
        };

        self.sink.record(&entry);

        if self.capacity == 0 {
            return;
        }
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(entry);
    }

    /// Retained entries at or above `min_severity`, oldest first, keeping
    /// only the newest `limit`.
    pub fn query(&self, min_severity: Option<Severity>, limit: usize) -> Vec<LogEntry> {
        let matching: Vec<&LogEntry> = self
            .recent
            .iter()
            .filter(|e| min_severity.map_or(true, |min| e.severity >= min))
            .collect();

        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}
