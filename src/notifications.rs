//! Operator-facing notification log.
//!
//! Every component reports state transitions and failures through a
//! [`NotificationSink`]. The sink is append-only: entries are never edited or
//! removed, and their order is the order in which they were pushed.
//!
//! Two sinks are provided:
//! - [`NotificationLog`]: a shared, cloneable buffer a UI can read back.
//! - [`ConsoleSink`]: prints each entry to stdout as it arrives, and keeps a
//!   copy so callers can inspect what was reported.

use chrono::{DateTime, Local};
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Normal progress
    Info,
    /// Something the operator should look at, session unaffected
    Warn,
    /// A failure that ended an operation
    Error,
}

impl NotificationLevel {
    /// Short label for display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// A single notification entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// When the entry was appended
    pub timestamp: DateTime<Local>,
    /// Severity
    pub level: NotificationLevel,
    /// Human-readable text
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current local time.
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }

    /// Returns true for error-level entries.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] > {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Destination for operator-facing notifications.
pub trait NotificationSink: Send + Sync {
    /// Append one entry.
    fn push(&self, entry: LogEntry);

    /// Append an info-level message.
    fn info(&self, message: &str) {
        self.push(LogEntry::new(NotificationLevel::Info, message));
    }

    /// Append a warning.
    fn warn(&self, message: &str) {
        self.push(LogEntry::new(NotificationLevel::Warn, message));
    }

    /// Append an error-level message.
    fn error(&self, message: &str) {
        self.push(LogEntry::new(NotificationLevel::Error, message));
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn push(&self, entry: LogEntry) {
        (**self).push(entry);
    }
}

/// A thread-safe, append-only notification buffer.
#[derive(Clone, Default)]
pub struct NotificationLog(Arc<Mutex<Vec<LogEntry>>>);

impl NotificationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        // Entries are only ever appended, so a poisoned guard still holds a valid log
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of every entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Entries appended after the first `start` entries.
    ///
    /// Lets a UI render incrementally by remembering how many it has shown.
    #[must_use]
    pub fn entries_since(&self, start: usize) -> Vec<LogEntry> {
        self.lock().iter().skip(start).cloned().collect()
    }

    /// Messages only, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.message.clone()).collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The most recent entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<LogEntry> {
        self.lock().last().cloned()
    }
}

impl NotificationSink for NotificationLog {
    fn push(&self, entry: LogEntry) {
        self.lock().push(entry);
    }
}

/// Prints entries to stdout as they are appended.
#[derive(Clone, Default)]
pub struct ConsoleSink {
    history: NotificationLog,
    timestamps: bool,
}

impl ConsoleSink {
    /// Create a console sink; `timestamps` prefixes each line with the time.
    pub fn new(timestamps: bool) -> Self {
        Self {
            history: NotificationLog::new(),
            timestamps,
        }
    }

    /// Everything printed so far.
    #[must_use]
    pub fn history(&self) -> &NotificationLog {
        &self.history
    }
}

impl NotificationSink for ConsoleSink {
    fn push(&self, entry: LogEntry) {
        let line = if self.timestamps {
            entry.to_string()
        } else {
            format!("> {}", entry.message)
        };
        let mut stdout = std::io::stdout().lock();
        // A closed stdout must not take the session down with it
        let _ = writeln!(stdout, "{line}");
        self.history.push(entry);
    }
}
