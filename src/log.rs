//! Injected logging.
//!
//! Key-store and stream operations report to a [`Logger`] handle they are
//! given, never to a global. A logger fans each [`LogRecord`] out to its
//! sinks. Logging returns nothing and cannot fail the calling operation.
//!
//! Secrets never reach a record: only operation names, paths, digests and
//! sizes are logged.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a record should be treated by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Progress inside an operation.
    Debug,
    /// An operation is about to return an error.
    Error,
    /// Entry into an operation.
    Funct,
    /// A nested call made by an operation.
    Call,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Debug => "DEBUG",
            Self::Error => "ERROR",
            Self::Funct => "FUNCT",
            Self::Call => "CALL",
        };
        f.write_str(tag)
    }
}

/// One logging event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub severity: Severity,
    /// The operation that emitted the record, e.g. `store::generate`.
    pub origin: String,
    /// Optional free-form comment; empty when absent.
    pub comment: String,
    /// Rendered payload values.
    pub payload: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// A destination for log records. Implement this to forward records to a
/// console, file, collector, or test buffer.
pub trait LogSink: Send + Sync {
    /// Receive a record. Must not panic.
    fn record(&self, record: &LogRecord);
}

/// Cloneable handle over a set of sinks. The default handle has no sinks and
/// discards everything.
#[derive(Clone, Default)]
pub struct Logger {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Logger {
    /// A logger that discards everything.
    pub fn noop() -> Self {
        Self::default()
    }

    /// A logger with a single sink.
    pub fn with_sink(sink: impl LogSink + 'static) -> Self {
        Self {
            sinks: vec![Arc::new(sink)],
        }
    }

    /// Attach another sink.
    pub fn add_sink(&mut self, sink: Arc<dyn LogSink>) {
        self.sinks.push(sink);
    }

    /// Returns true if records would be discarded.
    pub fn is_noop(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Emit a record to every sink.
    pub fn log(
        &self,
        severity: Severity,
        origin: &str,
        comment: Option<&str>,
        payload: &[&dyn fmt::Display],
    ) {
        if self.sinks.is_empty() {
            return;
        }
        let record = LogRecord {
            severity,
            origin: origin.to_string(),
            comment: comment.unwrap_or_default().to_string(),
            payload: payload.iter().map(|v| v.to_string()).collect(),
            timestamp: Utc::now(),
        };
        for sink in &self.sinks {
            sink.record(&record);
        }
    }

    pub fn funct(&self, origin: &str) {
        self.log(Severity::Funct, origin, None, &[]);
    }

    pub fn debug(&self, origin: &str, comment: &str, payload: &[&dyn fmt::Display]) {
        self.log(Severity::Debug, origin, Some(comment), payload);
    }

    pub fn error(&self, origin: &str, err: &dyn fmt::Display) {
        self.log(Severity::Error, origin, None, &[err]);
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes records as JSON lines (one per record) to a file.
/// Creates the file if it doesn't exist; appends if it does.
pub struct FileLogSink {
    file: Mutex<File>,
}

impl FileLogSink {
    /// Open or create a file for append-only logging.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LogSink for FileLogSink {
    fn record(&self, record: &LogRecord) {
        let Ok(line) = serde_json::to_string(record) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: tracing
// ---------------------------------------------------------------------------

/// Forwards records to the `tracing` subscriber installed by the host process.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, record: &LogRecord) {
        let payload = record.payload.join(", ");
        match record.severity {
            Severity::Error => tracing::error!(
                origin = %record.origin,
                comment = %record.comment,
                payload = %payload,
                "{}",
                record.severity
            ),
            Severity::Debug | Severity::Funct | Severity::Call => tracing::debug!(
                origin = %record.origin,
                comment = %record.comment,
                payload = %payload,
                "{}",
                record.severity
            ),
        }
    }
}
