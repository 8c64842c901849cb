//! Logging collaborator.
//!
//! Both the host and the device produce log lines. They reach a [`Logger`]
//! tagged with their [`LogContext`]; [`LogHistory`] keeps them for display
//! and forwards each one to `tracing`.

use std::collections::VecDeque;

use ccdlink_frame::Severity;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::clock::{unix_now, Clock};

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogContext {
    App,
    Device,
}

impl LogContext {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Device => "device",
        }
    }
}

/// Source position of a log line. Device lines have no file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation<'a> {
    pub file: &'a str,
    pub function: &'a str,
    pub line: u32,
}

/// Sink for host and device log lines.
pub trait Logger {
    fn record(
        &mut self,
        context: LogContext,
        location: SourceLocation<'_>,
        severity: Severity,
        message: &str,
    );
}

/// One retained log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub context: LogContext,
    pub file: String,
    pub function: String,
    pub line: u32,
    #[serde(serialize_with = "serialize_severity")]
    pub severity: Severity,
    /// Unix seconds.
    pub timestamp: i64,
    pub message: String,
}

fn serialize_severity<S: serde::Serializer>(
    severity: &Severity,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(severity.as_str())
}

/// Entries retained by [`LogHistory::new`].
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// In-memory log history that also emits `tracing` events.
///
/// Holds at most `limit` entries; the oldest are evicted first.
#[derive(Debug)]
pub struct LogHistory {
    entries: VecDeque<LogEntry>,
    limit: usize,
    clock: Clock,
}

impl LogHistory {
    pub fn new() -> Self {
        Self::with_clock(unix_now)
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: DEFAULT_HISTORY_LIMIT,
            clock,
        }
    }

    /// Retain at most `limit` entries (at least one).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> &VecDeque<LogEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every retained entry.
    pub fn drain(&mut self) -> Vec<LogEntry> {
        self.entries.drain(..).collect()
    }
}

impl Default for LogHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for LogHistory {
    fn record(
        &mut self,
        context: LogContext,
        location: SourceLocation<'_>,
        severity: Severity,
        message: &str,
    ) {
        let origin = context.as_str();
        let SourceLocation {
            file,
            function,
            line,
        } = location;
        match severity {
            Severity::Debug => debug!(origin, file, function, line, "{message}"),
            Severity::Norm => info!(origin, file, function, line, "{message}"),
            Severity::Error => error!(origin, file, function, line, "{message}"),
        }

        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            context,
            file: file.to_string(),
            function: function.to_string(),
            line,
            severity,
            timestamp: (self.clock)(),
            message: message.to_string(),
        });
    }
}
