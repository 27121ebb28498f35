//! Structured JSON log lines
//!
//! One event per line, keys in deterministic order, written synchronously
//! with no buffering. The embedding service aggregates these lines;
//! nothing in this crate reads them back.

use std::fmt::{self, Write as FmtWrite};
use std::io::{self, Write};

/// Line severity. Error-class lines go to stderr so they survive stdout
/// redirection in host services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Normal operations
    Info = 0,
    /// Recoverable issues
    Warn = 1,
    /// Operation failures
    Error = 2,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Writes adapter events as single JSON lines.
///
/// The line starts with the event name and severity; caller fields follow
/// sorted by key, so identical events produce identical lines across runs.
pub struct Logger;

impl Logger {
    /// Log an event to stdout
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        Self::write_line(severity, event, fields, &mut io::stdout());
    }

    /// Log an event to stderr (for error events)
    pub fn log_stderr(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        Self::write_line(severity, event, fields, &mut io::stderr());
    }

    fn write_line<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let mut line = String::with_capacity(128);
        line.push_str("{\"event\":\"");
        push_escaped(&mut line, event);
        line.push_str("\",\"severity\":\"");
        line.push_str(severity.as_str());
        line.push('"');

        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(key, _)| *key);
        for (key, value) in sorted {
            line.push_str(",\"");
            push_escaped(&mut line, key);
            line.push_str("\":\"");
            push_escaped(&mut line, value);
            line.push('"');
        }
        line.push_str("}\n");

        // A single write keeps concurrent callers' lines whole.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// Appends `raw` with JSON string escaping applied
fn push_escaped(line: &mut String, raw: &str) {
    for ch in raw.chars() {
        match ch {
            '"' => line.push_str("\\\""),
            '\\' => line.push_str("\\\\"),
            '\n' => line.push_str("\\n"),
            '\r' => line.push_str("\\r"),
            '\t' => line.push_str("\\t"),
            control if control.is_control() => {
                let _ = write!(line, "\\u{:04x}", control as u32);
            }
            printable => line.push(printable),
        }
    }
}
