//! Observability subsystem
//!
//! Structured JSON logging, typed events, and deterministic counters for
//! the adapter. Observability is read-only: it never changes what a
//! request does, and a logging failure never fails the operation that
//! produced it.
//!
//! # Usage
//!
//! ```ignore
//! use keyplan::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::PlanSelected, &[("table", "person"), ("index", "primary")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_plans_selected();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an adapter event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log an adapter event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    if event.is_error() {
        Logger::log_stderr(Severity::Error, event.as_str(), fields);
    } else {
        Logger::log(Severity::Info, event.as_str(), fields);
    }
}
