//! Observability for the validation engine
//!
//! - Structured logging (JSON lines)
//! - Per-schema counters
//! - Begin/complete scopes around validation runs
//!
//! Observability is read-only: it never changes a validation outcome.
//!
//! # Usage
//!
//! ```ignore
//! use shapeguard::observability::{log_event, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Info);
//! log_event(Event::SchemaCompiled, &[("leaves", "4")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log a typed event at its own severity.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
