//! ObservationScope for begin/complete logging around a validation run.
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when closed
//! - Logs `{name}_INCOMPLETE` if dropped open
//!
//! The scope holds no interior mutability, so it can live across an
//! `.await` inside a `Send` future.

use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that logs begin and completion events with elapsed time.
pub struct ObservationScope {
    name: &'static str,
    completed: bool,
    timer: Timer,
    fields: Vec<(&'static str, String)>,
}

impl ObservationScope {
    /// Create a new observation scope, logging `{name}_BEGIN` at TRACE.
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, Vec::new())
    }

    /// Create a new observation scope carrying fields on every line.
    pub fn with_fields(name: &'static str, fields: Vec<(&'static str, String)>) -> Self {
        if Logger::enabled(Severity::Trace) {
            let refs = field_refs(&fields);
            Logger::trace(&format!("{}_BEGIN", name), &refs);
        }
        Self {
            name,
            completed: false,
            timer: Timer::new(),
            fields,
        }
    }

    /// Close the scope successfully.
    pub fn complete(mut self) {
        self.close(Severity::Trace, "COMPLETE", &[]);
    }

    /// Close the scope as failed at `severity`.
    pub fn fail(mut self, severity: Severity, reason: &str) {
        self.close(severity, "FAILED", &[("reason", reason)]);
    }

    fn close(&mut self, severity: Severity, suffix: &str, extra: &[(&str, &str)]) {
        self.completed = true;
        if !Logger::enabled(severity) {
            return;
        }
        let elapsed = self.timer.elapsed_us();
        let mut refs = field_refs(&self.fields);
        refs.push(("elapsed_us", elapsed.as_str()));
        refs.extend(extra.iter().copied());
        Logger::log(severity, &format!("{}_{}", self.name, suffix), &refs);
    }

    /// Check if the scope has been closed
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

fn field_refs<'a>(fields: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed microseconds as a string
    pub fn elapsed_us(&self) -> String {
        self.start.elapsed().as_micros().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
