//! Observable events emitted by the validation engine.
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Registry
    /// A type descriptor was added to a registry
    TypeRegistered,

    // Compilation
    /// A rule-definition tree compiled into a schema
    SchemaCompiled,
    /// A rule-definition tree was rejected at compile time
    SchemaRejected,

    // Validation
    /// Validation of a record begins
    ValidationBegin,
    /// Record satisfied every rule
    ValidationPassed,
    /// Record produced an error tree
    ValidationFailed,
    /// The call itself was refused (bad arguments, async schema on sync path)
    ValidationRefused,
    /// A matcher could not evaluate a value
    MatcherFaulted,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::TypeRegistered => "TYPE_REGISTERED",
            Event::SchemaCompiled => "SCHEMA_COMPILED",
            Event::SchemaRejected => "SCHEMA_REJECTED",
            Event::ValidationBegin => "VALIDATION_BEGIN",
            Event::ValidationPassed => "VALIDATION_PASSED",
            Event::ValidationFailed => "VALIDATION_FAILED",
            Event::ValidationRefused => "VALIDATION_REFUSED",
            Event::MatcherFaulted => "MATCHER_FAULTED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ValidationBegin | Event::ValidationPassed => Severity::Trace,
            Event::ValidationFailed
            | Event::ValidationRefused
            | Event::TypeRegistered
            | Event::SchemaCompiled
            | Event::SchemaRejected => Severity::Info,
            Event::MatcherFaulted => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::TypeRegistered,
            Event::SchemaCompiled,
            Event::SchemaRejected,
            Event::ValidationBegin,
            Event::ValidationPassed,
            Event::ValidationFailed,
            Event::ValidationRefused,
            Event::MatcherFaulted,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_matcher_fault_is_error() {
        assert_eq!(Event::MatcherFaulted.severity(), Severity::Error);
        assert!(Event::ValidationPassed.severity() < Event::ValidationFailed.severity());
    }

    /// Outcomes the caller already receives as a `Result` stay below the
    /// default log level.
    #[test]
    fn test_result_outcomes_quiet_by_default() {
        let threshold = EngineConfig::default().log_level;
        for event in [
            Event::ValidationFailed,
            Event::ValidationRefused,
            Event::SchemaRejected,
            Event::SchemaCompiled,
            Event::TypeRegistered,
        ] {
            assert!(event.severity() < threshold, "{} is logged by default", event);
        }
        assert!(Event::MatcherFaulted.severity() >= threshold);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::ValidationFailed), "VALIDATION_FAILED");
    }
}
