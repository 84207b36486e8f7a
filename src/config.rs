//! Engine configuration
//!
//! Process-wide knobs for the validation engine. Read once at startup,
//! either built in code or taken from the environment:
//!
//! - `SHAPEGUARD_LOG_LEVEL`: TRACE, INFO, WARN, ERROR or FATAL
//! - `SHAPEGUARD_MAX_DEPTH`: maximum nesting of a rule-definition tree

use std::env;

use crate::observability::{Logger, Severity};

/// Environment variable holding the minimum log severity.
pub const LOG_LEVEL_ENV: &str = "SHAPEGUARD_LOG_LEVEL";

/// Environment variable holding the maximum definition depth.
pub const MAX_DEPTH_ENV: &str = "SHAPEGUARD_MAX_DEPTH";

/// Default maximum nesting of object/array nodes in a rule definition.
pub const DEFAULT_MAX_DEFINITION_DEPTH: usize = 64;

/// Configuration for schema compilation and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Minimum severity written by the logger.
    pub log_level: Severity,
    /// Deepest object/array nesting accepted when compiling definitions.
    pub max_definition_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: Severity::Warn,
            max_definition_depth: DEFAULT_MAX_DEFINITION_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Config that logs every event, including per-validation traces.
    pub fn verbose() -> Self {
        Self {
            log_level: Severity::Trace,
            ..Self::default()
        }
    }

    /// Sets the maximum definition depth.
    pub fn with_max_definition_depth(mut self, depth: usize) -> Self {
        self.max_definition_depth = depth;
        self
    }

    /// Builds a config from the environment, falling back to defaults for
    /// unset or unparseable variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(level) = lookup(LOG_LEVEL_ENV).and_then(|v| v.parse().ok()) {
            config.log_level = level;
        }
        if let Some(depth) = lookup(MAX_DEPTH_ENV).and_then(|v| v.trim().parse().ok()) {
            config.max_definition_depth = depth;
        }
        config
    }

    /// Installs the log level process-wide.
    pub fn apply(&self) {
        Logger::set_min_severity(self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.log_level, Severity::Warn);
        assert_eq!(config.max_definition_depth, 64);
    }

    #[test]
    fn test_verbose() {
        assert_eq!(EngineConfig::verbose().log_level, Severity::Trace);
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = EngineConfig::from_lookup(|key| match key {
            LOG_LEVEL_ENV => Some("info".into()),
            MAX_DEPTH_ENV => Some(" 8 ".into()),
            _ => None,
        });
        assert_eq!(config.log_level, Severity::Info);
        assert_eq!(config.max_definition_depth, 8);
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = EngineConfig::from_lookup(|key| match key {
            LOG_LEVEL_ENV => Some("chatty".into()),
            MAX_DEPTH_ENV => Some("-1".into()),
            _ => None,
        });
        assert_eq!(config, EngineConfig::default());
    }
}
