//! Validation counters
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for one schema's validation activity.
///
/// Uses Relaxed ordering; eventual consistency is fine for metrics.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// validate / validate_with / validate_async calls
    validations: AtomicU64,
    /// Calls that went through the async walker
    async_validations: AtomicU64,
    /// Records with no errors
    passed: AtomicU64,
    /// Records that produced an error tree
    failed: AtomicU64,
    /// Calls refused before walking (bad arguments, non-object record, faults)
    refused: AtomicU64,
    /// Leaf messages across all error trees
    leaf_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment validation calls
    pub fn increment_validations(&self) {
        self.validations.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment async validation calls
    pub fn increment_async_validations(&self) {
        self.async_validations.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment passed validations
    pub fn increment_passed(&self) {
        self.passed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed validation and how many leaves failed in it
    pub fn record_failure(&self, leaves: u64) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.leaf_failures.fetch_add(leaves, Ordering::Relaxed);
    }

    /// Increment refused calls
    pub fn increment_refused(&self) {
        self.refused.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            validations: self.validations.load(Ordering::Relaxed),
            async_validations: self.async_validations.load(Ordering::Relaxed),
            passed: self.passed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
            leaf_failures: self.leaf_failures.load(Ordering::Relaxed),
        }
    }

    /// Current snapshot as a JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub validations: u64,
    pub async_validations: u64,
    pub passed: u64,
    pub failed: u64,
    pub refused: u64,
    pub leaf_failures: u64,
}
