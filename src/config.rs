//! Trigger execution configuration
//!
//! Per-session settings with a process-wide default. Sessions snapshot the
//! default when they are created, so changing it never affects a statement
//! that is already firing triggers.

use std::sync::RwLock;

use lazy_static::lazy_static;

/// Default limit on simultaneously bound trigger execution contexts.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 16;

/// Settings that govern trigger execution contexts on one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    /// Maximum number of contexts bound to one session at once. Each nested
    /// trigger firing binds another context, so this bounds trigger recursion.
    pub max_nesting_depth: usize,
    /// Reject INSERT/UPDATE/DELETE issued while a BEFORE trigger is active,
    /// in addition to the check done when the trigger is created.
    pub enforce_before_trigger_dml: bool,
    /// Keep handle close failures swallowed during cleanup so they can be
    /// inspected afterwards. They are logged either way.
    pub record_suppressed_failures: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            enforce_before_trigger_dml: true,
            record_suppressed_failures: true,
        }
    }
}

lazy_static! {
    static ref GLOBAL_TRIGGER_CONFIG: RwLock<TriggerConfig> = RwLock::new(TriggerConfig::default());
}

impl TriggerConfig {
    /// Snapshot of the process-wide default.
    pub fn global() -> TriggerConfig {
        GLOBAL_TRIGGER_CONFIG
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the process-wide default. Existing sessions keep their copy.
    pub fn set_global(config: TriggerConfig) {
        let mut guard = GLOBAL_TRIGGER_CONFIG
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = config;
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_before_trigger_dml_check(mut self, enforce: bool) -> Self {
        self.enforce_before_trigger_dml = enforce;
        self
    }

    pub fn with_recorded_failures(mut self, record: bool) -> Self {
        self.record_suppressed_failures = record;
        self
    }
}
