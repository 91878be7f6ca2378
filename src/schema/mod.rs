//! Trigger descriptors
//!
//! The catalog owns trigger definitions; the execution context only reads
//! the classification of the trigger currently firing.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

// ============================================================================
// Trigger Classification
// ============================================================================

/// Trigger timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
}

/// Row-modifying statement kind that fires triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        })
    }
}

/// Trigger granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerLevel {
    /// FOR EACH ROW
    Row,
    /// FOR EACH STATEMENT
    Statement,
}

// ============================================================================
// Trigger Descriptor
// ============================================================================

/// Immutable description of one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDescriptor {
    /// Trigger name
    pub name: String,
    /// Table this trigger is on
    pub table: String,
    /// BEFORE or AFTER
    pub timing: TriggerTiming,
    /// INSERT, UPDATE or DELETE
    pub event: TriggerEvent,
    /// FOR EACH ROW or FOR EACH STATEMENT
    pub level: TriggerLevel,
}

impl TriggerDescriptor {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        timing: TriggerTiming,
        event: TriggerEvent,
        level: TriggerLevel,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            timing,
            event,
            level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_row_trigger(&self) -> bool {
        self.level == TriggerLevel::Row
    }

    pub fn is_before_trigger(&self) -> bool {
        self.timing == TriggerTiming::Before
    }

    /// Shared handle, the form the catalog hands out.
    pub fn into_shared(self) -> Arc<TriggerDescriptor> {
        Arc::new(self)
    }
}

// ============================================================================
// Trigger Mask
// ============================================================================

bitflags! {
    /// Timing, granularity and event bits for one trigger firing
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TriggerMask: u8 {
        const BEFORE    = 0x01;
        const AFTER     = 0x02;
        const ROW       = 0x04;
        const STATEMENT = 0x08;
        const INSERT    = 0x10;
        const UPDATE    = 0x20;
        const DELETE    = 0x40;
    }
}

impl TriggerMask {
    pub fn new(timing: TriggerTiming, level: TriggerLevel, event: TriggerEvent) -> Self {
        let mut mask = match timing {
            TriggerTiming::Before => Self::BEFORE,
            TriggerTiming::After => Self::AFTER,
        };

        mask |= match level {
            TriggerLevel::Row => Self::ROW,
            TriggerLevel::Statement => Self::STATEMENT,
        };

        mask |= match event {
            TriggerEvent::Insert => Self::INSERT,
            TriggerEvent::Update => Self::UPDATE,
            TriggerEvent::Delete => Self::DELETE,
        };

        mask
    }

    /// Mask describing a firing of `trigger`
    pub fn for_trigger(trigger: &TriggerDescriptor) -> Self {
        Self::new(trigger.timing, trigger.level, trigger.event)
    }
}
