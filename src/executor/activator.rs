//! Trigger firing
//!
//! The statement executor decides which triggers fire and when; the
//! activator runs a given list of them through the execution context. For
//! each trigger it attaches the before/after images, runs the trigger body
//! and then clears the firing again, including when the body fails.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, ErrorCode, Result};
use crate::executor::row_holder::{RowHolder, SingleRowCursor};
use crate::executor::trigger::TriggerExecutionContext;
use crate::schema::{TriggerDescriptor, TriggerMask};

/// Before and after images of the rows a statement changed.
///
/// INSERT has only after images, DELETE only before images. For UPDATE the
/// i-th before row and the i-th after row belong to the same changed row.
#[derive(Debug, Clone, Default)]
pub struct ChangedRows {
    pub before: Option<RowHolder>,
    pub after: Option<RowHolder>,
}

impl ChangedRows {
    pub fn inserted(after: RowHolder) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    pub fn deleted(before: RowHolder) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }

    pub fn updated(before: RowHolder, after: RowHolder) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    /// Number of changed rows
    pub fn len(&self) -> usize {
        let before = self.before.as_ref().map_or(0, RowHolder::len);
        let after = self.after.as_ref().map_or(0, RowHolder::len);
        before.max(after)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs a list of triggers through one execution context.
pub struct TriggerActivator {
    triggers: Vec<Arc<TriggerDescriptor>>,
}

impl TriggerActivator {
    pub fn new(triggers: Vec<Arc<TriggerDescriptor>>) -> Self {
        Self { triggers }
    }

    pub fn triggers(&self) -> &[Arc<TriggerDescriptor>] {
        &self.triggers
    }

    /// Fire every trigger, in order, against `rows`.
    ///
    /// Stops at the first failure. The failing trigger is still cleared; the
    /// context itself is left for the caller to clean up. Before and after
    /// images of different lengths are rejected before any trigger fires.
    pub fn fire<F>(
        &self,
        tec: &mut TriggerExecutionContext,
        rows: &ChangedRows,
        mut body: F,
    ) -> Result<()>
    where
        F: FnMut(&mut TriggerExecutionContext, &TriggerDescriptor) -> Result<()>,
    {
        if let (Some(before), Some(after)) = (&rows.before, &rows.after) {
            if before.len() != after.len() {
                return Err(Error::engine(
                    ErrorCode::Misuse,
                    format!(
                        "{} before images but {} after images",
                        before.len(),
                        after.len()
                    ),
                ));
            }
        }

        for trigger in &self.triggers {
            tec.reset_counters(true)?;
            tec.set_trigger(Arc::clone(trigger))?;

            let fired = Self::fire_one(tec, trigger, rows, &mut body);
            let cleared = tec.clear_trigger();
            fired?;
            cleared?;
        }
        Ok(())
    }

    fn fire_one<F>(
        tec: &mut TriggerExecutionContext,
        trigger: &TriggerDescriptor,
        rows: &ChangedRows,
        body: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&mut TriggerExecutionContext, &TriggerDescriptor) -> Result<()>,
    {
        tec.set_current_event(TriggerMask::for_trigger(trigger))?;

        if !trigger.is_row_trigger() {
            if let Some(before) = &rows.before {
                tec.set_before_result_set(Box::new(before.cursor()))?;
            }
            if let Some(after) = &rows.after {
                tec.set_after_result_set(Box::new(after.cursor()))?;
            }
            debug!(target: "trigctx", trigger = trigger.name(), rows = rows.len(), "statement trigger");
            return body(tec, trigger);
        }

        for index in 0..rows.len() {
            if let Some(row) = rows.before.as_ref().and_then(|h| h.row(index)) {
                tec.set_before_result_set(Box::new(SingleRowCursor::new(row)))?;
            }
            if let Some(row) = rows.after.as_ref().and_then(|h| h.row(index)) {
                tec.set_after_result_set(Box::new(SingleRowCursor::new(row)))?;
                if !trigger.is_before_trigger() {
                    tec.apply_row_update()?;
                }
            }
            debug!(target: "trigctx", trigger = trigger.name(), row = index, "row trigger");
            body(tec, trigger)?;
        }
        Ok(())
    }
}
