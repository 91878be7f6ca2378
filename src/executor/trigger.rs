//! Trigger Execution Context
//!
//! One [`TriggerExecutionContext`] exists per INSERT/UPDATE/DELETE statement
//! that fires triggers. It:
//! - exposes the before/after row images to trigger bodies as independently
//!   positioned [`RowSet`] handles
//! - tracks every handle it gives out and closes all of them at cleanup
//! - validates statements a trigger body issues
//! - keeps the autoincrement values a trigger body may read during an INSERT
//!
//! `cleanup()` must run once the statement's trigger phase is over. After it
//! runs, every accessor fails with [`Error::ContextClosed`] so a trigger body
//! holding on to the context cannot read stale cursor state. Dropping a
//! context that was never cleaned up cleans it up.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{ContextId, RowSet, RowSetRegistry, SessionContext};
use crate::config::TriggerConfig;
use crate::error::{EngineError, Error, ErrorCode, Result};
use crate::executor::autoincrement::AutoincrementCounter;
use crate::executor::cursor::RowCursor;
use crate::executor::validator::{StatementValidator, StmtType};
use crate::schema::{TriggerDescriptor, TriggerEvent, TriggerMask};
use crate::types::{Row, TableId};

const NO_TRIGGER: &str = "<no trigger>";

// ============================================================================
// Trigger Body Interface
// ============================================================================

/// The view of the execution context given to trigger-body code.
pub trait TriggerBodyContext {
    /// Name of the table the trigger is declared on
    fn target_table_name(&self) -> Result<&str>;

    /// Id of the table the trigger is declared on
    fn target_table_id(&self) -> Result<TableId>;

    /// Kind of statement that fired the trigger
    fn event_type(&self) -> Result<TriggerEvent>;

    /// Text of the statement that fired the trigger, if known
    fn event_statement_text(&self) -> Result<Option<&str>>;

    /// Before images of the changed rows.
    ///
    /// A row trigger sees exactly one row, a statement trigger every changed
    /// row. `None` when the statement has no before images (INSERT).
    fn old_row_set(&mut self) -> Result<Option<RowSet>>;

    /// After images of the changed rows. `None` for DELETE.
    fn new_row_set(&mut self) -> Result<Option<RowSet>>;

    /// Like [`old_row_set`](Self::old_row_set), positioned on the first row.
    fn old_row(&mut self) -> Result<Option<RowSet>> {
        let row_set = self.old_row_set()?;
        if let Some(rs) = &row_set {
            rs.next()?;
        }
        Ok(row_set)
    }

    /// Like [`new_row_set`](Self::new_row_set), positioned on the first row.
    fn new_row(&mut self) -> Result<Option<RowSet>> {
        let row_set = self.new_row_set()?;
        if let Some(rs) = &row_set {
            rs.next()?;
        }
        Ok(row_set)
    }

    /// Autoincrement value for `identity` (`schema.table.column`), if known
    fn autoincrement_value(&self, identity: &str) -> Result<Option<i64>>;
}

#[derive(Debug, Clone, Copy)]
enum Image {
    Before,
    After,
}

// ============================================================================
// TriggerExecutionContext
// ============================================================================

/// Per-statement state shared by every trigger the statement fires.
pub struct TriggerExecutionContext {
    id: ContextId,
    event_type: TriggerEvent,
    statement_text: Option<String>,
    target_table_id: TableId,
    target_table_name: String,
    config: TriggerConfig,
    /// Released by cleanup
    session: Option<Rc<dyn SessionContext>>,

    trigger: Option<Arc<TriggerDescriptor>>,
    current_event: Option<TriggerMask>,
    before_cursor: Option<Box<dyn RowCursor>>,
    after_cursor: Option<Box<dyn RowCursor>>,
    /// First after image, captured for autoincrement row triggers
    after_row: Option<Row>,
    issued: RowSetRegistry,

    /// Values inherited from the triggering INSERT
    counters: Vec<AutoincrementCounter>,
    /// Values generated by statements the trigger bodies ran
    overrides: Option<HashMap<String, i64>>,

    suppressed: Vec<EngineError>,
    closed: bool,
}

impl TriggerExecutionContext {
    /// Build a context and bind it to `session`.
    ///
    /// `counters` is empty unless `event_type` is INSERT into a table with
    /// generated key columns. Fails if the session refuses the binding, in
    /// which case no context exists.
    pub fn new(
        session: Rc<dyn SessionContext>,
        statement_text: Option<&str>,
        event_type: TriggerEvent,
        target_table_id: TableId,
        target_table_name: &str,
        counters: Vec<AutoincrementCounter>,
    ) -> Result<Self> {
        let id = ContextId::next();
        session.bind(id)?;
        let config = session.config().clone();

        debug!(
            target: "trigctx",
            context = %id,
            table = target_table_name,
            event = %event_type,
            counters = counters.len(),
            "created trigger execution context"
        );

        Ok(Self {
            id,
            event_type,
            statement_text: statement_text.map(str::to_string),
            target_table_id,
            target_table_name: target_table_name.to_string(),
            config,
            session: Some(session),
            trigger: None,
            current_event: None,
            before_cursor: None,
            after_cursor: None,
            after_row: None,
            issued: RowSetRegistry::new(),
            counters,
            overrides: None,
            suppressed: Vec::new(),
            closed: false,
        })
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The trigger currently firing
    pub fn trigger(&self) -> Option<&TriggerDescriptor> {
        self.trigger.as_deref()
    }

    pub fn current_event(&self) -> Option<TriggerMask> {
        self.current_event
    }

    /// Handles issued and not yet drained by cleanup
    pub fn outstanding_row_sets(&self) -> usize {
        self.issued.len()
    }

    /// Close failures swallowed by cleanup, when recording is enabled
    pub fn suppressed_failures(&self) -> &[EngineError] {
        &self.suppressed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::ContextClosed);
        }
        Ok(())
    }

    fn trigger_name(&self) -> &str {
        self.trigger.as_ref().map_or(NO_TRIGGER, |t| t.name())
    }

    // ========================================================================
    // Trigger binding
    // ========================================================================

    /// Start firing `trigger`
    pub fn set_trigger(&mut self, trigger: Arc<TriggerDescriptor>) -> Result<()> {
        self.ensure_open()?;
        debug!(target: "trigctx", context = %self.id, trigger = trigger.name(), "firing trigger");
        self.trigger = Some(trigger);
        Ok(())
    }

    /// Finish the current firing: forget the trigger and its event, and close
    /// both cursors, which belong to one firing only.
    pub fn clear_trigger(&mut self) -> Result<()> {
        self.ensure_open()?;
        debug!(target: "trigctx", context = %self.id, trigger = self.trigger_name(), "cleared trigger");
        self.current_event = None;
        self.trigger = None;
        self.close_cursors()
    }

    pub fn set_current_event(&mut self, event: TriggerMask) -> Result<()> {
        self.ensure_open()?;
        self.current_event = Some(event);
        Ok(())
    }

    pub fn clear_current_event(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.current_event = None;
        Ok(())
    }

    /// Attach the before images for the current firing. A cursor attached
    /// earlier in the same firing is closed.
    pub fn set_before_result_set(&mut self, cursor: Box<dyn RowCursor>) -> Result<()> {
        self.ensure_open()?;
        if let Some(mut previous) = self.before_cursor.replace(cursor) {
            previous.close()?;
        }
        Ok(())
    }

    /// Attach the after images for the current firing.
    ///
    /// With autoincrement counters present, a row trigger captures its single
    /// after row now so generated values can be read from it later, and an
    /// AFTER statement trigger moves the counters to their end state.
    pub fn set_after_result_set(&mut self, cursor: Box<dyn RowCursor>) -> Result<()> {
        self.ensure_open()?;
        if let Some(mut previous) = self.after_cursor.replace(cursor) {
            previous.close()?;
        }

        if self.counters.is_empty() {
            return Ok(());
        }

        let trigger = self.trigger.clone().ok_or_else(|| {
            Error::engine(
                ErrorCode::Misuse,
                "after rows attached with no trigger firing",
            )
        })?;

        if trigger.is_row_trigger() {
            if let Some(cursor) = self.after_cursor.as_mut() {
                cursor.open()?;
                let first = cursor.next_row();
                let closed = cursor.close();
                self.after_row = first?;
                closed?;
            }
        } else if !trigger.is_before_trigger() {
            self.reset_counters(false)?;
        }
        Ok(())
    }

    /// Close the before/after cursors if attached, attempting both. Returns
    /// the first failure.
    fn close_cursors(&mut self) -> Result<()> {
        let after = self.after_cursor.take().map(|mut c| c.close()).unwrap_or(Ok(()));
        let before = self.before_cursor.take().map(|mut c| c.close()).unwrap_or(Ok(()));
        after?;
        before?;
        Ok(())
    }

    // ========================================================================
    // Row sets
    // ========================================================================

    fn issue_row_set(&mut self, image: Image) -> Result<Option<RowSet>> {
        self.ensure_open()?;
        let session = self.session.as_ref().ok_or(Error::ContextClosed)?;

        let source = match image {
            Image::Before => self.before_cursor.as_ref(),
            Image::After => self.after_cursor.as_ref(),
        };
        let Some(source) = source else {
            return Ok(None);
        };

        let mut cursor = source.duplicate()?;
        if let Err(e) = cursor.open() {
            let _ = cursor.close();
            return Err(e.into());
        }

        let row_set = match session.wrap_cursor(cursor) {
            Ok(row_set) => row_set,
            Err(failure) => {
                let (error, mut cursor) = failure.into_parts();
                if let Err(e) = cursor.close() {
                    warn!(target: "trigctx", context = %self.id, error = %e, "closing unwrapped cursor failed");
                }
                return Err(error.into());
            }
        };
        self.issued.register(row_set.clone());

        debug!(
            target: "trigctx",
            context = %self.id,
            row_set = row_set.id(),
            image = ?image,
            "issued row set"
        );
        Ok(Some(row_set))
    }

    // ========================================================================
    // Autoincrement
    // ========================================================================

    /// Value for `identity`: generated by a trigger body first, then
    /// inherited from the triggering INSERT. `None` if neither has it.
    pub fn resolve_value(&self, identity: &str) -> Result<Option<i64>> {
        self.ensure_open()?;

        if let Some(value) = self.overrides.as_ref().and_then(|o| o.get(identity)) {
            return Ok(Some(*value));
        }

        Ok(self
            .counters
            .iter()
            .find(|c| c.identity() == identity)
            .and_then(|c| c.current_value()))
    }

    /// Copy values generated by a trigger body into the override table.
    /// Later entries win.
    pub fn merge_overrides<I, K>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        self.ensure_open()?;
        let table = self.overrides.get_or_insert_with(HashMap::new);
        for (identity, value) in values {
            table.insert(identity.into(), value);
        }
        Ok(())
    }

    /// Rewind every counter to the beginning or move it to the end. The
    /// captured after row is stale afterwards and is dropped.
    pub fn reset_counters(&mut self, to_beginning: bool) -> Result<()> {
        self.ensure_open()?;
        if self.counters.is_empty() {
            return Ok(());
        }
        self.after_row = None;
        for counter in &mut self.counters {
            counter.reset(to_beginning);
        }
        Ok(())
    }

    /// Feed each counter the value its column has in the captured after row.
    ///
    /// Only valid after a row trigger's after images were attached.
    pub fn apply_row_update(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.counters.is_empty() {
            return Ok(());
        }
        let row = self.after_row.as_ref().ok_or_else(|| {
            Error::engine(
                ErrorCode::Internal,
                "no inserted row captured for autoincrement update",
            )
        })?;
        for counter in &mut self.counters {
            let value = row.column(counter.column_position())?.as_i64()?;
            counter.update(value);
        }
        Ok(())
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Release everything this context holds. Must be called once the
    /// statement's trigger phase ends, whether it succeeded or not.
    ///
    /// Every issued row set is closed; failures closing them are logged and
    /// otherwise ignored. The context is closed even if closing the attached
    /// cursors fails, in which case the first such failure is returned.
    /// Calling this again does nothing.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        if let Some(session) = self.session.as_ref() {
            session.unbind(self.id);
        }

        let issued = self.issued.len();
        let failures = self.issued.drain();
        let failed = failures.len();
        if self.config.record_suppressed_failures {
            self.suppressed.extend(failures);
        }

        let cursors = self.close_cursors();

        self.trigger = None;
        self.current_event = None;
        self.after_row = None;
        self.session = None;
        self.closed = true;

        debug!(
            target: "trigctx",
            context = %self.id,
            row_sets = issued,
            close_failures = failed,
            "cleaned up trigger execution context"
        );
        cursors
    }
}

// ============================================================================
// Trait impls
// ============================================================================

impl TriggerBodyContext for TriggerExecutionContext {
    fn target_table_name(&self) -> Result<&str> {
        self.ensure_open()?;
        Ok(&self.target_table_name)
    }

    fn target_table_id(&self) -> Result<TableId> {
        self.ensure_open()?;
        Ok(self.target_table_id)
    }

    fn event_type(&self) -> Result<TriggerEvent> {
        self.ensure_open()?;
        Ok(self.event_type)
    }

    fn event_statement_text(&self) -> Result<Option<&str>> {
        self.ensure_open()?;
        Ok(self.statement_text.as_deref())
    }

    fn old_row_set(&mut self) -> Result<Option<RowSet>> {
        self.issue_row_set(Image::Before)
    }

    fn new_row_set(&mut self) -> Result<Option<RowSet>> {
        self.issue_row_set(Image::After)
    }

    fn autoincrement_value(&self, identity: &str) -> Result<Option<i64>> {
        self.resolve_value(identity)
    }
}

impl StatementValidator for TriggerExecutionContext {
    /// DDL is never allowed from a trigger. The CREATE TRIGGER check rejects
    /// it in the body itself, but a procedure called from the body reaches
    /// this point without that check. DML from a BEFORE trigger is also
    /// rejected when configured to re-check it here.
    fn validate_statement(&self, stmt: StmtType) -> Result<()> {
        self.ensure_open()?;

        let before_dml = self.config.enforce_before_trigger_dml
            && stmt.modifies_rows()
            && self.trigger.as_ref().is_some_and(|t| t.is_before_trigger());

        if stmt.is_ddl() || before_dml {
            return Err(Error::PolicyViolation {
                trigger: self.trigger_name().to_string(),
                statement: stmt.as_str().to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for TriggerExecutionContext {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(target: "trigctx", context = %self.id, "trigger execution context dropped without cleanup");
        if let Err(e) = self.cleanup() {
            warn!(target: "trigctx", context = %self.id, error = %e, "cleanup on drop failed");
        }
    }
}

impl fmt::Display for TriggerExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trigger_name())
    }
}

impl fmt::Debug for TriggerExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerExecutionContext")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("target_table_name", &self.target_table_name)
            .field("trigger", &self.trigger_name())
            .field("outstanding_row_sets", &self.issued.len())
            .field("closed", &self.closed)
            .finish()
    }
}
