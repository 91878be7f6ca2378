//! Row set handles handed to trigger bodies
//!
//! A [`RowSet`] wraps a private duplicate of a before/after cursor. Clones of
//! a handle share its state, so the execution context can keep one clone in
//! its [`RowSetRegistry`] and force it closed when the statement ends, even
//! while trigger code still holds the other clone.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::error::{EngineError, EngineResult, Error, ErrorCode, Result};
use crate::executor::cursor::RowCursor;
use crate::types::{Row, Value};

static NEXT_ROW_SET_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// RowSet
// ============================================================================

struct RowSetState {
    cursor: Box<dyn RowCursor>,
    current: Option<Row>,
    closed: bool,
}

/// Independently positioned view over before or after row images.
#[derive(Clone)]
pub struct RowSet {
    id: u64,
    state: Rc<RefCell<RowSetState>>,
}

impl RowSet {
    /// Wrap an already opened cursor.
    pub fn new(cursor: Box<dyn RowCursor>) -> Self {
        Self {
            id: NEXT_ROW_SET_ID.fetch_add(1, Ordering::Relaxed),
            state: Rc::new(RefCell::new(RowSetState {
                cursor,
                current: None,
                closed: false,
            })),
        }
    }

    /// Process-unique handle id; clones share it.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Advance to the next row. Returns `false` once the rows are exhausted.
    ///
    /// A cursor that calls back into this handle while advancing gets an
    /// `ErrorCode::Misuse` error instead of the handle's state.
    pub fn next(&self) -> Result<bool> {
        let mut state = self.state_mut()?;
        if state.closed {
            return Err(Error::RowSetClosed);
        }
        let row = state.cursor.next_row()?;
        let found = row.is_some();
        state.current = row;
        Ok(found)
    }

    /// Row the handle is positioned on, if any
    pub fn current_row(&self) -> Result<Option<Row>> {
        let state = self.state()?;
        if state.closed {
            return Err(Error::RowSetClosed);
        }
        Ok(state.current.clone())
    }

    /// Column of the current row at 1-based `position`
    pub fn column(&self, position: usize) -> Result<Value> {
        let state = self.state()?;
        if state.closed {
            return Err(Error::RowSetClosed);
        }
        let row = state.current.as_ref().ok_or_else(|| {
            Error::engine(ErrorCode::Misuse, "row set is not positioned on a row")
        })?;
        Ok(row.column(position)?.clone())
    }

    /// Close the handle. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        self.release().map_err(Error::from)
    }

    /// A handle busy advancing is open.
    pub fn is_closed(&self) -> bool {
        self.state.try_borrow().is_ok_and(|state| state.closed)
    }

    fn state(&self) -> EngineResult<Ref<'_, RowSetState>> {
        self.state.try_borrow().map_err(|_| busy())
    }

    fn state_mut(&self) -> EngineResult<RefMut<'_, RowSetState>> {
        self.state.try_borrow_mut().map_err(|_| busy())
    }

    /// Mark closed, then close the cursor exactly once. The handle stays
    /// closed even if the cursor reports a failure.
    fn release(&self) -> EngineResult<()> {
        let mut state = self.state_mut()?;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.current = None;
        state.cursor.close()
    }
}

fn busy() -> EngineError {
    EngineError::with_message(ErrorCode::Misuse, "row set is in use by its own cursor")
}

impl fmt::Debug for RowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowSet")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Every handle ever issued by one execution context, in issue order.
///
/// Entries are never removed one at a time; [`RowSetRegistry::drain`] closes
/// and forgets all of them at once.
#[derive(Debug, Default)]
pub struct RowSetRegistry {
    handles: Vec<RowSet>,
}

impl RowSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, row_set: RowSet) {
        self.handles.push(row_set);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Force-close every registered handle and empty the registry.
    ///
    /// A failure closing one handle never stops the others from being
    /// closed. Failures are logged and returned to the caller.
    pub fn drain(&mut self) -> Vec<EngineError> {
        let mut failures = Vec::new();
        for row_set in self.handles.drain(..) {
            if let Err(e) = row_set.release() {
                warn!(
                    target: "trigctx",
                    row_set = row_set.id(),
                    error = %e,
                    "ignoring failure closing row set during cleanup"
                );
                failures.push(e);
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::row_holder::RowHolder;

    fn opened(holder: &RowHolder) -> Box<dyn RowCursor> {
        let mut cursor = holder.cursor();
        cursor.open().unwrap();
        Box::new(cursor)
    }

    fn holder() -> RowHolder {
        RowHolder::from_rows(vec![
            Row::new(vec![Value::Integer(1), Value::from("a")]),
            Row::new(vec![Value::Integer(2), Value::from("b")]),
        ])
    }

    /// Cursor whose close always fails, counting attempts.
    struct BrokenClose {
        attempts: Rc<RefCell<usize>>,
    }

    impl RowCursor for BrokenClose {
        fn open(&mut self) -> EngineResult<()> {
            Ok(())
        }
        fn next_row(&mut self) -> EngineResult<Option<Row>> {
            Ok(None)
        }
        fn close(&mut self) -> EngineResult<()> {
            *self.attempts.borrow_mut() += 1;
            Err(EngineError::with_message(ErrorCode::IoErr, "close failed"))
        }
        fn is_open(&self) -> bool {
            true
        }
        fn duplicate(&self) -> EngineResult<Box<dyn RowCursor>> {
            Ok(Box::new(BrokenClose {
                attempts: Rc::clone(&self.attempts),
            }))
        }
    }

    #[test]
    fn test_row_set_iteration_and_columns() {
        let rs = RowSet::new(opened(&holder()));
        assert!(rs.current_row().unwrap().is_none());
        assert!(rs.column(1).is_err());

        assert!(rs.next().unwrap());
        assert_eq!(rs.column(1).unwrap(), Value::Integer(1));
        assert_eq!(rs.column(2).unwrap(), Value::from("a"));
        assert_eq!(rs.column(3).unwrap_err().code(), ErrorCode::Range);

        assert!(rs.next().unwrap());
        assert!(!rs.next().unwrap());
        assert!(rs.current_row().unwrap().is_none());
    }

    #[test]
    fn test_clones_share_close_state() {
        let rs = RowSet::new(opened(&holder()));
        let alias = rs.clone();
        assert_eq!(rs.id(), alias.id());

        alias.close().unwrap();
        assert!(rs.is_closed());
        assert!(matches!(rs.next(), Err(Error::RowSetClosed)));
        assert!(matches!(rs.column(1), Err(Error::RowSetClosed)));
        rs.close().unwrap();
    }

    #[test]
    fn test_separate_handles_are_independent() {
        let h = holder();
        let a = RowSet::new(opened(&h));
        let b = RowSet::new(opened(&h));
        assert_ne!(a.id(), b.id());

        assert!(a.next().unwrap());
        a.close().unwrap();

        assert!(!b.is_closed());
        assert!(b.next().unwrap());
        assert_eq!(b.column(1).unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_failed_close_still_marks_closed_once() {
        let attempts = Rc::new(RefCell::new(0));
        let rs = RowSet::new(Box::new(BrokenClose {
            attempts: Rc::clone(&attempts),
        }));
        assert_eq!(rs.close().unwrap_err().code(), ErrorCode::IoErr);
        assert!(rs.is_closed());
        rs.close().unwrap();
        assert_eq!(*attempts.borrow(), 1);
    }

    /// Cursor that reads back through the handle wrapping it.
    struct Reentrant {
        handle: Rc<RefCell<Option<RowSet>>>,
        seen: Rc<RefCell<Option<ErrorCode>>>,
    }

    impl RowCursor for Reentrant {
        fn open(&mut self) -> EngineResult<()> {
            Ok(())
        }
        fn next_row(&mut self) -> EngineResult<Option<Row>> {
            if let Some(rs) = self.handle.borrow().as_ref() {
                *self.seen.borrow_mut() = rs.current_row().err().map(|e| e.code());
            }
            Ok(Some(Row::new(vec![Value::Integer(9)])))
        }
        fn close(&mut self) -> EngineResult<()> {
            Ok(())
        }
        fn is_open(&self) -> bool {
            true
        }
        fn duplicate(&self) -> EngineResult<Box<dyn RowCursor>> {
            Ok(Box::new(Reentrant {
                handle: Rc::clone(&self.handle),
                seen: Rc::clone(&self.seen),
            }))
        }
    }

    #[test]
    fn test_reentrant_cursor_gets_misuse() {
        let handle = Rc::new(RefCell::new(None));
        let seen = Rc::new(RefCell::new(None));
        let rs = RowSet::new(Box::new(Reentrant {
            handle: Rc::clone(&handle),
            seen: Rc::clone(&seen),
        }));
        *handle.borrow_mut() = Some(rs.clone());

        assert!(rs.next().unwrap());
        assert_eq!(*seen.borrow(), Some(ErrorCode::Misuse));
        assert_eq!(rs.column(1).unwrap(), Value::Integer(9));

        // break the handle -> cursor -> handle cycle
        handle.borrow_mut().take();
        rs.close().unwrap();
    }

    #[test]
    fn test_registry_drain_continues_past_failures() {
        let attempts = Rc::new(RefCell::new(0));
        let h = holder();
        let mut registry = RowSetRegistry::new();

        let good_a = RowSet::new(opened(&h));
        let bad = RowSet::new(Box::new(BrokenClose {
            attempts: Rc::clone(&attempts),
        }));
        let good_b = RowSet::new(opened(&h));
        registry.register(good_a.clone());
        registry.register(bad.clone());
        registry.register(good_b.clone());
        assert_eq!(registry.len(), 3);

        let failures = registry.drain();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].code(), ErrorCode::IoErr);
        assert!(registry.is_empty());
        assert!(good_a.is_closed() && bad.is_closed() && good_b.is_closed());
        assert_eq!(*attempts.borrow(), 1);

        assert!(registry.drain().is_empty());
    }
}
