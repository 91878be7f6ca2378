//! Temporary row holders
//!
//! A DML statement collects the before/after images of the rows it changes
//! into a [`RowHolder`]. Statement triggers read the whole holder through a
//! [`RowHolderCursor`]; row triggers get a [`SingleRowCursor`] per row.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::executor::cursor::RowCursor;
use crate::types::Row;

fn not_open() -> EngineError {
    EngineError::with_message(ErrorCode::Misuse, "cursor is not open")
}

// ============================================================================
// RowHolder
// ============================================================================

/// Append-only buffer of row images shared by every cursor opened on it.
#[derive(Debug, Clone, Default)]
pub struct RowHolder {
    rows: Rc<RefCell<Vec<Row>>>,
}

impl RowHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Rc::new(RefCell::new(rows)),
        }
    }

    /// Append a row image
    pub fn insert(&self, row: Row) {
        self.rows.borrow_mut().push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Copy of the row at 0-based `index`
    pub fn row(&self, index: usize) -> Option<Row> {
        self.rows.borrow().get(index).cloned()
    }

    /// Unopened cursor over every row in the holder
    pub fn cursor(&self) -> RowHolderCursor {
        RowHolderCursor {
            rows: Rc::clone(&self.rows),
            position: 0,
            open: false,
        }
    }
}

// ============================================================================
// RowHolderCursor
// ============================================================================

/// Cursor over a [`RowHolder`]. Rows appended while the cursor is open are
/// visible to it once it reaches them.
#[derive(Debug)]
pub struct RowHolderCursor {
    rows: Rc<RefCell<Vec<Row>>>,
    position: usize,
    open: bool,
}

impl RowCursor for RowHolderCursor {
    fn open(&mut self) -> EngineResult<()> {
        self.position = 0;
        self.open = true;
        Ok(())
    }

    fn next_row(&mut self) -> EngineResult<Option<Row>> {
        if !self.open {
            return Err(not_open());
        }
        let row = self.rows.borrow().get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> EngineResult<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn duplicate(&self) -> EngineResult<Box<dyn RowCursor>> {
        Ok(Box::new(RowHolderCursor {
            rows: Rc::clone(&self.rows),
            position: 0,
            open: false,
        }))
    }
}

// ============================================================================
// SingleRowCursor
// ============================================================================

/// Cursor over exactly one row image
#[derive(Debug)]
pub struct SingleRowCursor {
    row: Rc<Row>,
    consumed: bool,
    open: bool,
}

impl SingleRowCursor {
    pub fn new(row: Row) -> Self {
        Self {
            row: Rc::new(row),
            consumed: false,
            open: false,
        }
    }
}

impl RowCursor for SingleRowCursor {
    fn open(&mut self) -> EngineResult<()> {
        self.consumed = false;
        self.open = true;
        Ok(())
    }

    fn next_row(&mut self) -> EngineResult<Option<Row>> {
        if !self.open {
            return Err(not_open());
        }
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;
        Ok(Some(Row::clone(&self.row)))
    }

    fn close(&mut self) -> EngineResult<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn duplicate(&self) -> EngineResult<Box<dyn RowCursor>> {
        Ok(Box::new(SingleRowCursor {
            row: Rc::clone(&self.row),
            consumed: false,
            open: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn row(v: i64) -> Row {
        Row::new(vec![Value::Integer(v)])
    }

    fn drain(cursor: &mut dyn RowCursor) -> Vec<Row> {
        let mut out = Vec::new();
        while let Some(r) = cursor.next_row().unwrap() {
            out.push(r);
        }
        out
    }

    #[test]
    fn test_holder_cursor_reads_all_rows() {
        let holder = RowHolder::from_rows(vec![row(1), row(2), row(3)]);
        let mut cursor = holder.cursor();
        assert!(cursor.next_row().is_err());

        cursor.open().unwrap();
        assert_eq!(drain(&mut cursor), vec![row(1), row(2), row(3)]);
        assert_eq!(cursor.next_row().unwrap(), None);
    }

    #[test]
    fn test_holder_duplicates_are_independent() {
        let holder = RowHolder::new();
        holder.insert(row(1));
        holder.insert(row(2));

        let mut a = holder.cursor();
        a.open().unwrap();
        assert_eq!(a.next_row().unwrap(), Some(row(1)));

        let mut b = a.duplicate().unwrap();
        assert!(!b.is_open());
        b.open().unwrap();
        assert_eq!(b.next_row().unwrap(), Some(row(1)));

        b.close().unwrap();
        b.close().unwrap();
        assert_eq!(a.next_row().unwrap(), Some(row(2)));
        assert!(a.is_open());
    }

    #[test]
    fn test_holder_sees_appended_rows() {
        let holder = RowHolder::new();
        let mut cursor = holder.cursor();
        cursor.open().unwrap();
        assert_eq!(cursor.next_row().unwrap(), None);
        holder.insert(row(9));
        assert_eq!(cursor.next_row().unwrap(), Some(row(9)));
        assert_eq!(holder.len(), 1);
        assert_eq!(holder.row(0), Some(row(9)));
    }

    #[test]
    fn test_single_row_cursor() {
        let mut cursor = SingleRowCursor::new(row(5));
        cursor.open().unwrap();
        assert_eq!(drain(&mut cursor), vec![row(5)]);

        let mut dup = cursor.duplicate().unwrap();
        dup.open().unwrap();
        assert_eq!(dup.next_row().unwrap(), Some(row(5)));

        // reopening rewinds
        cursor.open().unwrap();
        assert_eq!(cursor.next_row().unwrap(), Some(row(5)));
    }
}
