//! Row cursor abstraction
//!
//! The execution context never scans tables itself. It is handed cursors
//! over the before and after images of the changed rows and only needs to
//! open, advance, close and duplicate them.

use crate::error::EngineResult;
use crate::types::Row;

/// A cursor over before or after row images.
pub trait RowCursor {
    /// Position the cursor before its first row.
    fn open(&mut self) -> EngineResult<()>;

    /// Advance and return the next row, or `None` once exhausted.
    fn next_row(&mut self) -> EngineResult<Option<Row>>;

    /// Release the cursor. Calling this on an already closed cursor is a
    /// no-op.
    fn close(&mut self) -> EngineResult<()>;

    fn is_open(&self) -> bool;

    /// A new, unopened cursor over the same rows.
    ///
    /// The duplicate keeps its own position: advancing or closing it must not
    /// affect `self` or any other duplicate.
    fn duplicate(&self) -> EngineResult<Box<dyn RowCursor>>;
}
