//! Cursor doubles shared by the integration tests

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use trigctx::{EngineError, EngineResult, ErrorCode, Row, RowCursor, Value};

/// Close counts observed across a source cursor and all its duplicates.
#[derive(Debug, Default)]
pub struct CloseStats {
    pub source_closes: Cell<usize>,
    pub duplicate_closes: Cell<usize>,
    pub duplicates: Cell<usize>,
}

/// Cursor over fixed rows that counts close calls and can be told to fail
/// them.
pub struct TrackingCursor {
    rows: Rc<Vec<Row>>,
    position: usize,
    open: bool,
    duplicate: bool,
    fail_close: bool,
    stats: Rc<CloseStats>,
}

impl TrackingCursor {
    pub fn new(rows: Vec<Row>, stats: Rc<CloseStats>) -> Self {
        Self {
            rows: Rc::new(rows),
            position: 0,
            open: false,
            duplicate: false,
            fail_close: false,
            stats,
        }
    }

    /// Every close on this cursor and its duplicates fails.
    pub fn failing(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

impl RowCursor for TrackingCursor {
    fn open(&mut self) -> EngineResult<()> {
        self.position = 0;
        self.open = true;
        Ok(())
    }

    fn next_row(&mut self) -> EngineResult<Option<Row>> {
        if !self.open {
            return Err(EngineError::with_message(ErrorCode::Misuse, "not open"));
        }
        let row = self.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> EngineResult<()> {
        let counter = if self.duplicate {
            &self.stats.duplicate_closes
        } else {
            &self.stats.source_closes
        };
        counter.set(counter.get() + 1);
        self.open = false;
        if self.fail_close {
            return Err(EngineError::with_message(ErrorCode::IoErr, "close failed"));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn duplicate(&self) -> EngineResult<Box<dyn RowCursor>> {
        self.stats.duplicates.set(self.stats.duplicates.get() + 1);
        Ok(Box::new(TrackingCursor {
            rows: Rc::clone(&self.rows),
            position: 0,
            open: false,
            duplicate: true,
            fail_close: self.fail_close,
            stats: Rc::clone(&self.stats),
        }))
    }
}

/// Single-column integer rows
pub fn int_rows(values: &[i64]) -> Vec<Row> {
    values
        .iter()
        .map(|v| Row::new(vec![Value::Integer(*v)]))
        .collect()
}
