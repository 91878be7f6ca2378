//! Autoincrement counters
//!
//! An INSERT into a table with a generated key column carries one counter per
//! such column. The counters are handed to the trigger execution context so
//! trigger bodies can read the value generated for the triggering insert.

use crate::error::{EngineError, EngineResult, ErrorCode};

/// Generated-value state for one key column during one INSERT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoincrementCounter {
    identity: String,
    /// 1-based position of the column in the inserted row
    column_position: usize,
    start: i64,
    increment: i64,
    /// Last value generated before this statement, if any
    initial_value: Option<i64>,
    /// Last value generated or inserted by this statement
    counter: Option<i64>,
    /// Value visible to trigger bodies
    current_value: Option<i64>,
}

impl AutoincrementCounter {
    pub fn new(
        schema: &str,
        table: &str,
        column: &str,
        column_position: usize,
        start: i64,
        increment: i64,
        initial_value: Option<i64>,
    ) -> Self {
        Self {
            identity: Self::make_identity(schema, table, column),
            column_position,
            start,
            increment,
            initial_value,
            counter: None,
            current_value: initial_value,
        }
    }

    /// `schema.table.column`, the key used to look a counter up
    pub fn make_identity(schema: &str, table: &str, column: &str) -> String {
        format!("{}.{}.{}", schema, table, column)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn column_position(&self) -> usize {
        self.column_position
    }

    pub fn current_value(&self) -> Option<i64> {
        self.current_value
    }

    /// Generate the next value for this column.
    ///
    /// The first value is `start` unless the table already generated values,
    /// in which case the sequence continues from the last one.
    pub fn next_value(&mut self) -> EngineResult<i64> {
        let value = match self.counter.or(self.initial_value) {
            Some(last) => last.checked_add(self.increment).ok_or_else(|| {
                EngineError::with_message(
                    ErrorCode::Range,
                    format!("overflow generating value for {}", self.identity),
                )
            })?,
            None => self.start,
        };
        self.counter = Some(value);
        Ok(value)
    }

    /// Record `value` as the value of the most recently inserted row.
    pub fn update(&mut self, value: i64) -> i64 {
        self.counter = Some(value);
        self.current_value = Some(value);
        value
    }

    /// Rewind to the state before the insert (`to_beginning`), or expose the
    /// last value the insert produced.
    pub fn reset(&mut self, to_beginning: bool) {
        self.current_value = if to_beginning {
            self.initial_value
        } else {
            self.counter
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let c = AutoincrementCounter::new("app", "orders", "id", 1, 1, 1, None);
        assert_eq!(c.identity(), "app.orders.id");
        assert_eq!(c.column_position(), 1);
        assert_eq!(c.current_value(), None);
    }

    #[test]
    fn test_next_value_from_start_and_existing() {
        let mut fresh = AutoincrementCounter::new("s", "t", "c", 1, 100, 5, None);
        assert_eq!(fresh.next_value().unwrap(), 100);
        assert_eq!(fresh.next_value().unwrap(), 105);

        let mut existing = AutoincrementCounter::new("s", "t", "c", 1, 1, 1, Some(41));
        assert_eq!(existing.next_value().unwrap(), 42);
    }

    #[test]
    fn test_next_value_overflow() {
        let mut c = AutoincrementCounter::new("s", "t", "c", 1, 1, 1, Some(i64::MAX));
        assert_eq!(c.next_value().unwrap_err().code(), ErrorCode::Range);
    }

    #[test]
    fn test_update_and_reset() {
        let mut c = AutoincrementCounter::new("s", "t", "c", 2, 1, 1, Some(10));
        assert_eq!(c.current_value(), Some(10));

        c.update(11);
        c.update(12);
        assert_eq!(c.current_value(), Some(12));

        c.reset(true);
        assert_eq!(c.current_value(), Some(10));

        c.reset(false);
        assert_eq!(c.current_value(), Some(12));
    }
}
