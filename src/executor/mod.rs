//! Trigger execution: cursors, counters, validation and the context itself

pub mod activator;
pub mod autoincrement;
pub mod cursor;
pub mod row_holder;
pub mod trigger;
pub mod validator;

pub use activator::{ChangedRows, TriggerActivator};
pub use autoincrement::AutoincrementCounter;
pub use cursor::RowCursor;
pub use row_holder::{RowHolder, RowHolderCursor, SingleRowCursor};
pub use trigger::{TriggerBodyContext, TriggerExecutionContext};
pub use validator::{StatementValidator, StmtType};
