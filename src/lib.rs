//! trigctx - trigger execution context for an embedded SQL engine
//!
//! One context exists per INSERT/UPDATE/DELETE statement that fires
//! triggers. It hands row images to trigger bodies, polices the statements
//! they issue, and guarantees every handle it gave out is released when the
//! statement ends.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod schema;
pub mod types;

// Re-export main public types
pub use error::{EngineError, EngineResult, Error, ErrorCode, Result};

pub use api::{ContextId, RowSet, RowSetRegistry, Session, SessionContext, WrapFailure};
pub use config::TriggerConfig;
pub use executor::{
    AutoincrementCounter, ChangedRows, RowCursor, RowHolder, RowHolderCursor, SingleRowCursor,
    StatementValidator, StmtType, TriggerActivator, TriggerBodyContext, TriggerExecutionContext,
};
pub use schema::{TriggerDescriptor, TriggerEvent, TriggerLevel, TriggerMask, TriggerTiming};
pub use types::{ColumnType, Row, TableId, Value};
