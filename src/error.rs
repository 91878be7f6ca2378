//! Error types and Result aliases for trigctx
//!
//! Two layers:
//! - [`EngineError`] is what the engine's collaborators (cursors, rows, the
//!   session) report. It carries a SQLite-style [`ErrorCode`].
//! - [`Error`] is what trigger-body code sees. Engine failures are wrapped
//!   into it with the original cause preserved.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Error Codes
// ============================================================================

/// Primary result codes.
///
/// Numeric values match the primary codes from `sqlite3.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    Error = 1,
    Internal = 2,
    Perm = 3,
    Abort = 4,
    Busy = 5,
    Locked = 6,
    NoMem = 7,
    ReadOnly = 8,
    Interrupt = 9,
    IoErr = 10,
    Corrupt = 11,
    NotFound = 12,
    Full = 13,
    CantOpen = 14,
    Protocol = 15,
    Empty = 16,
    Schema = 17,
    TooBig = 18,
    Constraint = 19,
    Mismatch = 20,
    Misuse = 21,
    NoLfs = 22,
    Auth = 23,
    Format = 24,
    Range = 25,
    NotADb = 26,
    Notice = 27,
    Warning = 28,
    Row = 100,
    Done = 101,
}

impl ErrorCode {
    /// English description of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Ok => "not an error",
            ErrorCode::Error => "SQL logic error",
            ErrorCode::Internal => "internal error",
            ErrorCode::Perm => "access permission denied",
            ErrorCode::Abort => "query aborted",
            ErrorCode::Busy => "database is locked",
            ErrorCode::Locked => "database table is locked",
            ErrorCode::NoMem => "out of memory",
            ErrorCode::ReadOnly => "attempt to write a readonly database",
            ErrorCode::Interrupt => "interrupted",
            ErrorCode::IoErr => "disk I/O error",
            ErrorCode::Corrupt => "database disk image is malformed",
            ErrorCode::NotFound => "unknown operation",
            ErrorCode::Full => "database or disk is full",
            ErrorCode::CantOpen => "unable to open database file",
            ErrorCode::Protocol => "locking protocol",
            ErrorCode::Empty => "empty",
            ErrorCode::Schema => "database schema has changed",
            ErrorCode::TooBig => "string or blob too big",
            ErrorCode::Constraint => "constraint failed",
            ErrorCode::Mismatch => "datatype mismatch",
            ErrorCode::Misuse => "bad parameter or other API misuse",
            ErrorCode::NoLfs => "large file support is disabled",
            ErrorCode::Auth => "authorization denied",
            ErrorCode::Format => "file format error",
            ErrorCode::Range => "column index out of range",
            ErrorCode::NotADb => "file is not a database",
            ErrorCode::Notice => "notification message",
            ErrorCode::Warning => "warning message",
            ErrorCode::Row => "another row available",
            ErrorCode::Done => "no more rows available",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Engine Error
// ============================================================================

/// Failure reported by an engine collaborator (cursor, row, session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    code: ErrorCode,
    message: Option<String>,
}

impl EngineError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => f.write_str(msg),
            None => f.write_str(self.code.as_str()),
        }
    }
}

impl std::error::Error for EngineError {}

// ============================================================================
// Public Error
// ============================================================================

/// Error surfaced to code running inside a trigger body.
#[derive(Error, Debug)]
pub enum Error {
    /// The trigger execution context was used after its statement finished.
    #[error("statement closed: trigger execution context is no longer valid")]
    ContextClosed,

    /// A nested statement is not allowed from within the active trigger.
    #[error("{statement} statement is not allowed in trigger '{trigger}'")]
    PolicyViolation { trigger: String, statement: String },

    /// A row set handle was used after it was closed.
    #[error("row set is closed")]
    RowSetClosed,

    /// Failure from an underlying cursor or row operation.
    #[error("{0}")]
    Engine(#[from] EngineError),
}

impl Error {
    /// Result code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ContextClosed | Error::RowSetClosed => ErrorCode::Misuse,
            Error::PolicyViolation { .. } => ErrorCode::Constraint,
            Error::Engine(e) => e.code(),
        }
    }

    /// Shorthand for wrapping an engine failure.
    pub fn engine(code: ErrorCode, message: impl Into<String>) -> Self {
        Error::Engine(EngineError::with_message(code, message))
    }
}

/// Result type alias for operations visible to trigger bodies.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for engine collaborator operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let bare = EngineError::new(ErrorCode::IoErr);
        assert_eq!(bare.to_string(), "disk I/O error");

        let msg = EngineError::with_message(ErrorCode::Corrupt, "bad page 7");
        assert_eq!(msg.to_string(), "bad page 7");
        assert_eq!(msg.code(), ErrorCode::Corrupt);
        assert_eq!(msg.message(), Some("bad page 7"));
    }

    #[test]
    fn test_engine_error_wraps_with_source() {
        let err: Error = EngineError::with_message(ErrorCode::Busy, "scan locked").into();
        assert_eq!(err.code(), ErrorCode::Busy);
        assert_eq!(err.to_string(), "scan locked");

        let source = std::error::Error::source(&err).expect("engine cause kept");
        assert_eq!(source.to_string(), "scan locked");
    }

    #[test]
    fn test_public_error_codes() {
        assert_eq!(Error::ContextClosed.code(), ErrorCode::Misuse);
        assert_eq!(Error::RowSetClosed.code(), ErrorCode::Misuse);
        let violation = Error::PolicyViolation {
            trigger: "audit_ins".to_string(),
            statement: "CREATE TABLE".to_string(),
        };
        assert_eq!(violation.code(), ErrorCode::Constraint);
        assert_eq!(
            violation.to_string(),
            "CREATE TABLE statement is not allowed in trigger 'audit_ins'"
        );
    }
}
