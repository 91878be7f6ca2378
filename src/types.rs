//! Core value and row types
//!
//! These are the shapes that flow between the engine's row-change machinery
//! and trigger bodies: dynamic column values, rows addressed by 1-based
//! column position, and the identifier of the table a trigger fired on.

use std::fmt;

use crate::error::{EngineError, EngineResult, ErrorCode};

// ============================================================================
// Column Type
// ============================================================================

/// Column data types (SQLITE_INTEGER, SQLITE_FLOAT, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ColumnType {
    /// SQLITE_INTEGER = 1
    Integer = 1,
    /// SQLITE_FLOAT = 2
    Float = 2,
    /// SQLITE_TEXT = 3
    Text = 3,
    /// SQLITE_BLOB = 4
    Blob = 4,
    /// SQLITE_NULL = 5
    Null = 5,
}

// ============================================================================
// Value
// ============================================================================

/// Dynamic column value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// NULL value
    #[default]
    Null,
    /// Integer value (64-bit signed)
    Integer(i64),
    /// Real/float value (64-bit IEEE 754)
    Real(f64),
    /// Text value (UTF-8 string)
    Text(String),
    /// Binary large object
    Blob(Vec<u8>),
}

const I64_MIN_F64: f64 = i64::MIN as f64;

impl Value {
    /// Get the type of this value
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Integer(_) => ColumnType::Integer,
            Value::Real(_) => ColumnType::Float,
            Value::Text(_) => ColumnType::Text,
            Value::Blob(_) => ColumnType::Blob,
        }
    }

    /// Check if value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Extract an exact 64-bit integer.
    ///
    /// Unlike a lossy coercion this refuses NULL, fractional reals, blobs and
    /// text that does not parse as an integer. Generated key columns must
    /// always hold an exact integer.
    pub fn as_i64(&self) -> EngineResult<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            Value::Real(f) if f.fract() == 0.0 && f.is_finite() => {
                // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
                if *f < I64_MIN_F64 || *f >= -I64_MIN_F64 {
                    return Err(EngineError::with_message(
                        ErrorCode::Range,
                        format!("real value {} is out of integer range", f),
                    ));
                }
                Ok(*f as i64)
            }
            Value::Text(s) => s.trim().parse().map_err(|_| self.mismatch()),
            _ => Err(self.mismatch()),
        }
    }

    fn mismatch(&self) -> EngineError {
        EngineError::with_message(
            ErrorCode::Mismatch,
            format!("cannot read {:?} value as an integer", self.column_type()),
        )
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

// ============================================================================
// Row
// ============================================================================

/// One row image. Columns are addressed by 1-based position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at 1-based `position`
    pub fn column(&self, position: usize) -> EngineResult<&Value> {
        position
            .checked_sub(1)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| {
                EngineError::with_message(
                    ErrorCode::Range,
                    format!(
                        "column index {} out of range (row has {} columns)",
                        position,
                        self.values.len()
                    ),
                )
            })
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl<V: Into<Value>> FromIterator<V> for Row {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Row::new(iter.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Table Identifier
// ============================================================================

/// 16-byte table identifier, rendered as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TableId([u8; 16]);

impl TableId {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Parse the 32-character hex form produced by `Display`.
    pub fn parse_hex(s: &str) -> EngineResult<Self> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| {
            EngineError::with_message(ErrorCode::Format, format!("bad table id '{}': {}", s, e))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
