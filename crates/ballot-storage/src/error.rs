//! Storage error types.
//!
//! Three levels, from the bottom up:
//!
//! - [`SpaceError`]: raised by a [`TupleSpace`](crate::TupleSpace) backend
//! - [`DecodeError`]: a stored tuple does not have the poll record layout
//! - [`StorageError`]: what the [`PollStore`](crate::PollStore) adapter reports

use ballot_core::Interrupted;
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Backend Errors
// =============================================================================

/// Errors raised by tuple-space backends.
#[derive(Debug, Clone, Error)]
pub enum SpaceError {
    /// A tuple with the same primary key already exists.
    #[error("duplicate key '{key}' in space '{space}'")]
    Duplicate {
        /// Space name.
        space: String,
        /// The conflicting primary key.
        key: String,
    },

    /// No tuple with this primary key exists.
    #[error("key '{key}' not found in space '{space}'")]
    Missing {
        /// Space name.
        space: String,
        /// The missing primary key.
        key: String,
    },

    /// The tuple is not an array with a string primary key.
    #[error("malformed tuple: {0}")]
    MalformedTuple(String),

    /// A secondary index lookup named an index the space does not have.
    #[error("unknown index '{index}' on space '{space}'")]
    UnknownIndex {
        /// Space name.
        space: String,
        /// Requested index name.
        index: String,
    },

    /// The space has been closed.
    #[error("space '{0}' is closed")]
    Closed(String),

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The snapshot file could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<std::io::Error> for SpaceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SpaceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

// =============================================================================
// Decode Errors
// =============================================================================

/// A stored tuple could not be turned into a well-formed poll.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The record is not an array.
    #[error("expected a tuple, got {found}")]
    NotATuple {
        /// JSON kind that was found instead.
        found: &'static str,
    },

    /// The tuple does not have exactly the expected number of fields.
    #[error("expected {expected} fields, got {found}")]
    Arity {
        /// Required field count.
        expected: usize,
        /// Actual field count.
        found: usize,
    },

    /// A field holds a value of the wrong type.
    #[error("field '{field}' must be {expected}, got {found}")]
    FieldType {
        /// Field name (with element position for collections).
        field: String,
        /// Expected type.
        expected: &'static str,
        /// JSON kind that was found.
        found: &'static str,
    },
}

impl DecodeError {
    pub(crate) fn field_type(field: impl Into<String>, expected: &'static str, found: &Value) -> Self {
        Self::FieldType {
            field: field.into(),
            expected,
            found: json_kind(found),
        }
    }
}

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_u64() => "unsigned integer",
        Value::Number(n) if n.is_i64() => "negative integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors reported by the storage adapter.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// No record with this id exists.
    #[error("poll '{0}' not found")]
    NotFound(String),

    /// A record with this id already exists.
    #[error("poll '{0}' already exists")]
    DuplicateKey(String),

    /// The stored record could not be decoded.
    #[error("poll '{id}' is corrupt: {source}")]
    Corrupt {
        /// Primary key of the broken record.
        id: String,
        /// What was wrong with it.
        #[source]
        source: DecodeError,
    },

    /// The backend failed or is no longer reachable.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] SpaceError),

    /// The operation context was cancelled or expired.
    #[error("storage operation interrupted: {0}")]
    Cancelled(#[from] Interrupted),
}

impl StorageError {
    /// Returns `true` for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for backend operations.
pub type SpaceResult<T> = Result<T, SpaceError>;

/// Result type for adapter operations.
pub type StorageResult<T> = Result<T, StorageError>;
