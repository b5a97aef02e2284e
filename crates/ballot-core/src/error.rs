//! Error types shared by every layer.
//!
//! Layer-specific taxonomies (storage, service, commands) live next to the
//! code that raises them; only the errors of the core capabilities are here.

use thiserror::Error;

// =============================================================================
// Context Errors
// =============================================================================

/// Why an [`OpContext`](crate::OpContext) stopped an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    /// The context (or one of its parents) was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed before the operation finished.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

// =============================================================================
// Notifier Errors
// =============================================================================

/// Errors reported by a [`Notifier`](crate::Notifier).
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// The platform refused the message.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// The platform could not be reached.
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

impl NotifyError {
    /// Creates a rejection error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Creates an unavailability error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Result type for notifier operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
