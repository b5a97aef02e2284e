use ballot_core::Interrupted;
use ballot_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by [`PollService`](super::PollService).
///
/// Domain-rule violations are raised by the service itself and are never
/// retried. Anything the storage layer reports that is not a plain
/// "not found" or an interruption ends up in [`PollError::StorageFailure`].
#[derive(Debug, Clone, Error)]
pub enum PollError {
    /// No poll with the requested id exists.
    #[error("poll not found")]
    PollNotFound,

    /// The poll has been ended and accepts no more votes.
    #[error("poll is not active")]
    PollInactive,

    /// The option is not one of the poll's labels.
    #[error("invalid option")]
    InvalidOption,

    /// Only the creator may end or delete a poll.
    #[error("not authorized to perform this action")]
    NotAuthorized,

    /// The request itself is malformed (empty title, too few options, ...).
    #[error("{0}")]
    InvalidArgument(String),

    /// Reserved: re-voting currently overwrites the previous vote instead.
    #[error("already voted in this poll")]
    AlreadyVoted,

    /// The storage layer failed.
    #[error("storage failure: {0}")]
    StorageFailure(#[source] StorageError),

    /// The operation context was cancelled or its deadline passed.
    #[error("{0}")]
    Cancelled(#[from] Interrupted),
}

impl PollError {
    /// Creates an invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<StorageError> for PollError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => Self::PollNotFound,
            StorageError::Cancelled(interrupted) => Self::Cancelled(interrupted),
            other => Self::StorageFailure(other),
        }
    }
}

/// Result type for poll service operations.
pub type PollResult<T> = Result<T, PollError>;
