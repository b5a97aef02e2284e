//! Runtime error types.

use ballot_storage::StorageError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while starting, serving or stopping the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The storage backend stayed unreachable for every startup attempt.
    #[error("storage unavailable after {attempts} attempt(s): {source}")]
    StorageUnavailable {
        attempts: u32,
        #[source]
        source: StorageError,
    },

    /// Storage failed outside of startup (e.g. while closing).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A command arrived before [`start`](crate::BallotRuntime::start).
    #[error("runtime has not been started")]
    NotStarted,

    /// A command arrived after [`shutdown`](crate::BallotRuntime::shutdown).
    #[error("runtime has been shut down")]
    ShutDown,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
