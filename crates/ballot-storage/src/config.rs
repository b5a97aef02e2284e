//! Storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which [`TupleSpace`](crate::TupleSpace) implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local, lost on restart.
    #[default]
    Memory,
    /// JSON snapshot file, rewritten after every write.
    File,
}

/// Configuration for the storage layer (loaded from `ballot.toml`).
///
/// ```toml
/// [storage]
/// backend = "file"
/// path = "./data/polls.json"
/// connect_attempts = 3
/// retry_delay_ms = 2000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to open. Defaults to `memory`.
    pub backend: BackendKind,
    /// Snapshot file for the `file` backend. Defaults to `./data/polls.json`.
    pub path: PathBuf,
    /// Name of the space holding poll tuples. Defaults to `polls`.
    pub space: String,
    /// Connection attempts at startup before giving up.
    pub connect_attempts: u32,
    /// Fixed delay between startup connection attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            path: PathBuf::from("./data/polls.json"),
            space: "polls".to_string(),
            connect_attempts: 3,
            retry_delay_ms: 2000,
        }
    }
}
