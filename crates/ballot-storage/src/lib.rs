//! Storage layer for Ballot.
//!
//! The backing store is an untyped key-value "space" holding fixed-arity
//! tuples (JSON arrays). This crate keeps every conversion between those
//! tuples and the typed [`Poll`](ballot_core::Poll) in one place so that the
//! service layer never touches raw values.
//!
//! # Components
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`TupleSpace`] | Backend contract: insert / update / select / delete / scan |
//! | [`MemorySpace`] | In-process backend, secondary indexes kept in memory |
//! | [`FileSpace`] | Same as memory, written through to a JSON snapshot |
//! | [`codec`] | Strict `Poll` ⇄ tuple conversion |
//! | [`PollStore`] / [`TuplePollStore`] | The storage adapter used by the service |
//!
//! # Record layout
//!
//! ```text
//! [ id: string, title: string, options: [string], created_by: string,
//!   created_at: u64, is_active: bool, votes: {string: string} ]
//! ```
//!
//! Configure the backend via `ballot.toml`:
//!
//! ```toml
//! [storage]
//! backend = "file"
//! path = "./data/polls.json"
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod space;
pub mod store;

pub use codec::{decode, encode};
pub use config::{BackendKind, StorageConfig};
pub use error::{DecodeError, SpaceError, SpaceResult, StorageError, StorageResult};
pub use space::{
    BoxedSpace, FileSpace, IndexDef, MemorySpace, SpaceSchema, TupleSpace, open_space,
};
pub use store::{CREATED_BY_INDEX, IS_ACTIVE_INDEX, PollStore, TuplePollStore, poll_schema};
