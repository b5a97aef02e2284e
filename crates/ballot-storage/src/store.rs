//! The poll storage adapter.
//!
//! [`PollStore`] is the only storage surface the service layer sees. It speaks
//! in [`Poll`] values and [`StorageError`]s; [`TuplePollStore`] implements it
//! over any [`TupleSpace`] by running every record through the strict
//! [`codec`](crate::codec).
//!
//! The adapter applies no business rules. It does not check who may end a
//! poll or whether a vote is valid; it only moves records in and out.

use std::sync::Arc;

use async_trait::async_trait;
use ballot_core::{OpContext, Poll};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::{self, field};
use crate::config::StorageConfig;
use crate::error::{SpaceError, StorageError, StorageResult};
use crate::space::{BoxedSpace, SpaceSchema, TupleSpace, open_space};

/// Secondary index over the creator field.
pub const CREATED_BY_INDEX: &str = "created_by";

/// Secondary index over the active flag.
pub const IS_ACTIVE_INDEX: &str = "is_active";

/// Schema of the poll space: primary key on `id`, non-unique indexes on
/// `created_by` and `is_active`.
pub fn poll_schema(name: impl Into<String>) -> SpaceSchema {
    SpaceSchema::new(name)
        .index(CREATED_BY_INDEX, field::CREATED_BY)
        .index(IS_ACTIVE_INDEX, field::IS_ACTIVE)
}

// ─── PollStore trait ──────────────────────────────────────────────────────────

/// Typed access to persisted polls.
///
/// Every operation takes an [`OpContext`] and fails with
/// [`StorageError::Cancelled`] if the context is interrupted first.
#[async_trait]
pub trait PollStore: Send + Sync + 'static {
    /// Inserts a new poll. Fails with [`StorageError::DuplicateKey`] if the id is taken.
    async fn create(&self, ctx: &OpContext, poll: &Poll) -> StorageResult<()>;

    /// Loads a poll by id.
    ///
    /// Fails with [`StorageError::NotFound`] if absent and with
    /// [`StorageError::Corrupt`] if the stored record cannot be decoded.
    async fn get(&self, ctx: &OpContext, id: &str) -> StorageResult<Poll>;

    /// Overwrites an existing poll in full. Fails with [`StorageError::NotFound`]
    /// if the id does not exist; this never creates a record.
    async fn replace(&self, ctx: &OpContext, poll: &Poll) -> StorageResult<()>;

    /// Removes a poll. Deleting an unknown id succeeds.
    async fn delete(&self, ctx: &OpContext, id: &str) -> StorageResult<()>;

    /// Returns every decodable poll. Corrupt records are skipped and logged.
    async fn list(&self, ctx: &OpContext) -> StorageResult<Vec<Poll>>;

    /// Returns every decodable poll created by `user_id`.
    async fn list_by_creator(&self, ctx: &OpContext, user_id: &str) -> StorageResult<Vec<Poll>>;

    /// Releases the backend. Idempotent.
    async fn close(&self) -> StorageResult<()>;
}

// ─── TuplePollStore ───────────────────────────────────────────────────────────

/// [`PollStore`] over an untyped [`TupleSpace`].
///
/// Cheap to clone; clones share the same space handle.
#[derive(Clone)]
pub struct TuplePollStore {
    space: BoxedSpace,
}

impl TuplePollStore {
    /// Wraps an already opened space.
    pub fn new(space: BoxedSpace) -> Self {
        Self { space }
    }

    /// Opens the configured backend with the poll schema.
    pub async fn connect(config: &StorageConfig) -> StorageResult<Self> {
        let space = open_space(config, poll_schema(config.space.as_str()))
            .await
            .map_err(StorageError::Unavailable)?;
        Ok(Self::new(space))
    }

    /// The underlying space.
    pub fn space(&self) -> &Arc<dyn TupleSpace> {
        &self.space
    }

    fn decode_all(&self, tuples: Vec<Value>) -> Vec<Poll> {
        tuples
            .iter()
            .filter_map(|tuple| match codec::decode(tuple) {
                Ok(poll) => Some(poll),
                Err(e) => {
                    warn!(
                        space = %self.space.name(),
                        poll_id = codec::tuple_key(tuple).unwrap_or("<unknown>"),
                        error = %e,
                        "Skipping corrupt poll record"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Maps a backend error for an operation on `id`.
fn space_error(id: &str, err: SpaceError) -> StorageError {
    match err {
        SpaceError::Duplicate { .. } => StorageError::DuplicateKey(id.to_string()),
        SpaceError::Missing { .. } => StorageError::NotFound(id.to_string()),
        other => StorageError::Unavailable(other),
    }
}

#[async_trait]
impl PollStore for TuplePollStore {
    async fn create(&self, ctx: &OpContext, poll: &Poll) -> StorageResult<()> {
        let tuple = codec::encode(poll);
        ctx.run(self.space.insert(tuple))
            .await?
            .map_err(|e| space_error(&poll.id, e))?;

        info!(poll_id = %poll.id, created_by = %poll.created_by, "Poll stored");
        Ok(())
    }

    async fn get(&self, ctx: &OpContext, id: &str) -> StorageResult<Poll> {
        let tuple = ctx
            .run(self.space.select(id))
            .await?
            .map_err(|e| space_error(id, e))?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        codec::decode(&tuple).map_err(|source| StorageError::Corrupt {
            id: id.to_string(),
            source,
        })
    }

    async fn replace(&self, ctx: &OpContext, poll: &Poll) -> StorageResult<()> {
        let tuple = codec::encode(poll);
        ctx.run(self.space.update(tuple))
            .await?
            .map_err(|e| space_error(&poll.id, e))?;

        debug!(poll_id = %poll.id, votes = poll.votes.len(), active = poll.is_active, "Poll replaced");
        Ok(())
    }

    async fn delete(&self, ctx: &OpContext, id: &str) -> StorageResult<()> {
        let removed = ctx
            .run(self.space.delete(id))
            .await?
            .map_err(|e| space_error(id, e))?;

        match removed {
            Some(_) => info!(poll_id = %id, "Poll deleted"),
            None => debug!(poll_id = %id, "Delete of absent poll ignored"),
        }
        Ok(())
    }

    async fn list(&self, ctx: &OpContext) -> StorageResult<Vec<Poll>> {
        let tuples = ctx
            .run(self.space.scan())
            .await?
            .map_err(StorageError::Unavailable)?;
        Ok(self.decode_all(tuples))
    }

    async fn list_by_creator(&self, ctx: &OpContext, user_id: &str) -> StorageResult<Vec<Poll>> {
        let key = Value::String(user_id.to_string());
        let tuples = ctx
            .run(self.space.select_by(CREATED_BY_INDEX, &key))
            .await?
            .map_err(StorageError::Unavailable)?;
        Ok(self.decode_all(tuples))
    }

    async fn close(&self) -> StorageResult<()> {
        self.space.close().await.map_err(StorageError::Unavailable)
    }
}
