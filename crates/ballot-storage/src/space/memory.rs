//! In-process tuple space.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::{SpaceSchema, SpaceState, TupleSpace};
use crate::error::{SpaceError, SpaceResult};

/// A [`TupleSpace`] that lives entirely in memory.
///
/// Writes take a short exclusive lock, so every single-tuple operation is
/// atomic with respect to the others. Contents are lost when dropped.
pub struct MemorySpace {
    name: String,
    state: RwLock<SpaceState>,
    closed: AtomicBool,
}

impl MemorySpace {
    /// Creates an empty space.
    pub fn new(schema: SpaceSchema) -> Self {
        Self {
            name: schema.name.clone(),
            state: RwLock::new(SpaceState::new(schema)),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> SpaceResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(SpaceError::Closed(self.name.clone()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TupleSpace for MemorySpace {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert(&self, tuple: Value) -> SpaceResult<()> {
        self.ensure_open()?;
        let key = self.state.write().insert(tuple)?;
        debug!(space = %self.name, key = %key, "Inserted tuple");
        Ok(())
    }

    async fn update(&self, tuple: Value) -> SpaceResult<()> {
        self.ensure_open()?;
        self.state.write().update(tuple)?;
        Ok(())
    }

    async fn select(&self, key: &str) -> SpaceResult<Option<Value>> {
        self.ensure_open()?;
        Ok(self.state.read().get(key))
    }

    async fn select_by(&self, index: &str, value: &Value) -> SpaceResult<Vec<Value>> {
        self.ensure_open()?;
        self.state.read().select_by(index, value)
    }

    async fn delete(&self, key: &str) -> SpaceResult<Option<Value>> {
        self.ensure_open()?;
        Ok(self.state.write().remove(key))
    }

    async fn scan(&self) -> SpaceResult<Vec<Value>> {
        self.ensure_open()?;
        Ok(self.state.read().scan())
    }

    async fn len(&self) -> SpaceResult<usize> {
        self.ensure_open()?;
        Ok(self.state.read().len())
    }

    async fn close(&self) -> SpaceResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(space = %self.name, "Memory space closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
