//! Tuple-space backends.
//!
//! A *space* is a named table of tuples (JSON arrays) keyed by the string in
//! field 0, with optional non-unique secondary indexes over other fields.
//! Each single-tuple write is atomic per key; there is no multi-tuple
//! transaction and no compare-and-swap.
//!
//! | Backend | Persistence |
//! |---------|-------------|
//! | [`MemorySpace`] | none |
//! | [`FileSpace`] | JSON snapshot, written through on every change |

mod file;
mod memory;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::config::{BackendKind, StorageConfig};
use crate::error::{SpaceError, SpaceResult};

pub use file::FileSpace;
pub use memory::MemorySpace;

// ─── TupleSpace trait ─────────────────────────────────────────────────────────

/// Backend contract for an untyped tuple store.
///
/// Implementations are shared across concurrent callers behind a
/// [`BoxedSpace`] and must be safe to use until [`close`](Self::close)
/// is called. After that every operation fails with [`SpaceError::Closed`].
#[async_trait]
pub trait TupleSpace: Send + Sync + 'static {
    /// Name of the space (e.g. `"polls"`).
    fn name(&self) -> &str;

    /// Inserts a new tuple. Fails with [`SpaceError::Duplicate`] if the key exists.
    async fn insert(&self, tuple: Value) -> SpaceResult<()>;

    /// Overwrites an existing tuple. Fails with [`SpaceError::Missing`] if absent.
    async fn update(&self, tuple: Value) -> SpaceResult<()>;

    /// Looks up a tuple by primary key.
    async fn select(&self, key: &str) -> SpaceResult<Option<Value>>;

    /// Returns every tuple whose indexed field equals `value`, in key order.
    async fn select_by(&self, index: &str, value: &Value) -> SpaceResult<Vec<Value>>;

    /// Removes a tuple, returning it if it existed.
    async fn delete(&self, key: &str) -> SpaceResult<Option<Value>>;

    /// Returns every tuple in key order.
    async fn scan(&self) -> SpaceResult<Vec<Value>>;

    /// Number of stored tuples.
    async fn len(&self) -> SpaceResult<usize>;

    /// Releases the space. Idempotent.
    async fn close(&self) -> SpaceResult<()>;

    /// Returns `true` once [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}

/// Shared, type-erased space handle.
pub type BoxedSpace = Arc<dyn TupleSpace>;

// ─── Schema ───────────────────────────────────────────────────────────────────

/// A non-unique secondary index over one tuple field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    /// Index name used in [`TupleSpace::select_by`].
    pub name: String,
    /// Zero-based field position.
    pub field: usize,
}

/// Space name plus its secondary indexes. The primary key is always field 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceSchema {
    /// Space name.
    pub name: String,
    /// Secondary indexes.
    pub secondary: Vec<IndexDef>,
}

impl SpaceSchema {
    /// Creates a schema with no secondary indexes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secondary: Vec::new(),
        }
    }

    /// Adds a secondary index (builder pattern).
    pub fn index(mut self, name: impl Into<String>, field: usize) -> Self {
        self.secondary.push(IndexDef {
            name: name.into(),
            field,
        });
        self
    }
}

// ─── Shared in-memory state ───────────────────────────────────────────────────

#[derive(Clone)]
struct SecondaryIndex {
    def: IndexDef,
    /// JSON text of the field value → primary keys.
    entries: HashMap<String, BTreeSet<String>>,
}

impl SecondaryIndex {
    fn index_key(&self, tuple: &Value) -> Option<String> {
        tuple.get(self.def.field).map(Value::to_string)
    }

    fn add(&mut self, key: &str, tuple: &Value) {
        if let Some(ik) = self.index_key(tuple) {
            self.entries.entry(ik).or_default().insert(key.to_string());
        }
    }

    fn remove(&mut self, key: &str, tuple: &Value) {
        if let Some(ik) = self.index_key(tuple)
            && let Some(keys) = self.entries.get_mut(&ik)
        {
            keys.remove(key);
            if keys.is_empty() {
                self.entries.remove(&ik);
            }
        }
    }
}

/// Rows plus index bookkeeping, shared by the memory and file backends.
///
/// All methods are synchronous; callers wrap the state in a lock.
#[derive(Clone)]
pub(crate) struct SpaceState {
    schema: SpaceSchema,
    rows: BTreeMap<String, Value>,
    indexes: Vec<SecondaryIndex>,
}

impl SpaceState {
    pub(crate) fn new(schema: SpaceSchema) -> Self {
        let indexes = schema
            .secondary
            .iter()
            .cloned()
            .map(|def| SecondaryIndex {
                def,
                entries: HashMap::new(),
            })
            .collect();
        Self {
            schema,
            rows: BTreeMap::new(),
            indexes,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.schema.name
    }

    fn primary_key(tuple: &Value) -> SpaceResult<String> {
        match tuple {
            Value::Array(fields) => match fields.first() {
                Some(Value::String(key)) => Ok(key.clone()),
                _ => Err(SpaceError::MalformedTuple(
                    "field 0 must be a string primary key".to_string(),
                )),
            },
            _ => Err(SpaceError::MalformedTuple(
                "tuple must be an array".to_string(),
            )),
        }
    }

    fn put(&mut self, key: String, tuple: Value) -> Option<Value> {
        let previous = self.rows.remove(&key);
        if let Some(ref old) = previous {
            for index in &mut self.indexes {
                index.remove(&key, old);
            }
        }
        for index in &mut self.indexes {
            index.add(&key, &tuple);
        }
        self.rows.insert(key, tuple);
        previous
    }

    pub(crate) fn insert(&mut self, tuple: Value) -> SpaceResult<String> {
        let key = Self::primary_key(&tuple)?;
        if self.rows.contains_key(&key) {
            return Err(SpaceError::Duplicate {
                space: self.schema.name.clone(),
                key,
            });
        }
        self.put(key.clone(), tuple);
        Ok(key)
    }

    /// Returns the tuple that was replaced.
    pub(crate) fn update(&mut self, tuple: Value) -> SpaceResult<Value> {
        let key = Self::primary_key(&tuple)?;
        if !self.rows.contains_key(&key) {
            return Err(SpaceError::Missing {
                space: self.schema.name.clone(),
                key,
            });
        }
        self.put(key.clone(), tuple).ok_or(SpaceError::Missing {
            space: self.schema.name.clone(),
            key,
        })
    }

    /// Inserts or overwrites without checks. Used when loading snapshots.
    pub(crate) fn upsert(&mut self, tuple: Value) -> SpaceResult<()> {
        let key = Self::primary_key(&tuple)?;
        self.put(key, tuple);
        Ok(())
    }

    pub(crate) fn get(&self, key: &str) -> Option<Value> {
        self.rows.get(key).cloned()
    }

    pub(crate) fn select_by(&self, index: &str, value: &Value) -> SpaceResult<Vec<Value>> {
        let idx = self
            .indexes
            .iter()
            .find(|i| i.def.name == index)
            .ok_or_else(|| SpaceError::UnknownIndex {
                space: self.schema.name.clone(),
                index: index.to_string(),
            })?;

        Ok(idx
            .entries
            .get(&value.to_string())
            .map(|keys| keys.iter().filter_map(|k| self.rows.get(k).cloned()).collect())
            .unwrap_or_default())
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Value> {
        let old = self.rows.remove(key)?;
        for index in &mut self.indexes {
            index.remove(key, &old);
        }
        Some(old)
    }

    pub(crate) fn scan(&self) -> Vec<Value> {
        self.rows.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }
}

// ─── Opening ──────────────────────────────────────────────────────────────────

/// Opens the configured backend and verifies it answers a `len` probe.
pub async fn open_space(config: &StorageConfig, schema: SpaceSchema) -> SpaceResult<BoxedSpace> {
    let space: BoxedSpace = match config.backend {
        BackendKind::Memory => Arc::new(MemorySpace::new(schema)),
        BackendKind::File => Arc::new(FileSpace::open(&config.path, schema).await?),
    };

    let count = space.len().await?;
    info!(
        space = %space.name(),
        backend = ?config.backend,
        tuples = count,
        "Tuple space ready"
    );

    Ok(space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> SpaceState {
        SpaceState::new(SpaceSchema::new("polls").index("created_by", 3).index("is_active", 5))
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let mut st = state();
        st.insert(json!(["a", 1])).unwrap();
        let err = st.insert(json!(["a", 2])).unwrap_err();
        assert!(matches!(err, SpaceError::Duplicate { ref key, .. } if key == "a"));
        assert_eq!(st.get("a"), Some(json!(["a", 1])));
    }

    #[test]
    fn test_update_requires_existing_key() {
        let mut st = state();
        let err = st.update(json!(["missing"])).unwrap_err();
        assert!(matches!(err, SpaceError::Missing { .. }));
        assert_eq!(st.len(), 0);
    }

    #[test]
    fn test_malformed_primary_key() {
        let mut st = state();
        assert!(matches!(
            st.insert(json!([1, 2])),
            Err(SpaceError::MalformedTuple(_))
        ));
        assert!(matches!(
            st.insert(json!("nope")),
            Err(SpaceError::MalformedTuple(_))
        ));
    }

    #[test]
    fn test_secondary_index_follows_updates() {
        let mut st = state();
        st.insert(json!(["p1", "t", [], "alice", 1, true, {}])).unwrap();
        st.insert(json!(["p2", "t", [], "bob", 1, true, {}])).unwrap();

        let alice = st.select_by("created_by", &json!("alice")).unwrap();
        assert_eq!(alice.len(), 1);

        st.update(json!(["p1", "t", [], "alice", 1, false, {}])).unwrap();
        assert_eq!(st.select_by("is_active", &json!(true)).unwrap().len(), 1);
        assert_eq!(st.select_by("is_active", &json!(false)).unwrap().len(), 1);

        st.remove("p1");
        assert!(st.select_by("created_by", &json!("alice")).unwrap().is_empty());
        assert!(st.select_by("is_active", &json!(false)).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_index() {
        let st = state();
        assert!(matches!(
            st.select_by("title", &json!("x")),
            Err(SpaceError::UnknownIndex { .. })
        ));
    }

    #[test]
    fn test_short_tuple_is_stored_but_not_indexed() {
        let mut st = state();
        st.insert(json!(["short"])).unwrap();
        assert_eq!(st.len(), 1);
        assert!(st.select_by("created_by", &json!("alice")).unwrap().is_empty());
    }
}
