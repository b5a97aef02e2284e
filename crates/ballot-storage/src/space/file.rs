//! File-backed tuple space.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{SpaceSchema, SpaceState, TupleSpace};
use crate::error::{SpaceError, SpaceResult};

/// On-disk snapshot layout.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    space: String,
    tuples: Vec<Value>,
}

/// A [`TupleSpace`] persisted as a JSON snapshot file.
///
/// Reads are served from memory. A write is applied to a copy of the state,
/// the copy is written to a temporary file and renamed over the snapshot,
/// and only then is the copy published to readers. A failed write leaves
/// both memory and disk as they were.
///
/// Each write runs in its own task. A caller that stops waiting (a cancelled
/// or expired [`OpContext`](ballot_core::OpContext)) gets its error at once,
/// while the write itself either lands whole or not at all.
pub struct FileSpace {
    shared: Arc<Shared>,
}

struct Shared {
    name: String,
    path: PathBuf,
    state: RwLock<SpaceState>,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl FileSpace {
    /// Opens (or creates) the snapshot at `path`.
    ///
    /// Parent directories are created. Tuples in the file without a valid
    /// primary key are dropped with a warning.
    pub async fn open(path: impl AsRef<Path>, schema: SpaceSchema) -> SpaceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut state = SpaceState::new(schema.clone());

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                if snapshot.space != schema.name {
                    warn!(
                        path = %path.display(),
                        expected = %schema.name,
                        found = %snapshot.space,
                        "Snapshot belongs to a different space name"
                    );
                }
                for tuple in snapshot.tuples {
                    if let Err(e) = state.upsert(tuple) {
                        warn!(path = %path.display(), error = %e, "Dropping unreadable tuple from snapshot");
                    }
                }
                info!(path = %path.display(), tuples = state.len(), "Loaded space snapshot");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No snapshot yet, starting empty");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            shared: Arc::new(Shared {
                name: schema.name,
                path,
                state: RwLock::new(state),
                write_lock: Mutex::new(()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Runs `change` through [`Shared::commit`] on a detached task.
    async fn write<T, F>(&self, change: F) -> SpaceResult<T>
    where
        F: FnOnce(&mut SpaceState) -> SpaceResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.commit(change).await })
            .await
            .map_err(|e| SpaceError::Io(format!("snapshot writer failed: {e}")))?
    }
}

impl Shared {
    fn ensure_open(&self) -> SpaceResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(SpaceError::Closed(self.name.clone()))
        } else {
            Ok(())
        }
    }

    async fn commit<T, F>(&self, change: F) -> SpaceResult<T>
    where
        F: FnOnce(&mut SpaceState) -> SpaceResult<T>,
    {
        let _guard = self.write_lock.lock().await;
        self.ensure_open()?;

        let mut next = self.state.read().clone();
        let out = change(&mut next)?;

        if let Err(e) = self.persist(&next).await {
            error!(path = %self.path.display(), error = %e, "Snapshot write failed, change discarded");
            return Err(e);
        }
        *self.state.write() = next;
        Ok(out)
    }

    async fn persist(&self, state: &SpaceState) -> SpaceResult<()> {
        let bytes = serde_json::to_vec_pretty(&Snapshot {
            space: state.name().to_string(),
            tuples: state.scan(),
        })?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }
}

#[async_trait]
impl TupleSpace for FileSpace {
    fn name(&self) -> &str {
        &self.shared.name
    }

    async fn insert(&self, tuple: Value) -> SpaceResult<()> {
        self.write(move |st| st.insert(tuple).map(drop)).await
    }

    async fn update(&self, tuple: Value) -> SpaceResult<()> {
        self.write(move |st| st.update(tuple).map(drop)).await
    }

    async fn select(&self, key: &str) -> SpaceResult<Option<Value>> {
        self.shared.ensure_open()?;
        Ok(self.shared.state.read().get(key))
    }

    async fn select_by(&self, index: &str, value: &Value) -> SpaceResult<Vec<Value>> {
        self.shared.ensure_open()?;
        self.shared.state.read().select_by(index, value)
    }

    async fn delete(&self, key: &str) -> SpaceResult<Option<Value>> {
        self.shared.ensure_open()?;
        // Nothing to write for an absent key.
        if self.shared.state.read().get(key).is_none() {
            return Ok(None);
        }
        let key = key.to_string();
        self.write(move |st| Ok(st.remove(&key))).await
    }

    async fn scan(&self) -> SpaceResult<Vec<Value>> {
        self.shared.ensure_open()?;
        Ok(self.shared.state.read().scan())
    }

    async fn len(&self) -> SpaceResult<usize> {
        self.shared.ensure_open()?;
        Ok(self.shared.state.read().len())
    }

    async fn close(&self) -> SpaceResult<()> {
        // Wait for an in-flight write to land before refusing new ones.
        let _guard = self.shared.write_lock.lock().await;
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            info!(path = %self.shared.path.display(), "File space closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ballot_core::OpContext;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn schema() -> SpaceSchema {
        SpaceSchema::new("polls").index("created_by", 3)
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("polls.json");

        let space = assert_ok!(FileSpace::open(&path, schema()).await);
        assert_ok!(space.insert(json!(["p1", "t", [], "alice"])).await);
        assert_ok!(space.insert(json!(["p2", "t", [], "bob"])).await);
        assert_ok!(space.update(json!(["p1", "t2", [], "alice"])).await);
        assert_ok!(space.delete("p2").await);
        assert_ok!(space.close().await);

        let reopened = assert_ok!(FileSpace::open(&path, schema()).await);
        assert_eq!(
            assert_ok!(reopened.scan().await),
            vec![json!(["p1", "t2", [], "alice"])]
        );
        let by_alice = assert_ok!(reopened.select_by("created_by", &json!("alice")).await);
        assert_eq!(by_alice.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polls.json");
        let space = assert_ok!(FileSpace::open(&path, schema()).await);
        assert_ok!(space.insert(json!(["a", "x", [], "alice"])).await);

        // A directory where the temp file goes makes every snapshot write fail.
        tokio::fs::create_dir(path.with_extension("tmp")).await.unwrap();

        let res = space.insert(json!(["b", "y", [], "bob"])).await;
        assert!(matches!(res, Err(SpaceError::Io(_))));
        let res = space.update(json!(["a", "changed", [], "carol"])).await;
        assert!(matches!(res, Err(SpaceError::Io(_))));
        let res = space.delete("a").await;
        assert!(matches!(res, Err(SpaceError::Io(_))));

        assert_eq!(
            assert_ok!(space.scan().await),
            vec![json!(["a", "x", [], "alice"])]
        );
        let by_alice = assert_ok!(space.select_by("created_by", &json!("alice")).await);
        assert_eq!(by_alice.len(), 1);
        assert!(assert_ok!(space.select_by("created_by", &json!("carol")).await).is_empty());
        assert!(assert_ok!(space.select("b").await).is_none());

        let reopened = assert_ok!(FileSpace::open(&path, schema()).await);
        assert_eq!(
            assert_ok!(reopened.scan().await),
            vec![json!(["a", "x", [], "alice"])]
        );
    }

    #[tokio::test]
    async fn test_abandoned_write_lands_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polls.json");
        let space = assert_ok!(FileSpace::open(&path, schema()).await);

        // Start the write, then drop it the way a timed-out context would.
        let mut pending = space.insert(json!(["p1", "t", [], "alice"]));
        assert!(futures::poll!(&mut pending).is_pending());
        drop(pending);

        let landed = tokio::time::timeout(Duration::from_secs(5), async {
            while assert_ok!(space.select("p1").await).is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert_ok!(landed);

        let reopened = assert_ok!(FileSpace::open(&path, schema()).await);
        assert_eq!(
            assert_ok!(reopened.select("p1").await),
            Some(json!(["p1", "t", [], "alice"]))
        );
    }

    #[tokio::test]
    async fn test_deadline_during_write_never_splits_memory_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polls.json");
        let filler = "x".repeat(4096);
        let tuples: Vec<Value> = (0..2000)
            .map(|i| json!([format!("seed-{i:04}"), filler, [], "seed"]))
            .collect();
        let body = serde_json::to_vec(&Snapshot {
            space: "polls".into(),
            tuples,
        })
        .unwrap();
        tokio::fs::write(&path, body).await.unwrap();
        let space = assert_ok!(FileSpace::open(&path, schema()).await);

        let ctx = OpContext::background().with_timeout(Duration::from_millis(1));
        let res = ctx.run(space.insert(json!(["victim", "v", [], "alice"]))).await;

        // Either outcome is fine for the caller; close waits for the writer.
        assert!(matches!(res, Ok(Ok(())) | Err(_)));
        tokio::task::yield_now().await;
        assert_ok!(space.close().await);
        let in_memory = space.shared.state.read().get("victim");

        let reopened = assert_ok!(FileSpace::open(&path, schema()).await);
        assert_eq!(assert_ok!(reopened.select("victim").await), in_memory);
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let space = assert_ok!(FileSpace::open(dir.path().join("none.json"), schema()).await);
        assert_eq!(assert_ok!(space.len().await), 0);
    }

    #[tokio::test]
    async fn test_garbage_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polls.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let res = FileSpace::open(&path, schema()).await;
        assert!(matches!(res, Err(SpaceError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_snapshot_tuples_without_key_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polls.json");
        let body = json!({"space": "polls", "tuples": [["ok"], [42], "loose"]});
        tokio::fs::write(&path, body.to_string()).await.unwrap();

        let space = assert_ok!(FileSpace::open(&path, schema()).await);
        assert_eq!(assert_ok!(space.scan().await), vec![json!(["ok"])]);
    }
}
