//! In-process key-value store.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::error::StoreError;

/// Full contents of the store. Also the on-disk snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    strings: HashMap<String, String>,
    #[serde(default)]
    hashes: HashMap<String, BTreeMap<String, String>>,
}

impl Snapshot {
    fn apply(&mut self, op: Op) {
        match op {
            Op::Del(key) => {
                self.strings.remove(&key);
                self.hashes.remove(&key);
            }
            Op::Set { key, value } => {
                self.hashes.remove(&key);
                self.strings.insert(key, value);
            }
            Op::HSet { key, field, value } => {
                self.strings.remove(&key);
                self.hashes.entry(key).or_default().insert(field, value);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Del(String),
    Set { key: String, value: String },
    HSet { key: String, field: String, value: String },
}

/// A batch of writes applied as one unit.
///
/// Nothing is visible to readers until [`KvStore::apply`] commits the
/// whole batch.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    ops: Vec<Op>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a key of either kind.
    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(Op::Del(key.into()));
        self
    }

    /// Set a string key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops.push(Op::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Set one field of a hash key.
    pub fn hset(
        &mut self,
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.ops.push(Op::HSet {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Shared key-value store.
///
/// Readers observe either the state before a batch or the state after
/// it, never a mix.
#[derive(Debug, Default)]
pub struct KvStore {
    inner: RwLock<Snapshot>,
    snapshot_path: Option<PathBuf>,
}

impl KvStore {
    /// Create an empty store with no persistence.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`.
    ///
    /// A missing or unreadable snapshot starts the store empty; the next
    /// successful batch rewrites the file.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = match load_snapshot(&path) {
            Ok(Some(snapshot)) => {
                debug!(path = %path.display(), "Loaded store snapshot");
                snapshot
            }
            Ok(None) => Snapshot::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable store snapshot");
                Snapshot::default()
            }
        };

        Self {
            inner: RwLock::new(snapshot),
            snapshot_path: Some(path),
        }
    }

    /// Get a string key.
    pub async fn get(&self, key: &str) -> Option<String> {
        let guard = self.inner.read().await;
        guard.strings.get(key).cloned()
    }

    /// Get all fields of a hash key, ordered by field name.
    ///
    /// Returns an empty map when the key does not exist.
    pub async fn hgetall(&self, key: &str) -> BTreeMap<String, String> {
        let guard = self.inner.read().await;
        guard.hashes.get(key).cloned().unwrap_or_default()
    }

    /// Apply a batch atomically.
    ///
    /// With persistence enabled the snapshot is written before the new
    /// state is published; if that write fails the store is unchanged.
    pub async fn apply(&self, batch: Batch) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let mut next = guard.clone();
        for op in batch.ops {
            next.apply(op);
        }

        if let Some(path) = &self.snapshot_path {
            save_snapshot(path, &next)?;
        }

        *guard = next;
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Write via a sibling temp file and rename, so a crash mid-write leaves
/// the previous snapshot in place.
fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(snapshot)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn batch_is_invisible_until_applied() {
        let store = KvStore::in_memory();
        let mut batch = Batch::new();
        batch.set("a", "1").hset("h", "f", "v");
        assert_eq!(batch.len(), 2);

        assert_eq!(store.get("a").await, None);
        store.apply(batch).await.unwrap();
        assert_eq!(store.get("a").await.as_deref(), Some("1"));
        assert_eq!(store.hgetall("h").await.get("f").map(String::as_str), Some("v"));
    }

    #[tokio::test]
    async fn del_clears_hash_before_rewrite() {
        let store = KvStore::in_memory();
        let mut first = Batch::new();
        first.hset("h", "old", "1").hset("h", "keep", "2");
        store.apply(first).await.unwrap();

        let mut second = Batch::new();
        second.del("h").hset("h", "keep", "3");
        store.apply(second).await.unwrap();

        let all = store.hgetall("h").await;
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("keep").map(String::as_str), Some("3"));
    }

    #[tokio::test]
    async fn hgetall_missing_key_is_empty() {
        let store = KvStore::in_memory();
        assert!(store.hgetall("nope").await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("kv.json");

        let store = KvStore::open(&path);
        let mut batch = Batch::new();
        batch.set("ts", "42").hset("stops", "S1", "{}");
        store.apply(batch).await.unwrap();
        assert!(path.exists());

        let reopened = KvStore::open(&path);
        assert_eq!(reopened.get("ts").await.as_deref(), Some("42"));
        assert_eq!(reopened.hgetall("stops").await.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_snapshot_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, "not json").unwrap();

        let store = KvStore::open(&path);
        assert_eq!(store.get("anything").await, None);
        assert_eq!(store.snapshot_path.as_deref(), Some(path.as_path()));
    }
}
