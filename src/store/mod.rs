// src/store/mod.rs

//! Shared key-tree store.
//!
//! The store is a JSON tree addressed by slash-separated paths, modelled on
//! hosted realtime databases: writes replace whole subtrees, `null` and empty
//! containers delete, arrays are kept as index-keyed objects and come back as
//! arrays when their keys are exactly `0..n`. Nothing here is transactional
//! across calls.

pub mod memory;
pub mod sqlite;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::{sync::broadcast, task::JoinHandle};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Characters a single path segment may not contain.
const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// Capacity of the change broadcast. Slow subscribers that fall further
/// behind than this simply re-read.
const CHANGE_FEED_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum StoreError {
    /// The backing service could not be reached or failed the operation.
    Unavailable(String),
    /// A path segment contains a forbidden character.
    InvalidPath(String),
    /// A stored value could not be (de)serialized.
    Codec(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            StoreError::InvalidPath(path) => write!(f, "invalid store path: {path}"),
            StoreError::Codec(err) => write!(f, "malformed store value: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Codec(err)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Async key-tree service used by every shared aggregate.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Returns the subtree at `path`, or `None` when nothing is stored there.
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces the subtree at `path`. Writing `null` deletes it.
    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Writes `value` under a fresh child key of `path` and returns the key.
    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let key = push_key();
        self.write(&join_path(path, &key), value).await?;
        Ok(key)
    }

    /// Deletes the subtree at `path`.
    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.write(path, Value::Null).await
    }

    /// Feed of changed paths, one message per completed write.
    fn changes(&self) -> broadcast::Receiver<String>;
}

/// Fan-out of changed paths shared by the store implementations.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<String>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { tx }
    }
}

impl ChangeFeed {
    pub fn notify(&self, path: &str) {
        // No receivers is not an error.
        let _ = self.tx.send(path.to_owned());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

/// Splits a path into validated segments. Empty segments are dropped, so
/// `""` and `"/"` both address the root.
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for segment in &segments {
        validate_key(segment).map_err(|_| StoreError::InvalidPath(path.to_owned()))?;
    }
    Ok(segments)
}

/// Checks that `key` can be used as a single path segment.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('/') || key.contains(&FORBIDDEN_KEY_CHARS[..]) {
        return Err(StoreError::InvalidPath(key.to_owned()));
    }
    Ok(())
}

pub fn join_path(parent: &str, key: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        key.to_owned()
    } else {
        format!("{parent}/{key}")
    }
}

/// Canonical form of a path: validated segments joined by `/`.
pub fn canonical_path(path: &str) -> Result<String, StoreError> {
    Ok(split_path(path)?.join("/"))
}

/// True when a change at one path may affect a reader of the other.
pub fn paths_overlap(a: &str, b: &str) -> bool {
    fn contains(outer: &str, inner: &str) -> bool {
        outer.is_empty()
            || inner == outer
            || (inner.starts_with(outer) && inner.as_bytes().get(outer.len()) == Some(&b'/'))
    }
    contains(a, b) || contains(b, a)
}

/// Chronologically ordered unique key for `push`.
pub fn push_key() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Converts a value to its stored shape: arrays become index-keyed objects,
/// nulls and empty containers disappear. `None` means "nothing stored".
pub fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let map: Map<String, Value> = items
                .into_iter()
                .enumerate()
                .filter_map(|(i, v)| normalize(v).map(|v| (i.to_string(), v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        scalar => Some(scalar),
    }
}

/// Inverse of [`normalize`] for reads: objects keyed exactly `0..n` come
/// back as arrays.
pub fn denormalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut indexed: Vec<(usize, Value)> = Vec::with_capacity(map.len());
            let mut dense = true;
            for (k, v) in &map {
                match k.parse::<usize>() {
                    Ok(i) if i.to_string() == *k => indexed.push((i, v.clone())),
                    _ => {
                        dense = false;
                        break;
                    }
                }
            }
            if dense && !indexed.is_empty() {
                indexed.sort_by_key(|(i, _)| *i);
                if indexed.iter().enumerate().all(|(pos, (i, _))| pos == *i) {
                    return Value::Array(indexed.into_iter().map(|(_, v)| denormalize(v)).collect());
                }
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, denormalize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(denormalize).collect()),
        scalar => scalar,
    }
}

/// Iterates the children of a snapshot the way a realtime-database client
/// does: object entries in key order, array items keyed by index.
pub fn children(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// Live view of one path. The background task stops when this is dropped.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Calls `on_change` with the current value at `path`, then again after
/// every write that touches it. Each write produces its own call.
pub fn subscribe<S, F>(store: std::sync::Arc<S>, path: &str, mut on_change: F) -> Result<Subscription, StoreError>
where
    S: TreeStore + ?Sized + 'static,
    F: FnMut(Option<Value>) + Send + 'static,
{
    let path = canonical_path(path)?;
    // Register before the first read so no change slips between the two.
    let mut rx = store.changes();

    let task = tokio::spawn(async move {
        match store.read(&path).await {
            Ok(value) => on_change(value),
            Err(e) => tracing::warn!("Initial read of '{}' failed: {}", path, e),
        }

        loop {
            match rx.recv().await {
                Ok(changed) if !paths_overlap(&changed, &path) => continue,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
            match store.read(&path).await {
                Ok(value) => on_change(value),
                Err(e) => tracing::warn!("Re-read of '{}' after change failed: {}", path, e),
            }
        }
    });

    Ok(Subscription { task })
}
