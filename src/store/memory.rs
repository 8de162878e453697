// src/store/memory.rs

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast};

use super::{ChangeFeed, StoreError, TreeStore, denormalize, normalize, split_path};

/// Process-local tree store. Used when no database is configured and by the
/// test suites.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RwLock<Map<String, Value>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        let root = self.root.read().await;

        let Some((first, rest)) = segments.split_first() else {
            return Ok((!root.is_empty()).then(|| denormalize(Value::Object(root.clone()))));
        };

        let mut node = root.get(*first);
        for segment in rest {
            node = node.and_then(|n| n.as_object()).and_then(|map| map.get(*segment));
        }
        Ok(node.cloned().map(denormalize))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let value = normalize(value);

        {
            let mut root = self.root.write().await;
            match segments.split_last() {
                None => {
                    *root = match value {
                        Some(Value::Object(map)) => map,
                        // Scalars at the root are not addressable; treat as a wipe.
                        _ => Map::new(),
                    };
                }
                Some((leaf, parents)) => {
                    let mut node = &mut *root;
                    for segment in parents {
                        let entry = node
                            .entry(segment.to_string())
                            .or_insert_with(|| Value::Object(Map::new()));
                        if !entry.is_object() {
                            *entry = Value::Object(Map::new());
                        }
                        let Value::Object(map) = entry else {
                            unreachable!("entry was just made an object");
                        };
                        node = map;
                    }
                    match value {
                        Some(value) => {
                            node.insert(leaf.to_string(), value);
                        }
                        None => {
                            node.remove(*leaf);
                        }
                    }
                    // Drop parents the write left empty.
                    let pruned = normalize(Value::Object(std::mem::take(&mut *root)));
                    *root = match pruned {
                        Some(Value::Object(map)) => map,
                        _ => Map::new(),
                    };
                }
            }
        }

        self.feed.notify(&segments.join("/"));
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<String> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::subscribe;
    use serde_json::json;

    #[tokio::test]
    async fn missing_paths_read_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.read("userPoints/Sara").await.unwrap(), None);
        assert_eq!(store.read("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_replaces_subtree_and_null_deletes() {
        let store = MemoryStore::new();
        store.write("leaderboard", json!({"a": {"points": 1}, "b": {"points": 2}})).await.unwrap();
        store.write("leaderboard", json!({"c": {"points": 3}})).await.unwrap();
        assert_eq!(store.read("leaderboard").await.unwrap(), Some(json!({"c": {"points": 3}})));

        store.remove("leaderboard/c").await.unwrap();
        assert_eq!(store.read("leaderboard").await.unwrap(), None);
        assert_eq!(store.read("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn writing_below_a_scalar_replaces_it() {
        let store = MemoryStore::new();
        store.write("userPoints/Sara", json!(4)).await.unwrap();
        store.write("userPoints/Sara/extra", json!(true)).await.unwrap();
        assert_eq!(store.read("userPoints/Sara").await.unwrap(), Some(json!({"extra": true})));
    }

    #[tokio::test]
    async fn arrays_come_back_as_arrays() {
        let store = MemoryStore::new();
        store.write("questions", json!(["x", "y"])).await.unwrap();
        assert_eq!(store.read("questions").await.unwrap(), Some(json!(["x", "y"])));
        assert_eq!(store.read("questions/1").await.unwrap(), Some(json!("y")));
    }

    #[tokio::test]
    async fn push_uses_ordered_unique_keys() {
        let store = MemoryStore::new();
        let first = store.push("users", json!({"name": "a"})).await.unwrap();
        let second = store.push("users", json!({"name": "b"})).await.unwrap();
        assert_ne!(first, second);
        assert!(first < second);

        let all = store.read("users").await.unwrap().unwrap();
        assert_eq!(all.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn subscription_sees_initial_value_and_each_change() {
        let store = Arc::new(MemoryStore::new());
        store.write("leaderboard/a", json!(1)).await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _sub = subscribe(store.clone(), "leaderboard", move |value| {
            let _ = tx.send(value);
        })
        .unwrap();

        assert_eq!(rx.recv().await.unwrap(), Some(json!({"a": 1})));

        store.write("userPoints/a", json!(9)).await.unwrap();
        store.write("leaderboard/b", json!(2)).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Some(json!({"a": 1, "b": 2})));

        store.remove("leaderboard").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), None);
    }
}
