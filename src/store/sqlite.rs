// src/store/sqlite.rs

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tokio::sync::broadcast;

use super::{ChangeFeed, StoreError, TreeStore, denormalize, join_path, normalize, split_path};

/// Tree store persisted in SQLite.
///
/// Every scalar leaf is one row keyed by its full path, so a subtree is the
/// set of rows sharing a path prefix. A write deletes the old subtree and
/// any scalar stored at an ancestor, then inserts the new leaves, all inside
/// one transaction. Change notifications only reach subscribers in this
/// process.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Connects to `url` (e.g. `sqlite://quizboard.db?mode=rwc`) and creates
    /// the node table if needed.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query("CREATE TABLE IF NOT EXISTS nodes (path TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)")
            .execute(&pool)
            .await?;
        Ok(Self {
            pool,
            feed: ChangeFeed::default(),
        })
    }
}

/// Flattens a normalized value into `(path, json)` leaf rows.
fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(&join_path(prefix, key), child, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten(&join_path(prefix, &i.to_string()), child, out);
            }
        }
        Value::Null => {}
        scalar => out.push((prefix.to_owned(), scalar.to_string())),
    }
}

/// Rebuilds the subtree below `prefix` from its leaf rows.
fn assemble(prefix: &str, rows: Vec<(String, String)>) -> Result<Option<Value>, StoreError> {
    let mut root = Map::new();
    let skip = if prefix.is_empty() { 0 } else { prefix.len() + 1 };

    for (path, raw) in rows {
        let leaf: Value = serde_json::from_str(&raw)?;
        if path == prefix {
            // A scalar stored exactly here shadows nothing below it.
            return Ok(Some(leaf));
        }
        let relative = &path[skip..];
        let mut segments = relative.split('/').peekable();
        let mut node = &mut root;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                node.insert(segment.to_owned(), leaf);
                break;
            }
            let entry = node
                .entry(segment.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                unreachable!("entry was just made an object");
            };
            node = map;
        }
    }

    Ok((!root.is_empty()).then(|| denormalize(Value::Object(root))))
}

#[async_trait]
impl TreeStore for SqliteStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let path = split_path(path)?.join("/");

        let rows: Vec<(String, String)> = if path.is_empty() {
            sqlx::query_as::<_, (String, String)>("SELECT path, value FROM nodes ORDER BY path")
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as::<_, (String, String)>(
                "SELECT path, value FROM nodes WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2 ORDER BY path",
            )
            .bind(path.as_str())
            .bind(format!("{path}/"))
            .fetch_all(&self.pool)
            .await?
        };

        assemble(&path, rows)
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let path = segments.join("/");

        let mut leaves = Vec::new();
        if let Some(value) = normalize(value) {
            flatten(&path, &value, &mut leaves);
        }

        let mut tx = self.pool.begin().await?;

        if path.is_empty() {
            sqlx::query("DELETE FROM nodes").execute(&mut *tx).await?;
        } else {
            sqlx::query("DELETE FROM nodes WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2")
                .bind(path.as_str())
                .bind(format!("{path}/"))
                .execute(&mut *tx)
                .await?;

            // A scalar at any ancestor would shadow the new subtree.
            for depth in 0..segments.len() {
                let ancestor = segments[..depth].join("/");
                sqlx::query("DELETE FROM nodes WHERE path = ?1")
                    .bind(ancestor)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        for (leaf_path, raw) in leaves {
            sqlx::query("INSERT INTO nodes (path, value) VALUES (?1, ?2)")
                .bind(leaf_path)
                .bind(raw)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.feed.notify(&path);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<String> {
        self.feed.subscribe()
    }
}
