// src/services/leaderboard.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::{
    config::{LEADERBOARD_PATH, LEADERBOARD_SIZE},
    error::AppError,
    models::leaderboard::{LeaderboardEntry, StoredEntry, UserPoints},
    services::points::ScoreAggregator,
    store::{self, Subscription, TreeStore, children, validate_key},
};

/// Owner of the `leaderboard` collection: the top players by cumulative
/// points.
///
/// Every recompute reads all totals and rewrites the whole collection. That
/// is linear in the number of players per score change, fine for a small
/// audience. Two concurrent recomputes race; the last write wins, and since
/// both read totals the result is at worst one change stale until the next
/// recompute.
#[derive(Clone)]
pub struct LeaderboardEngine {
    store: Arc<dyn TreeStore>,
    points: ScoreAggregator,
}

/// Sorts totals by points, highest first, keeps the top entries and stamps
/// dense ranks. The sort is stable, so equal totals keep the order they were
/// given in (the store's key order); callers must not rely on it.
pub fn rank_totals(mut totals: Vec<UserPoints>, timestamp: i64) -> Vec<LeaderboardEntry> {
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .enumerate()
        .map(|(i, p)| LeaderboardEntry {
            name: p.user,
            points: p.total,
            rank: i as u32 + 1,
            timestamp,
        })
        .collect()
}

/// Reads a `leaderboard` snapshot the way players see it: tolerant of
/// partial entries, sorted by points, capped, ranked by position.
pub fn entries_from_snapshot(snapshot: Option<&Value>) -> Vec<LeaderboardEntry> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };

    let mut entries: Vec<LeaderboardEntry> = children(snapshot)
        .into_iter()
        .map(|(key, value)| {
            let stored: StoredEntry = serde_json::from_value(value.clone()).unwrap_or_default();
            LeaderboardEntry {
                name: stored.name.unwrap_or(key),
                points: stored.points.unwrap_or(0),
                rank: stored.rank.unwrap_or(0),
                timestamp: stored.timestamp.unwrap_or(0),
            }
        })
        .collect();

    entries.sort_by(|a, b| b.points.cmp(&a.points));
    entries.truncate(LEADERBOARD_SIZE);
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }
    entries
}

impl LeaderboardEngine {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self {
            points: ScoreAggregator::new(store.clone()),
            store,
        }
    }

    /// Rebuilds the leaderboard from all totals and replaces the stored
    /// collection in a single write.
    pub async fn recompute(&self) -> Result<Vec<LeaderboardEntry>, AppError> {
        let totals = self.points.all_totals().await?;
        let entries = rank_totals(totals, Utc::now().timestamp_millis());

        let mut collection = Map::new();
        for entry in &entries {
            if validate_key(&entry.name).is_err() {
                tracing::warn!("Skipping leaderboard entry with unusable key '{}'", entry.name);
                continue;
            }
            collection.insert(entry.name.clone(), serde_json::to_value(entry)?);
        }
        self.store.write(LEADERBOARD_PATH, Value::Object(collection)).await?;

        tracing::info!("Leaderboard recomputed with {} entries", entries.len());
        Ok(entries)
    }

    /// The stored leaderboard as players see it.
    pub async fn current(&self) -> Result<Vec<LeaderboardEntry>, AppError> {
        let snapshot = self.store.read(LEADERBOARD_PATH).await?;
        Ok(entries_from_snapshot(snapshot.as_ref()))
    }

    /// Removes one entry. The player's points stay, so the next recompute
    /// may bring them back.
    pub async fn remove(&self, user: &str) -> Result<bool, AppError> {
        validate_key(user)?;
        let path = format!("{LEADERBOARD_PATH}/{user}");
        if self.store.read(&path).await?.is_none() {
            return Ok(false);
        }
        self.store.remove(&path).await?;
        tracing::info!("Removed '{}' from the leaderboard", user);
        Ok(true)
    }

    /// Delivers the current leaderboard now and after every change to it.
    /// Each store write produces its own callback; nothing is batched.
    pub fn subscribe<F>(&self, mut on_change: F) -> Result<Subscription, AppError>
    where
        F: FnMut(Vec<LeaderboardEntry>) + Send + 'static,
    {
        let subscription = store::subscribe(self.store.clone(), LEADERBOARD_PATH, move |snapshot| {
            on_change(entries_from_snapshot(snapshot.as_ref()))
        })?;
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn totals(pairs: &[(&str, i64)]) -> Vec<UserPoints> {
        pairs
            .iter()
            .map(|(u, t)| UserPoints {
                user: (*u).to_owned(),
                total: *t,
            })
            .collect()
    }

    #[test]
    fn ranks_are_dense_and_capped() {
        let input = totals(&[
            ("a", 1),
            ("b", 9),
            ("c", 3),
            ("d", 7),
            ("e", 5),
            ("f", 2),
            ("g", 8),
            ("h", 4),
            ("i", 6),
        ]);
        let ranked = rank_totals(input, 42);
        assert_eq!(ranked.len(), LEADERBOARD_SIZE);
        let points: Vec<i64> = ranked.iter().map(|e| e.points).collect();
        assert_eq!(points, vec![9, 8, 7, 6, 5, 4, 3]);
        let ranks: Vec<u32> = ranked.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, (1..=7).collect::<Vec<u32>>());
        assert!(ranked.iter().all(|e| e.timestamp == 42));
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank_totals(totals(&[("x", 3), ("y", 5), ("z", 3)]), 0);
        let names: Vec<&str> = ranked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["y", "x", "z"]);
    }

    #[test]
    fn snapshot_tolerates_partial_entries() {
        let snapshot = json!({
            "Omar": {"points": 3},
            "Sara": {"name": "Sara", "points": 9, "rank": 4, "timestamp": 10},
            "Zed": "not an entry",
        });
        let entries = entries_from_snapshot(Some(&snapshot));
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Sara");
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].name, "Omar");
        assert_eq!(entries[2].name, "Zed");
        assert_eq!(entries[2].points, 0);
    }

    #[tokio::test]
    async fn recompute_replaces_collection() {
        let store = Arc::new(MemoryStore::new());
        let engine = LeaderboardEngine::new(store.clone());
        store.write("leaderboard/Ghost", json!({"name": "Ghost", "points": 100})).await.unwrap();
        store.write("userPoints", json!({"Sara": 4, "Omar": 2})).await.unwrap();

        let entries = engine.recompute().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Sara");

        let stored = store.read("leaderboard").await.unwrap().unwrap();
        assert!(stored.get("Ghost").is_none());
        assert_eq!(stored["Sara"]["rank"], 1);
        assert_eq!(stored["Omar"]["rank"], 2);
    }

    #[tokio::test]
    async fn recompute_is_idempotent_modulo_timestamps() {
        let store = Arc::new(MemoryStore::new());
        let engine = LeaderboardEngine::new(store.clone());
        store
            .write("userPoints", json!({"a": 3, "b": 3, "c": 10, "d": 1}))
            .await
            .unwrap();

        let strip = |entries: Vec<LeaderboardEntry>| -> Vec<(String, i64, u32)> {
            entries.into_iter().map(|e| (e.name, e.points, e.rank)).collect()
        };
        let first = strip(engine.recompute().await.unwrap());
        let second = strip(engine.recompute().await.unwrap());
        assert_eq!(first, second);
        assert_eq!(strip(engine.current().await.unwrap()), first);
    }

    #[tokio::test]
    async fn remove_reports_missing_entries() {
        let store = Arc::new(MemoryStore::new());
        let engine = LeaderboardEngine::new(store.clone());
        store.write("userPoints/Sara", json!(4)).await.unwrap();
        engine.recompute().await.unwrap();

        assert!(engine.remove("Sara").await.unwrap());
        assert!(!engine.remove("Sara").await.unwrap());
        assert!(engine.current().await.unwrap().is_empty());

        // Points survive, so a recompute restores the entry.
        assert_eq!(engine.recompute().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn subscribers_see_recomputes() {
        let store = Arc::new(MemoryStore::new());
        let engine = LeaderboardEngine::new(store.clone());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _sub = engine
            .subscribe(move |entries| {
                let _ = tx.send(entries);
            })
            .unwrap();

        assert!(rx.recv().await.unwrap().is_empty());

        store.write("userPoints/Sara", json!(4)).await.unwrap();
        engine.recompute().await.unwrap();
        let update = rx.recv().await.unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(update[0].name, "Sara");
        assert_eq!(update[0].points, 4);
    }
}
