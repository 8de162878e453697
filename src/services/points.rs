// src/services/points.rs

use std::sync::Arc;

use serde_json::Value;

use crate::{
    config::USER_POINTS_PATH,
    error::AppError,
    models::leaderboard::UserPoints,
    store::{TreeStore, children, validate_key},
};

/// Cumulative points per player.
///
/// `add_points` is a plain read-modify-write: two concurrent calls for the
/// same player can both read the old total, and the later write wins. The
/// attempt ledger makes such calls rare; they are not prevented. A store
/// with an atomic increment would close the gap.
#[derive(Clone)]
pub struct ScoreAggregator {
    store: Arc<dyn TreeStore>,
}

/// Stored totals are plain integers; anything else counts as zero.
fn as_points(user: &str, value: &Value) -> i64 {
    value.as_i64().unwrap_or_else(|| {
        tracing::warn!("Non-numeric points for '{}': {}", user, value);
        0
    })
}

impl ScoreAggregator {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// Current total of `user`; no record means zero.
    pub async fn total(&self, user: &str) -> Result<i64, AppError> {
        validate_key(user)?;
        let stored = self.store.read(&format!("{USER_POINTS_PATH}/{user}")).await?;
        Ok(stored.map(|v| as_points(user, &v)).unwrap_or(0))
    }

    /// Adds `delta` to the total of `user` and returns the new total.
    pub async fn add_points(&self, user: &str, delta: u32) -> Result<i64, AppError> {
        let current = self.total(user).await?;
        let updated = current.saturating_add(i64::from(delta));
        self.store
            .write(&format!("{USER_POINTS_PATH}/{user}"), Value::from(updated))
            .await?;
        tracing::debug!("Points of '{}': {} -> {}", user, current, updated);
        Ok(updated)
    }

    /// Every stored total, in store iteration order.
    pub async fn all_totals(&self) -> Result<Vec<UserPoints>, AppError> {
        let Some(snapshot) = self.store.read(USER_POINTS_PATH).await? else {
            return Ok(Vec::new());
        };
        Ok(children(&snapshot)
            .into_iter()
            .map(|(user, value)| UserPoints {
                total: as_points(&user, value),
                user,
            })
            .collect())
    }

    /// Removes the total of `user`.
    pub async fn reset(&self, user: &str) -> Result<(), AppError> {
        validate_key(user)?;
        self.store.remove(&format!("{USER_POINTS_PATH}/{user}")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn missing_total_counts_as_zero() {
        let points = ScoreAggregator::new(Arc::new(MemoryStore::new()));
        assert_eq!(points.total("Sara").await.unwrap(), 0);
        assert_eq!(points.add_points("Sara", 4).await.unwrap(), 4);
        assert_eq!(points.add_points("Sara", 0).await.unwrap(), 4);
        assert_eq!(points.add_points("Sara", 3).await.unwrap(), 7);
        assert_eq!(points.total("Sara").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn garbage_totals_are_treated_as_zero() {
        let store = Arc::new(MemoryStore::new());
        store.write("userPoints/Omar", json!("lots")).await.unwrap();
        let points = ScoreAggregator::new(store);
        assert_eq!(points.add_points("Omar", 2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn totals_saturate_instead_of_overflowing() {
        let store = Arc::new(MemoryStore::new());
        store.write("userPoints/Omar", json!(i64::MAX - 1)).await.unwrap();
        let points = ScoreAggregator::new(store);
        assert_eq!(points.add_points("Omar", 5).await.unwrap(), i64::MAX);
        assert_eq!(points.total("Omar").await.unwrap(), i64::MAX);
    }

    #[tokio::test]
    async fn all_totals_in_key_order() {
        let points = ScoreAggregator::new(Arc::new(MemoryStore::new()));
        points.add_points("b", 1).await.unwrap();
        points.add_points("a", 2).await.unwrap();
        let totals = points.all_totals().await.unwrap();
        assert_eq!(
            totals,
            vec![
                UserPoints { user: "a".into(), total: 2 },
                UserPoints { user: "b".into(), total: 1 },
            ]
        );

        points.reset("a").await.unwrap();
        assert_eq!(points.all_totals().await.unwrap().len(), 1);
    }
}
