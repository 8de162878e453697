// src/models/leaderboard.rs

use serde::{Deserialize, Serialize};

/// Cumulative points of one player, as stored at `userPoints/{user}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPoints {
    pub user: String,
    pub total: i64,
}

/// One ranked row, stored at `leaderboard/{user}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub points: i64,
    /// 1-based, dense.
    pub rank: u32,
    /// Unix milliseconds of the recompute that wrote this entry.
    pub timestamp: i64,
}

/// Lenient view of a stored entry. Entries may be pruned or hand-edited by
/// other clients, so every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoredEntry {
    pub name: Option<String>,
    pub points: Option<i64>,
    pub rank: Option<u32>,
    pub timestamp: Option<i64>,
}
