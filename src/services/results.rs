// src/services/results.rs

use crate::{
    config::POINTS_PER_CORRECT,
    services::{identity::QuizId, leaderboard::LeaderboardEngine, ledger::AttemptLedger, points::ScoreAggregator},
};

/// What happened to a finished quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recording {
    /// The player had already completed this quiz; nothing was written.
    AlreadyCompleted,
    /// Attempt recorded and points added.
    Awarded { total_points: i64 },
    /// A shared-store write failed part way; see the logs.
    NotRecorded,
}

/// Records finished quizzes: ledger check, attempt write, points update,
/// leaderboard recompute, in that order. Each step waits for the previous
/// one; nothing orders two players' submissions against each other.
#[derive(Clone)]
pub struct ResultRecorder {
    ledger: AttemptLedger,
    points: ScoreAggregator,
    leaderboard: LeaderboardEngine,
}

impl ResultRecorder {
    pub fn new(ledger: AttemptLedger, points: ScoreAggregator, leaderboard: LeaderboardEngine) -> Self {
        Self {
            ledger,
            points,
            leaderboard,
        }
    }

    pub async fn record(&self, user: &str, quiz_id: &QuizId, score: u32, total_questions: u32) -> Recording {
        if self.ledger.has_completed(user, quiz_id).await {
            tracing::info!("'{}' already completed quiz {}; no points added", user, quiz_id);
            return Recording::AlreadyCompleted;
        }

        // The attempt write is what authorizes the points update.
        if let Err(e) = self.ledger.record_attempt(user, quiz_id, score, total_questions).await {
            tracing::error!("Failed to record attempt of '{}': {}", user, e);
            return Recording::NotRecorded;
        }

        let points = score * POINTS_PER_CORRECT;
        let total_points = match self.points.add_points(user, points).await {
            Ok(total) => total,
            Err(e) => {
                tracing::error!("Failed to add {} points for '{}': {}", points, user, e);
                return Recording::NotRecorded;
            }
        };

        if let Err(e) = self.leaderboard.recompute().await {
            tracing::error!("Failed to recompute leaderboard after '{}' scored: {}", user, e);
        }

        Recording::Awarded { total_points }
    }
}
