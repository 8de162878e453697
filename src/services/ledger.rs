// src/services/ledger.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::{POINTS_PER_CORRECT, USER_QUIZZES_PATH, USERS_PATH},
    error::AppError,
    models::attempt::{AttemptMarker, AttemptRecord, CompletedQuiz, percentage},
    services::identity::QuizId,
    store::{TreeStore, children, validate_key},
};

/// Per-player record of which quiz revisions were already completed.
///
/// The ledger is check-then-write with no compare-and-swap: two submissions
/// for the same player and quiz that both pass [`has_completed`] will both
/// be recorded. Callers run the check first and write only when it was
/// false.
///
/// [`has_completed`]: AttemptLedger::has_completed
#[derive(Clone)]
pub struct AttemptLedger {
    store: Arc<dyn TreeStore>,
}

fn marker_path(user: &str, quiz_id: &QuizId) -> String {
    format!("{USER_QUIZZES_PATH}/{user}/{quiz_id}")
}

impl AttemptLedger {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// Whether `user` already completed this quiz revision. Any read failure
    /// answers `false`: playing is never blocked by the store.
    pub async fn has_completed(&self, user: &str, quiz_id: &QuizId) -> bool {
        if validate_key(user).is_err() {
            return false;
        }
        match self.store.read(&marker_path(user, quiz_id)).await {
            Ok(marker) => marker.is_some(),
            Err(e) => {
                tracing::error!("Failed to check completion of quiz {} by '{}': {}", quiz_id, user, e);
                false
            }
        }
    }

    /// Writes the completion marker, then appends the raw result to the
    /// `users` collection.
    pub async fn record_attempt(
        &self,
        user: &str,
        quiz_id: &QuizId,
        score: u32,
        total_questions: u32,
    ) -> Result<(), AppError> {
        validate_key(user)?;
        let timestamp = Utc::now().timestamp_millis();

        let marker = AttemptMarker {
            score,
            total_questions,
            timestamp,
        };
        self.store
            .write(&marker_path(user, quiz_id), serde_json::to_value(&marker)?)
            .await?;

        let record = AttemptRecord {
            name: user.to_owned(),
            score,
            total_questions,
            percentage: percentage(score, total_questions),
            points: score * POINTS_PER_CORRECT,
            quiz_id: quiz_id.to_string(),
            timestamp,
        };
        let key = self.store.push(USERS_PATH, serde_json::to_value(&record)?).await?;

        tracing::info!(
            "Recorded attempt {} of quiz {} by '{}': {}/{}",
            key,
            quiz_id,
            user,
            score,
            total_questions
        );
        Ok(())
    }

    /// Quizzes `user` has completed, in quiz-id order.
    pub async fn completed(&self, user: &str) -> Result<Vec<CompletedQuiz>, AppError> {
        validate_key(user)?;
        let Some(snapshot) = self.store.read(&format!("{USER_QUIZZES_PATH}/{user}")).await? else {
            return Ok(Vec::new());
        };

        let mut completed = Vec::new();
        for (quiz_id, value) in children(&snapshot) {
            match serde_json::from_value::<AttemptMarker>(value.clone()) {
                Ok(marker) => completed.push(CompletedQuiz {
                    quiz_id,
                    score: marker.score,
                    total_questions: marker.total_questions,
                    timestamp: marker.timestamp,
                }),
                Err(e) => tracing::warn!("Skipping malformed marker {}/{}: {}", user, quiz_id, e),
            }
        }
        Ok(completed)
    }

    /// Drops every completion marker of `user`.
    pub async fn forget(&self, user: &str) -> Result<(), AppError> {
        validate_key(user)?;
        self.store.remove(&format!("{USER_QUIZZES_PATH}/{user}")).await?;
        Ok(())
    }
}
