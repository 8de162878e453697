// src/services/questions.rs

use std::sync::Arc;

use serde_json::Value;

use crate::{
    config::QUESTIONS_PATH,
    error::AppError,
    models::question::{Question, default_questions, validate_question_set},
    services::cache::LocalCache,
    store::{TreeStore, children},
    utils::html::clean_html,
};

/// Source of the canonical question set.
///
/// Loads prefer the shared store, then the local cache, then the built-in
/// defaults. Saves go to the cache first and then, best effort, to the
/// shared store; a failed shared write is logged and leaves the cache ahead
/// of the store until the next successful save.
#[derive(Clone)]
pub struct QuestionStore {
    store: Arc<dyn TreeStore>,
    cache: LocalCache,
}

/// Decodes a stored question set. Other clients may have written it as an
/// index-keyed object rather than an array.
fn decode_questions(value: Value) -> Result<Vec<Question>, serde_json::Error> {
    if value.is_array() {
        return serde_json::from_value(value);
    }
    let mut indexed: Vec<(usize, Value)> = children(&value)
        .into_iter()
        .filter_map(|(k, v)| k.parse().ok().map(|i| (i, v.clone())))
        .collect();
    indexed.sort_by_key(|(i, _)| *i);
    indexed
        .into_iter()
        .map(|(_, v)| serde_json::from_value(v))
        .collect()
}

/// Strips markup and trims. Plain text, including `&` and `<`, is kept as
/// typed.
fn sanitize(questions: &[Question]) -> Vec<Question> {
    let clean = |text: &str| clean_html(text).trim().to_owned();
    questions
        .iter()
        .map(|q| Question {
            text: clean(&q.text),
            answers: q.answers.iter().map(|a| clean(a)).collect(),
            correct_answer: q.correct_answer,
        })
        .collect()
}

impl QuestionStore {
    pub fn new(store: Arc<dyn TreeStore>, cache: LocalCache) -> Self {
        Self { store, cache }
    }

    /// The current question set. Never fails: every error degrades to the
    /// next source.
    pub async fn load(&self) -> Vec<Question> {
        match self.store.read(QUESTIONS_PATH).await {
            Ok(Some(value)) => match decode_questions(value) {
                Ok(questions) if !questions.is_empty() => return questions,
                Ok(_) => {}
                Err(e) => tracing::warn!("Stored question set is malformed: {}", e),
            },
            Ok(None) => {}
            Err(e) => tracing::error!("Failed to load questions from the shared store: {}", e),
        }

        if let Some(questions) = self.cache.load().await.filter(|q| !q.is_empty()) {
            return questions;
        }

        default_questions()
    }

    /// Sanitizes and validates `questions`, then persists them. Nothing is
    /// written when validation fails. Returns the set as stored.
    pub async fn save(&self, questions: &[Question]) -> Result<Vec<Question>, AppError> {
        let questions = sanitize(questions);
        validate_question_set(&questions)?;
        self.persist(&questions).await?;
        Ok(questions)
    }

    /// Restores the built-in question set everywhere.
    pub async fn reset_to_defaults(&self) -> Result<Vec<Question>, AppError> {
        let defaults = default_questions();
        self.persist(&defaults).await?;
        Ok(defaults)
    }

    async fn persist(&self, questions: &[Question]) -> Result<(), AppError> {
        self.cache.store(questions).await?;

        let value = serde_json::to_value(questions).map_err(|e| AppError::InternalServerError(e.to_string()))?;
        match self.store.write(QUESTIONS_PATH, value).await {
            Ok(()) => tracing::info!("Published question set of {} questions", questions.len()),
            Err(e) => tracing::error!("Failed to publish questions to the shared store: {}", e),
        }
        Ok(())
    }
}
