// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{PlayerQuery, SubmitQuizRequest, SubmitQuizResponse},
        question::PublicQuestion,
    },
    services::{identity::compute_identity, questions::QuestionStore, results::Recording, session::SessionState},
    state::AppState,
};

pub const ALREADY_COMPLETED_MESSAGE: &str = "You have already completed this quiz! No new points were added.";
const RECORDED_MESSAGE: &str = "Your result has been saved.";
const NOT_RECORDED_MESSAGE: &str = "Your result could not be saved. No points were added.";

/// Returns the current question set without the answer key, plus its quiz id.
pub async fn get_questions(State(questions): State<QuestionStore>) -> Result<impl IntoResponse, AppError> {
    let questions = questions.load().await;
    let quiz_id = compute_identity(&questions);
    let public: Vec<PublicQuestion> = questions.iter().map(PublicQuestion::from).collect();

    Ok(Json(json!({
        "quiz_id": quiz_id,
        "total_questions": public.len(),
        "questions": public,
    })))
}

/// Tells a player whether they already completed the current quiz.
pub async fn get_status(
    State(state): State<AppState>,
    Query(mut query): Query<PlayerQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.name = query.name.trim().to_owned();
    query.validate()?;

    let questions = state.questions.load().await;
    let quiz_id = compute_identity(&questions);
    let already_completed = state.ledger.has_completed(&query.name, &quiz_id).await;

    Ok(Json(json!({
        "name": query.name,
        "quiz_id": quiz_id,
        "already_completed": already_completed,
    })))
}

/// Grades a finished quiz and records it.
///
/// * Grades against the question set loaded now.
/// * Rejects the submission when the player saw a different set.
/// * A repeat of an already completed quiz is graded but adds no points.
pub async fn submit_quiz(
    State(state): State<AppState>,
    Json(mut req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.name = req.name.trim().to_owned();
    req.validate()?;

    let questions = state.questions.load().await;
    let quiz_id = compute_identity(&questions);

    if let Some(seen) = req.quiz_id.as_deref().filter(|seen| *seen != quiz_id.as_str()) {
        tracing::info!("'{}' submitted quiz {} but the current quiz is {}", req.name, seen, quiz_id);
        return Err(AppError::Conflict(
            "The questions changed while you were playing. Please reload the quiz.".to_string(),
        ));
    }

    let outcome = SessionState::replay(questions, &req.answers)?.finish();
    let recording = state
        .results
        .record(&req.name, &quiz_id, outcome.score, outcome.total_questions)
        .await;

    let (already_completed, recorded, points_awarded, total_points, message) = match recording {
        Recording::Awarded { total_points } => (false, true, outcome.points, Some(total_points), RECORDED_MESSAGE),
        Recording::AlreadyCompleted => (
            true,
            false,
            0,
            state.points.total(&req.name).await.ok(),
            ALREADY_COMPLETED_MESSAGE,
        ),
        Recording::NotRecorded => (false, false, 0, None, NOT_RECORDED_MESSAGE),
    };

    Ok(Json(SubmitQuizResponse {
        quiz_id: quiz_id.to_string(),
        score: outcome.score,
        total_questions: outcome.total_questions,
        percentage: outcome.percentage,
        already_completed,
        recorded,
        points_awarded,
        total_points,
        message: message.to_string(),
        review: outcome.review,
    }))
}
