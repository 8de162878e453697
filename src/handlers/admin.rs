// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{attempt::PlayerQuery, question::Question},
    services::{leaderboard::LeaderboardEngine, questions::QuestionStore},
    state::AppState,
};

fn player_name(raw: &str) -> Result<String, AppError> {
    let query = PlayerQuery {
        name: raw.trim().to_owned(),
    };
    query.validate()?;
    Ok(query.name)
}

/// Returns the full question set, answer key included.
pub async fn list_questions(State(questions): State<QuestionStore>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.load().await))
}

/// Replaces the question set.
///
/// The whole set is validated before anything is written; the first fault
/// is reported and the stored set stays as it was.
pub async fn save_questions(
    State(questions): State<QuestionStore>,
    Json(payload): Json<Vec<Question>>,
) -> Result<impl IntoResponse, AppError> {
    let saved = questions.save(&payload).await?;
    tracing::info!("Admin saved {} questions", saved.len());
    Ok(Json(saved))
}

/// Restores the built-in question set.
pub async fn reset_questions(State(questions): State<QuestionStore>) -> Result<impl IntoResponse, AppError> {
    let defaults = questions.reset_to_defaults().await?;
    tracing::info!("Admin restored the default questions");
    Ok(Json(defaults))
}

pub async fn list_leaderboard(State(engine): State<LeaderboardEngine>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.current().await?))
}

/// Rebuilds the leaderboard from the stored totals.
pub async fn recompute_leaderboard(
    State(engine): State<LeaderboardEngine>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.recompute().await?))
}

/// Removes one leaderboard entry. Points are kept.
pub async fn remove_leader(
    State(engine): State<LeaderboardEngine>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let name = player_name(&name)?;
    if !engine.remove(&name).await? {
        return Err(AppError::NotFound(format!("'{}' is not on the leaderboard", name)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Forgets a player: points, completion markers and leaderboard entry.
/// Raw attempt records in `users` are kept.
pub async fn delete_player(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let name = player_name(&name)?;

    state.points.reset(&name).await?;
    state.ledger.forget(&name).await?;
    let leaderboard = state.leaderboard.recompute().await?;

    tracing::info!("Admin deleted player '{}'", name);
    Ok(Json(json!({
        "name": name,
        "leaderboard": leaderboard,
    })))
}
