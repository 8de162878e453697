// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Path, State},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{Stream, stream};
use serde_json::json;
use tokio::sync::mpsc;
use validator::Validate;

use crate::{
    error::AppError, models::attempt::PlayerQuery, services::leaderboard::LeaderboardEngine, state::AppState,
};

/// Returns the stored leaderboard, best first.
pub async fn get_leaderboard(State(engine): State<LeaderboardEngine>) -> Result<impl IntoResponse, AppError> {
    let entries = engine.current().await?;
    Ok(Json(entries))
}

/// Streams the leaderboard as server-sent events.
///
/// The current leaderboard is sent on connect, then again after every
/// change. The store subscription lives inside the stream and is cancelled
/// when the client disconnects.
pub async fn stream_leaderboard(
    State(engine): State<LeaderboardEngine>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = engine.subscribe(move |entries| {
        // Closed once the client is gone; the subscription is dropped with it.
        let _ = tx.send(entries);
    })?;

    let events = stream::unfold((rx, subscription), |(mut rx, subscription)| async move {
        let entries = rx.recv().await;
        entries.map(|entries| {
            let event = Event::default().event("leaderboard").json_data(&entries);
            (event, (rx, subscription))
        })
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// A player's cumulative points and the quizzes they completed.
pub async fn get_player(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let query = PlayerQuery {
        name: name.trim().to_owned(),
    };
    query.validate()?;

    let total_points = state.points.total(&query.name).await?;
    let completed = state.ledger.completed(&query.name).await?;

    Ok(Json(json!({
        "name": query.name,
        "total_points": total_points,
        "completed_quizzes": completed,
    })))
}
