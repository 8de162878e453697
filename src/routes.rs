// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, leaderboard, quiz},
    state::AppState,
    utils::jwt::admin_middleware,
};

/// Assembles the main application router.
///
/// * Player routes (quiz, leaderboard, players) are public.
/// * Admin routes need a live admin session, except login itself.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/questions", get(quiz::get_questions))
        .route("/status", get(quiz::get_status))
        .route("/submit", post(quiz::submit_quiz));

    let admin_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/questions", get(admin::list_questions).put(admin::save_questions))
        .route("/questions/reset", post(admin::reset_questions))
        .route("/leaderboard", get(admin::list_leaderboard))
        .route("/leaderboard/recompute", post(admin::recompute_leaderboard))
        .route("/leaderboard/{name}", delete(admin::remove_leader))
        .route("/players/{name}", delete(admin::delete_player))
        .layer(middleware::from_fn_with_state(state.clone(), admin_middleware))
        // Added after the layer, so it stays reachable without a session
        .route("/login", post(auth::login));

    Router::new()
        .nest("/api/quiz", quiz_routes)
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        .route("/api/leaderboard/stream", get(leaderboard::stream_leaderboard))
        .route("/api/players/{name}", get(leaderboard::get_player))
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
