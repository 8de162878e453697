// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    services::admin::AdminGate,
    utils::jwt::{Claims, SessionToken},
};

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

/// Exchanges the shared admin password for a session token.
pub async fn login(
    State(gate): State<AdminGate>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = gate.login(&payload.password)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "expires_in": gate.expiration_seconds(),
    })))
}

/// Ends the current admin session.
pub async fn logout(
    State(gate): State<AdminGate>,
    Extension(claims): Extension<Claims>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, AppError> {
    gate.logout(&token, &claims)?;
    Ok(StatusCode::NO_CONTENT)
}
