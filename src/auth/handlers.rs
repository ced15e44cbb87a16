use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use crate::auth::dto::{AuthResponse, CredentialsRequest, UserResponse};
use crate::auth::extractor::bearer_token;
use crate::auth::service;
use crate::error::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let auth = service::register(&state, &payload.username, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".into(),
            user: auth.user,
            token: auth.token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let auth = service::login(&state, &payload.username, &payload.password).await?;
    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        user: auth.user,
        token: auth.token,
    }))
}

/// Always succeeds, with or without a live session.
#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    match bearer_token(&headers) {
        Some(token) => {
            service::logout(&state, token);
            Json(json!({ "message": "Logout successful" }))
        }
        None => Json(json!({ "message": "No active session" })),
    }
}

#[instrument(skip(state, headers))]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let token =
        bearer_token(&headers).ok_or_else(|| ApiError::Unauthorized("Unauthorized".into()))?;
    let user = service::current_user(&state, token).await?;
    Ok(Json(UserResponse { user }))
}
