use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::experiences::dto::{
    ExperiencePage, ExperiencePayload, ExperienceResponse, ListParams, MutationResponse,
};
use crate::experiences::service;
use crate::state::AppState;

pub fn experience_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/experiences",
            get(list_experiences).post(create_experience),
        )
        .route(
            "/experiences/:id",
            get(get_experience)
                .put(update_experience)
                .delete(delete_experience),
        )
}

#[instrument(skip(state))]
pub async fn list_experiences(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ExperiencePage>, ApiError> {
    let page = service::list(&state, params).await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn get_experience(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ExperienceResponse>, ApiError> {
    let experience = service::get(&state, id).await?;
    Ok(Json(ExperienceResponse { experience }))
}

#[instrument(skip(state, payload))]
pub async fn create_experience(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ExperiencePayload>,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let experience = service::create(&state, user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            message: "Experience created successfully".into(),
            experience,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_experience(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ExperiencePayload>,
) -> Result<Json<MutationResponse>, ApiError> {
    let experience = service::update(&state, id, user_id, payload).await?;
    Ok(Json(MutationResponse {
        message: "Experience updated successfully".into(),
        experience,
    }))
}

#[instrument(skip(state))]
pub async fn delete_experience(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    service::delete(&state, id, user_id).await?;
    Ok(Json(json!({ "message": "Experience deleted successfully" })))
}
