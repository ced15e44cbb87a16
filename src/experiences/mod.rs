use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod query;
pub mod repo;
mod service;

pub fn router() -> Router<AppState> {
    handlers::experience_routes()
}
