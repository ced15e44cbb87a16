use crate::state::AppState;
use axum::Router;

pub mod dto;
mod extractor;
pub mod handlers;
mod password;
mod repo;
pub mod service;
pub mod session;

pub use extractor::AuthUser;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
