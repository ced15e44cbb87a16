use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::auth::service;
use crate::error::ApiError;
use crate::state::AppState;

/// Returns the token following the `Bearer ` scheme in the Authorization
/// header, or None if the header is missing or malformed.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Guard for endpoints that mutate experiences: extracts the bearer token,
/// verifies the session, and hands the resolved user id to the handler as an
/// explicit argument.
pub struct AuthUser(pub i32);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized - Missing token".into()))?;

        match service::verify(state, token) {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                warn!("request with invalid or expired token");
                Err(ApiError::Unauthorized(
                    "Unauthorized - Invalid or expired token".into(),
                ))
            }
        }
    }
}
